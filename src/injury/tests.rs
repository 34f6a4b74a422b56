//! Tests for injury records, filtering, and the DST boost

use super::*;
use crate::cli::types::PlayerId;
use crate::gameday::PlayerPrediction;

fn record(name: &str, team: &str, position: &str, status: InjuryStatus) -> InjuryRecord {
    InjuryRecord {
        player_name: name.to_string(),
        team: TeamId::new(team),
        position: Some(position.to_string()),
        status,
        fantasy_status: None,
        primary_injury: Some("Hamstring".to_string()),
        practice_status: None,
        date_modified: None,
    }
}

fn prediction(name: &str, points: f64) -> PlayerPrediction {
    PlayerPrediction {
        player_id: PlayerId::new(name),
        player_name: name.to_string(),
        position: Position::WR,
        team_id: TeamId::new("KC"),
        predicted_points: points,
        injury_adjustment: None,
    }
}

#[test]
fn test_impact_severity_ladder() {
    assert_eq!(record("A", "KC", "WR", InjuryStatus::Out).impact_severity(), 1.0);
    assert_eq!(
        record("A", "KC", "WR", InjuryStatus::Doubtful).impact_severity(),
        0.8
    );
    assert_eq!(
        record("A", "KC", "WR", InjuryStatus::Questionable).impact_severity(),
        0.3
    );
    assert_eq!(record("A", "KC", "WR", InjuryStatus::Active).impact_severity(), 0.0);

    // INACTIVE fantasy status rules a player out regardless of report
    // status.
    let mut benched = record("A", "KC", "WR", InjuryStatus::Active);
    benched.fantasy_status = Some("INACTIVE".to_string());
    assert!(benched.is_out());
    assert_eq!(benched.impact_severity(), 1.0);
}

#[test]
fn test_status_parsing() {
    assert_eq!(InjuryStatus::parse(Some("Out")), InjuryStatus::Out);
    assert_eq!(InjuryStatus::parse(Some("questionable")), InjuryStatus::Questionable);
    assert_eq!(InjuryStatus::parse(Some("DOUBTFUL")), InjuryStatus::Doubtful);
    assert_eq!(InjuryStatus::parse(Some("")), InjuryStatus::Active);
    assert_eq!(InjuryStatus::parse(None), InjuryStatus::Active);
}

#[test]
fn test_filter_out_matches_names_case_insensitively() {
    let filter = InjuryFilter::new(vec![record(
        "Justin Jefferson",
        "MIN",
        "WR",
        InjuryStatus::Out,
    )]);
    let predictions = vec![
        prediction("JUSTIN JEFFERSON", 19.0),
        prediction("Other Guy", 11.0),
    ];
    let kept = filter.filter_out(predictions);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].player_name, "Other Guy");
}

#[test]
fn test_adjust_scales_down_and_annotates() {
    let filter = InjuryFilter::new(vec![
        record("Quentin", "KC", "QB", InjuryStatus::Questionable),
        record("Dillon", "KC", "RB", InjuryStatus::Doubtful),
    ]);
    let adjusted = filter.adjust(vec![
        prediction("Quentin", 18.0),
        prediction("Dillon", 10.0),
        prediction("Healthy", 12.0),
    ]);

    let quentin = adjusted.iter().find(|p| p.player_name == "Quentin").unwrap();
    assert!((quentin.predicted_points - 12.6).abs() < 1e-9);
    assert_eq!(quentin.injury_adjustment, Some(0.3));

    let dillon = adjusted.iter().find(|p| p.player_name == "Dillon").unwrap();
    assert!((dillon.predicted_points - 2.0).abs() < 1e-9);

    let healthy = adjusted.iter().find(|p| p.player_name == "Healthy").unwrap();
    assert_eq!(healthy.predicted_points, 12.0);
    assert_eq!(healthy.injury_adjustment, None);
}

#[test]
fn test_adjust_never_raises_points() {
    let statuses = [
        InjuryStatus::Active,
        InjuryStatus::Questionable,
        InjuryStatus::Doubtful,
        InjuryStatus::Out,
    ];
    for status in statuses {
        let filter = InjuryFilter::new(vec![record("Player", "KC", "WR", status)]);
        let adjusted = filter.adjust(vec![prediction("Player", 15.0)]);
        assert!(adjusted[0].predicted_points <= 15.0);
        if status == InjuryStatus::Active {
            assert_eq!(adjusted[0].predicted_points, 15.0);
        }
    }
}

#[test]
fn test_gameday_report_groups_and_flags_teams() {
    let filter = InjuryFilter::new(vec![
        record("QB One", "NYJ", "QB", InjuryStatus::Out),
        record("WR One", "NYJ", "WR", InjuryStatus::Out),
        record("WR Two", "NYJ", "WR", InjuryStatus::Questionable),
        record("RB One", "DAL", "RB", InjuryStatus::Questionable),
    ]);
    let report = filter.gameday_report();

    assert_eq!(report.total_out, 2);
    assert_eq!(report.total_questionable, 2);
    assert_eq!(report.out_by_position["QB"].len(), 1);
    assert_eq!(report.out_by_position["WR"].len(), 1);
    // NYJ weight: 3 + 3 + 1 = 7 > 3; DAL weight 1 stays off the list.
    assert_eq!(report.high_impact_teams, vec![TeamId::new("NYJ")]);
}

#[test]
fn test_dst_boost_scenario() {
    // Opponent missing their QB and both tackles: 0.15 + 0.03 + 0.03.
    let filter = InjuryFilter::new(vec![
        record("Starting QB", "NE", "QB", InjuryStatus::Out),
        record("Left Tackle", "NE", "T", InjuryStatus::Out),
        record("Right Tackle", "NE", "T", InjuryStatus::Out),
    ]);
    let impact = filter.team_impact(&TeamId::new("NE"));
    let boost = dst_injury_boost(&impact);
    assert!((boost - 0.21).abs() < 1e-9);
}

#[test]
fn test_dst_boost_caps_at_quarter() {
    let filter = InjuryFilter::new(vec![
        record("Starting QB", "NE", "QB", InjuryStatus::Out),
        record("Left Tackle", "NE", "T", InjuryStatus::Out),
        record("Right Tackle", "NE", "T", InjuryStatus::Out),
        record("Center", "NE", "C", InjuryStatus::Out),
        record("Guard One", "NE", "G", InjuryStatus::Out),
        record("Guard Two", "NE", "G", InjuryStatus::Out),
    ]);
    let impact = filter.team_impact(&TeamId::new("NE"));
    assert_eq!(dst_injury_boost(&impact), 0.25);
}

#[test]
fn test_dst_boost_questionable_qb() {
    let filter = InjuryFilter::new(vec![record(
        "Starting QB",
        "NE",
        "QB",
        InjuryStatus::Questionable,
    )]);
    let impact = filter.team_impact(&TeamId::new("NE"));
    assert!((dst_injury_boost(&impact) - 0.05).abs() < 1e-9);
}

#[test]
fn test_db_injury_source_reads_latest_week() {
    use crate::storage::InjuryRow;

    let db = Database::open_in_memory().unwrap();
    for (week, name, status) in [
        (4u16, "Old Report Guy", "Out"),
        (5, "Current Out Guy", "Out"),
        (5, "Current Questionable Guy", "Questionable"),
    ] {
        db.insert_injury(&InjuryRow {
            season: Season::new(2024),
            week: Week::new(week),
            team: TeamId::new("KC"),
            position: Some("WR".to_string()),
            full_name: name.to_string(),
            report_primary_injury: Some("Knee".to_string()),
            report_status: Some(status.to_string()),
            practice_status: None,
            date_modified: None,
        })
        .unwrap();
    }

    let source = DbInjurySource::new(&db);
    let current = source.current_injuries().unwrap();
    assert_eq!(current.len(), 2, "only the latest week is current");
    assert!(source.is_player_out("current out guy", None).unwrap());
    assert!(!source.is_player_out("Old Report Guy", None).unwrap());

    let historical = source
        .historical_injuries(Season::new(2024), Week::new(4))
        .unwrap();
    assert_eq!(historical.len(), 1);
}
