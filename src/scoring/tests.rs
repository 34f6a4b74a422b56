//! Tests for the scoring engine

use super::*;
use crate::cli::types::{PlayerId, Season, TeamId, Week};
use crate::storage::{GameStatRow, TeamDefenseRow};

fn fanduel() -> ScoringRules {
    ScoringTable::builtin().get("FanDuel").unwrap().clone()
}

fn draftkings() -> ScoringRules {
    ScoringTable::builtin().get("DraftKings").unwrap().clone()
}

fn stat_row() -> GameStatRow {
    GameStatRow {
        player_id: PlayerId::new("00-0031234"),
        game_id: "2024_05_KC_NO".to_string(),
        team_id: Some(TeamId::new("KC")),
        season: Season::new(2024),
        week: Week::new(5),
        ..Default::default()
    }
}

fn defense_row() -> TeamDefenseRow {
    TeamDefenseRow {
        team_id: TeamId::new("SF"),
        game_id: "2024_05_SF_SEA".to_string(),
        season: Season::new(2024),
        week: Week::new(5),
        ..Default::default()
    }
}

#[test]
fn test_fanduel_passing_line_with_bonus() {
    // 312 pass yards, 2 TDs, 1 INT, 18 rush yards: passing 19.48, rushing
    // 1.8, 300-yard bonus 3, total 24.28.
    let mut row = stat_row();
    row.pass_yards = Some(312.0);
    row.pass_touchdowns = Some(2.0);
    row.pass_interceptions = Some(1.0);
    row.rush_yards = Some(18.0);
    row.receptions = Some(0.0);

    let points = score_player(&row, &fanduel());
    assert!((points.passing - (312.0 * 0.04 + 2.0 * 4.0)).abs() < 1e-9);
    assert!((points.penalty - (-1.0)).abs() < 1e-9);
    assert!((points.bonus - 3.0).abs() < 1e-9);
    assert!((points.total - 24.28).abs() < 1e-9);
}

#[test]
fn test_draftkings_receiving_line_with_bonus() {
    // 8 receptions, 104 receiving yards, 1 TD, 12 rush yards: receiving
    // 22.4, rushing 1.2, 100-yard bonus 3, total 26.6.
    let mut row = stat_row();
    row.receptions = Some(8.0);
    row.receiving_yards = Some(104.0);
    row.receiving_touchdowns = Some(1.0);
    row.rush_yards = Some(12.0);

    let points = score_player(&row, &draftkings());
    assert!((points.receiving - 22.4).abs() < 1e-9);
    assert!((points.rushing - 1.2).abs() < 1e-9);
    assert!((points.bonus - 3.0).abs() < 1e-9);
    assert!((points.total - 26.6).abs() < 1e-9);
}

#[test]
fn test_standard_has_no_yardage_bonuses() {
    let standard = ScoringTable::builtin().get("Standard").unwrap().clone();
    let mut row = stat_row();
    row.rush_yards = Some(150.0);
    row.pass_yards = Some(350.0);

    let points = score_player(&row, &standard);
    assert_eq!(points.bonus, 0.0);
}

#[test]
fn test_scoring_is_deterministic() {
    let mut row = stat_row();
    row.pass_yards = Some(287.0);
    row.pass_touchdowns = Some(3.0);
    row.rush_yards = Some(21.0);
    row.rush_fumbles = Some(1.0);

    let rules = fanduel();
    let first = score_player(&row, &rules);
    let second = score_player(&row, &rules);
    assert_eq!(first, second);
}

#[test]
fn test_turnovers_never_raise_totals() {
    let mut clean = stat_row();
    clean.pass_yards = Some(250.0);
    clean.pass_touchdowns = Some(2.0);

    let rules = fanduel();
    let base = score_player(&clean, &rules).total;

    for ints in 1..=4 {
        let mut row = clean.clone();
        row.pass_interceptions = Some(ints as f64);
        assert!(score_player(&row, &rules).total <= base);
    }
    for fumbles in 1..=3 {
        let mut row = clean.clone();
        row.rush_fumbles = Some(fumbles as f64);
        assert!(score_player(&row, &rules).total <= base);
    }
}

#[test]
fn test_yards_and_tds_never_lower_totals() {
    let rules = fanduel();
    let mut row = stat_row();
    row.receiving_yards = Some(40.0);
    let mut last = score_player(&row, &rules).total;

    for yards in [60.0, 99.0, 100.0, 145.0] {
        row.receiving_yards = Some(yards);
        let total = score_player(&row, &rules).total;
        assert!(total >= last);
        last = total;
    }

    row.receiving_touchdowns = Some(2.0);
    assert!(score_player(&row, &rules).total >= last);
}

#[test]
fn test_null_stats_score_zero() {
    let points = score_player(&stat_row(), &fanduel());
    assert_eq!(points.total, 0.0);
}

#[test]
fn test_dst_tier_scenario() {
    // 7 allowed lands in the 7-13 tier (4), 3 sacks, 3 turnovers, 1 TD:
    // 4 + 3 + 6 + 6 = 19.
    let mut row = defense_row();
    row.points_allowed = Some(7.0);
    row.sacks = Some(3.0);
    row.interceptions = Some(2.0);
    row.fumbles_recovered = Some(1.0);
    row.defensive_touchdowns = Some(1.0);

    let points = score_dst(&row, &fanduel());
    assert!((points.points_allowed - 4.0).abs() < 1e-9);
    assert!((points.sacks - 3.0).abs() < 1e-9);
    assert!((points.turnovers - 6.0).abs() < 1e-9);
    assert!((points.touchdowns - 6.0).abs() < 1e-9);
    assert!((points.total - 19.0).abs() < 1e-9);
}

#[test]
fn test_dst_tier_boundaries_pick_lower_tier() {
    let rules = fanduel();
    let cases = [
        (0.0, 10.0),
        (1.0, 7.0),
        (6.0, 7.0),
        (7.0, 4.0),
        (13.0, 4.0),
        (14.0, 1.0),
        (20.0, 1.0),
        (21.0, 0.0),
        (27.0, 0.0),
        (28.0, -1.0),
        (34.0, -1.0),
        (35.0, -4.0),
        (52.0, -4.0),
    ];
    for (allowed, expected) in cases {
        let mut row = defense_row();
        row.points_allowed = Some(allowed);
        let points = score_dst(&row, &rules);
        assert_eq!(
            points.points_allowed, expected,
            "points_allowed={allowed} should score {expected}"
        );
    }
}

#[test]
fn test_dst_safety_and_return_touchdowns() {
    let mut row = defense_row();
    row.safeties = Some(1.0);
    row.pick_six = Some(1.0);
    row.return_touchdowns = Some(1.0);
    row.points_allowed = Some(21.0);

    let points = score_dst(&row, &fanduel());
    assert!((points.safety - 2.0).abs() < 1e-9);
    assert!((points.touchdowns - 12.0).abs() < 1e-9);
}

#[test]
fn test_legacy_column_names_load() {
    use std::collections::HashMap;

    let mut values = HashMap::new();
    values.insert("pass_yard_points".to_string(), 0.04);
    values.insert("dst_sack_points".to_string(), 1.5);
    values.insert("dst_interception_points".to_string(), 3.0);
    values.insert("dst_points_allowed_0_points".to_string(), 12.0);
    values.insert("dst_points_allowed_35_points".to_string(), -5.0);

    let rules = ScoringRules::from_columns("Legacy League", &values);
    assert_eq!(rules.dst_sack_points, 1.5);
    assert_eq!(rules.dst_interception_points, 3.0);
    assert_eq!(rules.dst_tiers.shutout, 12.0);
    assert_eq!(rules.dst_tiers.allowed_35_plus, -5.0);
    assert_eq!(rules.slug(), "legacyleague");
}

#[test]
fn test_unknown_ruleset_is_bad_input() {
    let table = ScoringTable::builtin();
    let err = table.get("Yahoo").unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::BadInput);
}
