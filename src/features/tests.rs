//! Tests for the feature builder

use super::*;
use crate::scoring::ScoringTable;
use crate::storage::{GameRow, PlayerRow};

fn season() -> Season {
    Season::new(2024)
}

fn game_id(week: u16) -> String {
    format!("2024_{week:02}_BUF_MIA")
}

/// One player with steadily rising receiving lines, weeks 1..=games.
fn seed_receiver(db: &Database, games: u16) {
    db.upsert_player(&PlayerRow {
        player_id: PlayerId::new("00-0099"),
        player_name: "Test Receiver".to_string(),
        position: Position::WR,
    })
    .unwrap();
    for week in 1..=games {
        db.upsert_game(&GameRow {
            game_id: game_id(week),
            season: season(),
            week: Week::new(week),
            game_date: None,
            home_team_id: TeamId::new("BUF"),
            away_team_id: TeamId::new("MIA"),
            home_score: Some(24),
            away_score: Some(20),
        })
        .unwrap();
        db.upsert_game_stat(&GameStatRow {
            player_id: PlayerId::new("00-0099"),
            game_id: game_id(week),
            team_id: Some(TeamId::new("BUF")),
            season: season(),
            week: Week::new(week),
            receptions: Some(4.0 + week as f64),
            receiving_targets: Some(8.0),
            receiving_yards: Some(50.0 + 10.0 * week as f64),
            target_share: Some(0.2),
            ..Default::default()
        })
        .unwrap();
    }
}

fn seed_defense_history(db: &Database, team: &str, games: u16) {
    for week in 1..=games {
        db.upsert_team_defense(&crate::storage::TeamDefenseRow {
            team_id: TeamId::new(team),
            game_id: format!("2024_{week:02}_{team}_X"),
            season: season(),
            week: Week::new(week),
            points_allowed: Some(14.0 + week as f64),
            yards_allowed: Some(320.0),
            interceptions: Some(1.0),
            fumbles_recovered: Some(0.0),
            sacks: Some(2.0),
            ..Default::default()
        })
        .unwrap();
    }
}

#[test]
fn test_fewer_than_three_games_yields_none() {
    let db = Database::open_in_memory().unwrap();
    seed_receiver(&db, 2);
    let table = ScoringTable::builtin();
    let rules = table.get("PPR").unwrap();
    let mut builder = FeatureBuilder::new(&db, rules);

    let features = builder
        .build_player_features(&PlayerId::new("00-0099"), season(), Week::new(3), false)
        .unwrap();
    assert!(features.is_none());
}

#[test]
fn test_l3_and_season_averages() {
    let db = Database::open_in_memory().unwrap();
    seed_receiver(&db, 6);
    let table = ScoringTable::builtin();
    let rules = table.get("PPR").unwrap();
    let mut builder = FeatureBuilder::new(&db, rules);

    let features = builder
        .build_player_features(&PlayerId::new("00-0099"), season(), Week::new(7), false)
        .unwrap()
        .unwrap();

    // Last 3 games are weeks 4-6: receptions 8/9/10, yards 90/100/110.
    // PPR: fp = rec + 0.1 * yards.
    let fp = |rec: f64, yards: f64| rec + 0.1 * yards;
    let expected_l3 = (fp(8.0, 90.0) + fp(9.0, 100.0) + fp(10.0, 110.0)) / 3.0;
    assert!((features.avg_fantasy_points_l3 - expected_l3).abs() < 1e-9);
    assert!((features.avg_targets_l3 - 8.0).abs() < 1e-9);
    assert_eq!(features.games_played_season, 6);
    assert!((features.target_share_l3 - 0.2).abs() < 1e-9);
    assert_eq!(features.position, Position::WR);
    assert_eq!(features.team_id, Some(TeamId::new("BUF")));

    // Rising production, most-recent-first ordering: negative slope.
    assert!(features.trend_score < 0.0);
    assert!(features.consistency_score > 0.0);
}

#[test]
fn test_features_never_see_the_target_week_or_later() {
    let db = Database::open_in_memory().unwrap();
    seed_receiver(&db, 8);
    let table = ScoringTable::builtin();
    let rules = table.get("PPR").unwrap();
    let mut builder = FeatureBuilder::new(&db, rules);

    // Entering week 4 only weeks 1-3 exist: receptions 5/6/7.
    let features = builder
        .build_player_features(&PlayerId::new("00-0099"), season(), Week::new(4), false)
        .unwrap()
        .unwrap();
    let fp = |rec: f64, yards: f64| rec + 0.1 * yards;
    let expected = (fp(5.0, 60.0) + fp(6.0, 70.0) + fp(7.0, 80.0)) / 3.0;
    assert!((features.avg_fantasy_points_l3 - expected).abs() < 1e-9);
    assert_eq!(features.games_played_season, 3);
}

#[test]
fn test_prefetch_matches_direct_build() {
    let db = Database::open_in_memory().unwrap();
    seed_receiver(&db, 6);
    let table = ScoringTable::builtin();
    let rules = table.get("Half PPR").unwrap();

    let player = PlayerId::new("00-0099");
    let mut direct = FeatureBuilder::new(&db, rules);
    let from_db = direct
        .build_player_features(&player, season(), Week::new(7), false)
        .unwrap()
        .unwrap();

    let mut cached = FeatureBuilder::new(&db, rules);
    cached
        .prefetch_players(std::slice::from_ref(&player), season(), Week::new(7))
        .unwrap();
    let from_cache = cached
        .build_player_features(&player, season(), Week::new(7), false)
        .unwrap()
        .unwrap();

    assert_eq!(
        from_db.vector(
            &BASE_FEATURE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        ),
        from_cache.vector(
            &BASE_FEATURE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
        )
    );
}

#[test]
fn test_training_prefetch_slices_any_target_week() {
    let db = Database::open_in_memory().unwrap();
    seed_receiver(&db, 8);
    let table = ScoringTable::builtin();
    let rules = table.get("PPR").unwrap();

    let player = PlayerId::new("00-0099");
    let mut builder = FeatureBuilder::new(&db, rules);
    builder.prefetch_training(&[season()]).unwrap();

    for target_week in [4u16, 6, 8] {
        let mut fresh = FeatureBuilder::new(&db, rules);
        let expected = fresh
            .build_player_features(&player, season(), Week::new(target_week), false)
            .unwrap()
            .unwrap();
        let sliced = builder
            .build_player_features(&player, season(), Week::new(target_week), false)
            .unwrap()
            .unwrap();
        assert!(
            (expected.avg_fantasy_points_l3 - sliced.avg_fantasy_points_l3).abs() < 1e-9,
            "week {target_week}"
        );
        assert_eq!(expected.games_played_season, sliced.games_played_season);
    }
}

#[test]
fn test_dst_features_defaults_and_history() {
    let db = Database::open_in_memory().unwrap();
    seed_defense_history(&db, "NE", 5);
    let table = ScoringTable::builtin();
    let rules = table.get("FanDuel").unwrap();
    let mut builder = FeatureBuilder::new(&db, rules);

    let features = builder
        .build_dst_features(&TeamId::new("NE"), season(), Week::new(6))
        .unwrap()
        .unwrap();

    // Last 3 are weeks 3-5: points allowed 17/18/19.
    assert!((features.avg_points_allowed_l3 - 18.0).abs() < 1e-9);
    assert!((features.avg_sacks_l3 - 2.0).abs() < 1e-9);
    assert!((features.avg_turnovers_l3 - 1.0).abs() < 1e-9);
    assert_eq!(features.games_played_season, 5);
    // No schedule row: home by default, league-average opponent baseline.
    assert!(features.is_home);
    assert_eq!(features.opponent_avg_points_l3, LEAGUE_AVG_POINTS);
    assert_eq!(features.matchup_points_modifier, 1.0);

    let too_thin = builder
        .build_dst_features(&TeamId::new("NYJ"), season(), Week::new(6))
        .unwrap();
    assert!(too_thin.is_none());
}
