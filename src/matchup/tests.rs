//! Tests for strength and matchup analysis

use super::*;
use crate::cli::types::{PlayerId, Position, Season, TeamId, Week};
use crate::storage::{Database, GameRow, GameStatRow, PlayerRow, TeamDefenseRow};

fn season() -> Season {
    Season::new(2024)
}

fn game_id(week: u16, home: &str, away: &str) -> String {
    format!("2024_{week:02}_{away}_{home}")
}

fn seed_game(db: &Database, week: u16, home: &str, away: &str, home_score: i64, away_score: i64) {
    db.upsert_game(&GameRow {
        game_id: game_id(week, home, away),
        season: season(),
        week: Week::new(week),
        game_date: None,
        home_team_id: TeamId::new(home),
        away_team_id: TeamId::new(away),
        home_score: Some(home_score),
        away_score: Some(away_score),
    })
    .unwrap();
}

fn seed_qb_line(db: &Database, week: u16, home: &str, away: &str, team: &str, pass_yards: f64) {
    let qb_id = format!("qb-{team}");
    db.upsert_player(&PlayerRow {
        player_id: PlayerId::new(qb_id.clone()),
        player_name: format!("{team} QB"),
        position: Position::QB,
    })
    .unwrap();
    db.upsert_game_stat(&GameStatRow {
        player_id: PlayerId::new(qb_id),
        game_id: game_id(week, home, away),
        team_id: Some(TeamId::new(team)),
        season: season(),
        week: Week::new(week),
        pass_attempts: Some(34.0),
        pass_yards: Some(pass_yards),
        pass_touchdowns: Some(2.0),
        pass_interceptions: Some(1.0),
        pass_sacks: Some(2.0),
        ..Default::default()
    })
    .unwrap();
}

fn seed_defense(db: &Database, week: u16, home: &str, away: &str, team: &str, allowed: f64) {
    db.upsert_team_defense(&TeamDefenseRow {
        team_id: TeamId::new(team),
        game_id: game_id(week, home, away),
        season: season(),
        week: Week::new(week),
        points_allowed: Some(allowed),
        yards_allowed: Some(330.0),
        passing_yards_allowed: Some(220.0),
        rushing_yards_allowed: Some(110.0),
        interceptions: Some(1.0),
        fumbles_recovered: Some(1.0),
        sacks: Some(3.0),
        is_home: Some(team == home),
        opponent_team_id: Some(TeamId::new(if team == home { away } else { home })),
        ..Default::default()
    })
    .unwrap();
}

/// KC at home vs SF for five straight weeks; enough history to analyze
/// week 6.
fn fixture() -> Database {
    let db = Database::open_in_memory().unwrap();
    for week in 1..=5 {
        seed_game(&db, week, "KC", "SF", 27, 17);
        seed_qb_line(&db, week, "KC", "SF", "KC", 285.0);
        seed_qb_line(&db, week, "KC", "SF", "SF", 210.0);
        seed_defense(&db, week, "KC", "SF", "KC", 17.0);
        seed_defense(&db, week, "KC", "SF", "SF", 27.0);
    }
    db
}

#[test]
fn test_offensive_strength_aggregates_prior_weeks_only() {
    let db = fixture();
    let analyzer = MatchupAnalyzer::new(&db);

    let offense = analyzer
        .offensive_strength(&TeamId::new("KC"), season(), Week::new(6))
        .unwrap();
    assert_eq!(offense.games_analyzed, 5);
    assert!((offense.points_per_game - 27.0).abs() < 1e-9);
    assert!((offense.passing_yards_per_game - 285.0).abs() < 1e-9);
    assert!(offense.offensive_score > 0.0 && offense.offensive_score <= 100.0);

    // Week 1 has no prior games.
    let empty = analyzer
        .offensive_strength(&TeamId::new("KC"), season(), Week::new(1))
        .unwrap();
    assert_eq!(empty.games_analyzed, 0);
    assert_eq!(empty.offensive_score, 0.0);
}

#[test]
fn test_defensive_strength_and_composite_bounds() {
    let db = fixture();
    let analyzer = MatchupAnalyzer::new(&db);

    let defense = analyzer
        .defensive_strength(&TeamId::new("KC"), season(), Week::new(6))
        .unwrap();
    assert_eq!(defense.games_analyzed, 5);
    assert!((defense.points_allowed_per_game - 17.0).abs() < 1e-9);
    assert!((defense.turnovers_forced_per_game - 2.0).abs() < 1e-9);
    assert!(defense.defensive_score >= 0.0 && defense.defensive_score <= 100.0);
}

#[test]
fn test_strengths_ignore_row_insert_order() {
    // Same games inserted in reverse week order must produce identical
    // composites.
    let forward = fixture();

    let reversed = Database::open_in_memory().unwrap();
    for week in (1..=5).rev() {
        seed_game(&reversed, week, "KC", "SF", 27, 17);
        seed_qb_line(&reversed, week, "KC", "SF", "KC", 285.0);
        seed_qb_line(&reversed, week, "KC", "SF", "SF", 210.0);
        seed_defense(&reversed, week, "KC", "SF", "KC", 17.0);
        seed_defense(&reversed, week, "KC", "SF", "SF", 27.0);
    }

    let a = MatchupAnalyzer::new(&forward);
    let b = MatchupAnalyzer::new(&reversed);
    let kc = TeamId::new("KC");

    let off_a = a.offensive_strength(&kc, season(), Week::new(6)).unwrap();
    let off_b = b.offensive_strength(&kc, season(), Week::new(6)).unwrap();
    assert_eq!(off_a.offensive_score, off_b.offensive_score);

    let def_a = a.defensive_strength(&kc, season(), Week::new(6)).unwrap();
    let def_b = b.defensive_strength(&kc, season(), Week::new(6)).unwrap();
    assert_eq!(def_a.defensive_score, def_b.defensive_score);
}

#[test]
fn test_matchup_modifiers_are_clamped() {
    let db = fixture();
    let analyzer = MatchupAnalyzer::new(&db);

    let matchup = analyzer
        .analyze_matchup(&TeamId::new("KC"), &TeamId::new("SF"), season(), Week::new(6))
        .unwrap();
    assert!(matchup.points_modifier >= 0.5 && matchup.points_modifier <= 1.5);
    assert!(matchup.turnover_modifier >= 0.5 && matchup.turnover_modifier <= 1.5);
    assert!(matchup.sack_modifier >= 0.5 && matchup.sack_modifier <= 1.5);
    assert!(
        (matchup.offensive_advantage + matchup.defensive_advantage).abs() < 1e-9,
        "advantages mirror each other"
    );
    assert!(matchup.matchup_type.contains(" vs "));
}

#[test]
fn test_opponent_resolution() {
    let db = fixture();
    let analyzer = MatchupAnalyzer::new(&db);

    let opponent = analyzer
        .opponent_for(&TeamId::new("KC"), season(), Week::new(3))
        .unwrap();
    assert_eq!(opponent, Some(TeamId::new("SF")));

    let none = analyzer
        .opponent_for(&TeamId::new("DAL"), season(), Week::new(3))
        .unwrap();
    assert_eq!(none, None);
}

#[test]
fn test_missing_data_yields_zero_profile() {
    let db = Database::open_in_memory().unwrap();
    let analyzer = MatchupAnalyzer::new(&db);

    let profile = analyzer
        .position_profile(&TeamId::new("KC"), season(), Week::new(6))
        .unwrap();
    assert_eq!(profile.games_analyzed, 0);
    assert_eq!(profile.pass_defense_rank, 16);
    assert_eq!(profile.yards_per_carry_allowed, 4.0);
}

#[test]
fn test_position_profile_rates() {
    let db = fixture();
    let analyzer = MatchupAnalyzer::new(&db);

    let profile = analyzer
        .position_profile(&TeamId::new("KC"), season(), Week::new(6))
        .unwrap();
    assert_eq!(profile.games_analyzed, 5);
    // SF's QB threw for 210 per game against KC.
    assert!((profile.pass_yards_allowed_per_game - 210.0).abs() < 1e-9);
    // 15 sacks over 170 opponent attempts.
    assert!((profile.sack_rate - 15.0 / 170.0).abs() < 1e-9);
    assert!(profile.pass_defense_rank >= 1 && profile.pass_defense_rank <= 32);
}

#[test]
fn test_position_matchup_feature_order_and_clamps() {
    let db = fixture();
    let analyzer = MatchupAnalyzer::new(&db);
    let kc = TeamId::new("KC");
    let sf = TeamId::new("SF");

    for position in [Position::QB, Position::RB, Position::WR, Position::TE] {
        let features = analyzer
            .position_matchup_features(position, &kc, &sf, season(), Week::new(6))
            .unwrap();
        let expected: Vec<&str> = position_feature_names(position).to_vec();
        let got: Vec<&str> = features.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(got, expected, "{position} feature order");
    }

    let qb = analyzer
        .position_matchup_features(Position::QB, &kc, &sf, season(), Week::new(6))
        .unwrap();
    let efficiency = qb
        .iter()
        .find(|(name, _)| name == "qb_efficiency_modifier")
        .unwrap()
        .1;
    assert!((0.7..=1.4).contains(&efficiency));

    let te = analyzer
        .position_matchup_features(Position::TE, &kc, &sf, season(), Week::new(6))
        .unwrap();
    let efficiency = te
        .iter()
        .find(|(name, _)| name == "te_efficiency_modifier")
        .unwrap()
        .1;
    assert!((0.7..=1.3).contains(&efficiency));
}
