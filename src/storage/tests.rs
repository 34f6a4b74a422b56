//! Unit tests for storage queries

use super::*;
use crate::cli::types::{PlayerId, Position, Season, TeamId, Week};

fn season() -> Season {
    Season::new(2024)
}

fn seed_player(db: &Database, id: &str, name: &str, position: Position) {
    db.upsert_player(&PlayerRow {
        player_id: PlayerId::new(id),
        player_name: name.to_string(),
        position,
    })
    .unwrap();
}

fn seed_game(db: &Database, game_id: &str, week: u16, home: &str, away: &str, scored: bool) {
    db.upsert_game(&GameRow {
        game_id: game_id.to_string(),
        season: season(),
        week: Week::new(week),
        game_date: None,
        home_team_id: TeamId::new(home),
        away_team_id: TeamId::new(away),
        home_score: scored.then_some(24),
        away_score: scored.then_some(17),
    })
    .unwrap();
}

fn seed_stat(db: &Database, player: &str, game_id: &str, week: u16, team: &str, yards: f64) {
    db.upsert_game_stat(&GameStatRow {
        player_id: PlayerId::new(player),
        game_id: game_id.to_string(),
        team_id: Some(TeamId::new(team)),
        season: season(),
        week: Week::new(week),
        receiving_yards: Some(yards),
        receiving_targets: Some(6.0),
        ..Default::default()
    })
    .unwrap();
}

#[test]
fn test_player_history_is_strictly_before_and_ordered() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Player One", Position::WR);
    for week in 1..=6 {
        let game_id = format!("2024_{week:02}_KC_SF");
        seed_game(&db, &game_id, week, "KC", "SF", true);
        seed_stat(&db, "p1", &game_id, week, "KC", 50.0 + week as f64);
    }

    let history = db
        .player_history(&PlayerId::new("p1"), season(), Week::new(4), 50)
        .unwrap();
    assert_eq!(history.len(), 3);
    // Most recent first, nothing at or past week 4.
    assert_eq!(history[0].week, Week::new(3));
    assert_eq!(history[2].week, Week::new(1));

    let limited = db
        .player_history(&PlayerId::new("p1"), season(), Week::new(7), 2)
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].week, Week::new(6));
}

#[test]
fn test_player_history_bulk_groups_by_player() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Player One", Position::WR);
    seed_player(&db, "p2", "Player Two", Position::RB);
    for week in 1..=3 {
        let game_id = format!("2024_{week:02}_KC_SF");
        seed_game(&db, &game_id, week, "KC", "SF", true);
        seed_stat(&db, "p1", &game_id, week, "KC", 60.0);
        seed_stat(&db, "p2", &game_id, week, "SF", 40.0);
    }

    let grouped = db
        .player_history_bulk(
            &[PlayerId::new("p1"), PlayerId::new("p2")],
            season(),
            Week::new(4),
        )
        .unwrap();
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[&PlayerId::new("p1")].len(), 3);
    assert_eq!(grouped[&PlayerId::new("p2")].len(), 3);
    assert_eq!(grouped[&PlayerId::new("p1")][0].week, Week::new(3));
}

#[test]
fn test_garbage_stat_cells_coerce_to_none() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Player One", Position::WR);
    seed_game(&db, "g1", 1, "KC", "SF", true);
    // Simulate a collector writing text junk into a numeric column.
    db.conn
        .execute(
            "INSERT INTO game_stats (player_id, game_id, team_id, receiving_yards, target_share)
             VALUES ('p1', 'g1', 'KC', 'not-a-number', '0.25')",
            [],
        )
        .unwrap();

    let history = db
        .player_history(&PlayerId::new("p1"), season(), Week::new(2), 50)
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].receiving_yards, None);
    // Parseable text still coerces.
    assert_eq!(history[0].target_share, Some(0.25));
}

#[test]
fn test_week_matchups_and_opponent() {
    let db = Database::open_in_memory().unwrap();
    seed_game(&db, "g1", 5, "KC", "SF", false);
    seed_game(&db, "g2", 5, "DAL", "NYG", false);

    let matchups = db.week_matchups(season(), Week::new(5)).unwrap();
    assert_eq!(matchups.len(), 4);
    let kc = matchups
        .iter()
        .find(|m| m.team_id == TeamId::new("KC"))
        .unwrap();
    assert_eq!(kc.opponent_id, TeamId::new("SF"));
    assert!(kc.is_home);
    let sf = matchups
        .iter()
        .find(|m| m.team_id == TeamId::new("SF"))
        .unwrap();
    assert!(!sf.is_home);

    assert_eq!(
        db.opponent_for(&TeamId::new("NYG"), season(), Week::new(5))
            .unwrap(),
        Some(TeamId::new("DAL"))
    );
    assert_eq!(
        db.opponent_for(&TeamId::new("KC"), season(), Week::new(6))
            .unwrap(),
        None
    );
}

#[test]
fn test_eligible_players_require_team_playing_this_week() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Playing Guy", Position::WR);
    seed_player(&db, "p2", "Bye Week Guy", Position::WR);
    seed_player(&db, "k1", "Kicker", Position::K);

    for week in 1..=4 {
        let g_kc = format!("2024_{week:02}_KC_SF");
        seed_game(&db, &g_kc, week, "KC", "SF", true);
        seed_stat(&db, "p1", &g_kc, week, "KC", 70.0);

        let g_dal = format!("2024_{week:02}_DAL_NYG");
        seed_game(&db, &g_dal, week, "DAL", "NYG", true);
        seed_stat(&db, "p2", &g_dal, week, "DAL", 60.0);
    }
    // Week 5: only KC/SF play.
    seed_game(&db, "2024_05_KC_SF", 5, "KC", "SF", false);

    let eligible = db.eligible_players(season(), Week::new(5)).unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].player_id, PlayerId::new("p1"));
    assert_eq!(eligible[0].team_id, TeamId::new("KC"));
}

#[test]
fn test_eligible_players_resolve_trades_to_latest_team() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Traded Guy", Position::RB);
    for week in 1..=2 {
        let game_id = format!("2024_{week:02}_KC_SF");
        seed_game(&db, &game_id, week, "KC", "SF", true);
        seed_stat(&db, "p1", &game_id, week, "KC", 40.0);
    }
    for week in 3..=4 {
        let game_id = format!("2024_{week:02}_DAL_NYG");
        seed_game(&db, &game_id, week, "DAL", "NYG", true);
        seed_stat(&db, "p1", &game_id, week, "DAL", 45.0);
    }
    seed_game(&db, "2024_05_DAL_NYG", 5, "DAL", "NYG", false);
    seed_game(&db, "2024_05_KC_SF", 5, "KC", "SF", false);

    let eligible = db.eligible_players(season(), Week::new(5)).unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].team_id, TeamId::new("DAL"));
}

#[test]
fn test_readiness_counts() {
    let db = Database::open_in_memory().unwrap();
    seed_game(&db, "g1", 3, "KC", "SF", true);
    seed_game(&db, "g2", 3, "DAL", "NYG", false);
    db.upsert_team_defense(&TeamDefenseRow {
        team_id: TeamId::new("KC"),
        game_id: "g1".to_string(),
        season: season(),
        week: Week::new(3),
        points_allowed: Some(17.0),
        ..Default::default()
    })
    .unwrap();

    let counts = db.readiness_counts(season(), Week::new(3)).unwrap();
    assert_eq!(counts.games, 2);
    assert_eq!(counts.scored_games, 1);
    assert_eq!(counts.dst_rows, 1);
    assert_eq!(counts.synthetic_ids, 0);
}

#[test]
fn test_latest_completed_game() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.latest_completed_game(None).unwrap(), None);

    seed_game(&db, "g1", 3, "KC", "SF", true);
    seed_game(&db, "g2", 7, "DAL", "NYG", true);
    seed_game(&db, "g3", 9, "MIA", "BUF", false);

    assert_eq!(
        db.latest_completed_game(None).unwrap(),
        Some((season(), Week::new(7)))
    );
    assert_eq!(
        db.latest_completed_game(Some(&[Season::new(2023)])).unwrap(),
        None
    );
}

#[test]
fn test_scoring_system_rows_expose_all_columns() {
    let db = Database::open_in_memory().unwrap();
    db.insert_scoring_system(
        "FanDuel",
        &[
            ("pass_yard_points", 0.04),
            ("reception_points", 0.5),
            ("dst_shutout_points", 10.0),
        ],
    )
    .unwrap();

    let rows = db.scoring_system_rows().unwrap();
    assert_eq!(rows.len(), 1);
    let (name, values) = &rows[0];
    assert_eq!(name, "FanDuel");
    assert_eq!(values.get("pass_yard_points"), Some(&0.04));
    assert_eq!(values.get("dst_shutout_points"), Some(&10.0));
    // Unset columns stay absent rather than defaulting here.
    assert!(!values.contains_key("rush_yard_points"));
}

#[test]
fn test_training_scans_cover_requested_seasons_only() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Player One", Position::WR);

    seed_game(&db, "2024_01_KC_SF", 1, "KC", "SF", true);
    seed_stat(&db, "p1", "2024_01_KC_SF", 1, "KC", 55.0);

    db.upsert_game(&GameRow {
        game_id: "2023_01_KC_SF".to_string(),
        season: Season::new(2023),
        week: Week::new(1),
        game_date: None,
        home_team_id: TeamId::new("KC"),
        away_team_id: TeamId::new("SF"),
        home_score: Some(30),
        away_score: Some(13),
    })
    .unwrap();
    db.upsert_game_stat(&GameStatRow {
        player_id: PlayerId::new("p1"),
        game_id: "2023_01_KC_SF".to_string(),
        team_id: Some(TeamId::new("KC")),
        season: Season::new(2023),
        week: Week::new(1),
        receiving_yards: Some(80.0),
        ..Default::default()
    })
    .unwrap();

    let rows = db.training_stat_rows(&[Season::new(2024)]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].stats.season, Season::new(2024));
    assert_eq!(rows[0].position, Position::WR);

    let both = db
        .training_stat_rows(&[Season::new(2023), Season::new(2024)])
        .unwrap();
    assert_eq!(both.len(), 2);
}

#[test]
fn test_team_name_falls_back_to_code() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_team(&TeamRow {
        team_id: TeamId::new("KC"),
        team_name: "Kansas City Chiefs".to_string(),
        city: Some("Kansas City".to_string()),
        division: Some("AFC West".to_string()),
        conference: Some("AFC".to_string()),
    })
    .unwrap();

    assert_eq!(db.team_name(&TeamId::new("KC")).unwrap(), "Kansas City Chiefs");
    assert_eq!(db.team_name(&TeamId::new("ZZZ")).unwrap(), "ZZZ");
}

#[test]
fn test_clear_week_removes_stat_rows() {
    let db = Database::open_in_memory().unwrap();
    seed_player(&db, "p1", "Player One", Position::WR);
    seed_game(&db, "g1", 2, "KC", "SF", true);
    seed_stat(&db, "p1", "g1", 2, "KC", 44.0);
    db.upsert_team_defense(&TeamDefenseRow {
        team_id: TeamId::new("KC"),
        game_id: "g1".to_string(),
        season: season(),
        week: Week::new(2),
        ..Default::default()
    })
    .unwrap();

    db.clear_week(season(), Week::new(2)).unwrap();
    let counts = db.readiness_counts(season(), Week::new(2)).unwrap();
    assert_eq!(counts.dst_rows, 0);
    let history = db
        .player_history(&PlayerId::new("p1"), season(), Week::new(3), 50)
        .unwrap();
    assert!(history.is_empty());
}
