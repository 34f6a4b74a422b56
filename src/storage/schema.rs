//! Database schema and connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;

/// Connection manager for the NFL stat store.
///
/// Owns a single `rusqlite::Connection`; query operations hang off this
/// type in `queries.rs` and ingest helpers in `ingest.rs`. Readers treat
/// the store as a consistent snapshot; ingestion is single-writer.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (or create) the store at `path` and ensure tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Create the required tables and indexes if they do not exist.
    pub(crate) fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS teams (
                team_id TEXT PRIMARY KEY,
                team_name TEXT NOT NULL,
                city TEXT,
                division TEXT,
                conference TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
                player_id TEXT PRIMARY KEY,
                player_name TEXT NOT NULL,
                position TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                game_id TEXT PRIMARY KEY,
                season_id INTEGER NOT NULL,
                week INTEGER NOT NULL,
                game_date TEXT,
                game_time TEXT,
                home_team_id TEXT NOT NULL,
                away_team_id TEXT NOT NULL,
                home_score INTEGER,
                away_score INTEGER
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS game_stats (
                player_id TEXT NOT NULL,
                game_id TEXT NOT NULL,
                team_id TEXT,
                pass_attempts REAL,
                pass_completions REAL,
                pass_yards REAL,
                pass_touchdowns REAL,
                pass_interceptions REAL,
                pass_sacks REAL,
                rush_attempts REAL,
                rush_yards REAL,
                rush_touchdowns REAL,
                rush_fumbles REAL,
                receptions REAL,
                receiving_targets REAL,
                receiving_yards REAL,
                receiving_touchdowns REAL,
                receiving_fumbles REAL,
                target_share REAL,
                PRIMARY KEY (player_id, game_id),
                FOREIGN KEY (player_id) REFERENCES players(player_id),
                FOREIGN KEY (game_id) REFERENCES games(game_id)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS team_defense_stats (
                team_id TEXT NOT NULL,
                game_id TEXT NOT NULL,
                season_id INTEGER NOT NULL,
                week INTEGER NOT NULL,
                points_allowed REAL,
                yards_allowed REAL,
                passing_yards_allowed REAL,
                rushing_yards_allowed REAL,
                interceptions REAL,
                fumbles_recovered REAL,
                sacks REAL,
                sack_yards REAL,
                defensive_touchdowns REAL,
                pick_six REAL,
                fumble_touchdowns REAL,
                safeties REAL,
                blocked_kicks REAL,
                return_touchdowns REAL,
                is_home INTEGER,
                opponent_team_id TEXT,
                PRIMARY KEY (team_id, game_id)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS scoring_systems (
                system_name TEXT PRIMARY KEY,
                pass_yard_points REAL,
                pass_td_points REAL,
                pass_int_points REAL,
                rush_yard_points REAL,
                rush_td_points REAL,
                reception_points REAL,
                receiving_yard_points REAL,
                receiving_td_points REAL,
                fumble_points REAL,
                sack_points REAL,
                int_points REAL,
                fumble_recovery_points REAL,
                defensive_td_points REAL,
                safety_points REAL,
                dst_shutout_points REAL,
                dst_1to6_points REAL,
                dst_7to13_points REAL,
                dst_14to20_points REAL,
                dst_21to27_points REAL,
                dst_28to34_points REAL,
                dst_35plus_points REAL,
                dst_under300_bonus REAL,
                dst_under100_bonus REAL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS historical_injuries (
                season INTEGER NOT NULL,
                game_type TEXT,
                team TEXT NOT NULL,
                week INTEGER NOT NULL,
                gsis_id TEXT,
                position TEXT,
                full_name TEXT NOT NULL,
                report_primary_injury TEXT,
                report_status TEXT,
                practice_status TEXT,
                date_modified TEXT
            )",
            [],
        )?;

        // Indexes for the hot history and readiness scans
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_games_season_week
             ON games(season_id, week)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_game_stats_player
             ON game_stats(player_id)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_defense_team_season_week
             ON team_defense_stats(team_id, season_id, week)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_injuries_season_week
             ON historical_injuries(season, week)",
            [],
        )?;

        Ok(())
    }
}
