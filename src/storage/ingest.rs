//! Write operations: upserts used by ingestion collaborators and fixtures.
//!
//! The store is single-writer during ingestion; the projection pipeline
//! only reads. These helpers keep the write path inside the crate so tests
//! and seed scripts share one schema contract.

use super::{models::*, schema::Database};
use crate::cli::types::{Season, Week};
use crate::error::Result;
use rusqlite::params;

impl Database {
    pub fn upsert_team(&self, team: &TeamRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO teams (team_id, team_name, city, division, conference)
             VALUES (?, ?, ?, ?, ?)",
            params![
                team.team_id.as_str(),
                team.team_name,
                team.city,
                team.division,
                team.conference
            ],
        )?;
        Ok(())
    }

    pub fn upsert_player(&self, player: &PlayerRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO players (player_id, player_name, position)
             VALUES (?, ?, ?)",
            params![
                player.player_id.as_str(),
                player.player_name,
                player.position.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn upsert_game(&self, game: &GameRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO games
             (game_id, season_id, week, game_date, home_team_id, away_team_id,
              home_score, away_score)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                game.game_id,
                game.season.as_u16(),
                game.week.as_u16(),
                game.game_date,
                game.home_team_id.as_str(),
                game.away_team_id.as_str(),
                game.home_score,
                game.away_score
            ],
        )?;
        Ok(())
    }

    /// Mark a game final. Scores only transition from NULL to set.
    pub fn record_final_score(&self, game_id: &str, home: i64, away: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE games SET home_score = ?, away_score = ? WHERE game_id = ?",
            params![home, away, game_id],
        )?;
        Ok(())
    }

    pub fn upsert_game_stat(&self, stat: &GameStatRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO game_stats
             (player_id, game_id, team_id,
              pass_attempts, pass_completions, pass_yards, pass_touchdowns,
              pass_interceptions, pass_sacks,
              rush_attempts, rush_yards, rush_touchdowns, rush_fumbles,
              receptions, receiving_targets, receiving_yards,
              receiving_touchdowns, receiving_fumbles, target_share)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                stat.player_id.as_str(),
                stat.game_id,
                stat.team_id.as_ref().map(|t| t.as_str().to_string()),
                stat.pass_attempts,
                stat.pass_completions,
                stat.pass_yards,
                stat.pass_touchdowns,
                stat.pass_interceptions,
                stat.pass_sacks,
                stat.rush_attempts,
                stat.rush_yards,
                stat.rush_touchdowns,
                stat.rush_fumbles,
                stat.receptions,
                stat.receiving_targets,
                stat.receiving_yards,
                stat.receiving_touchdowns,
                stat.receiving_fumbles,
                stat.target_share
            ],
        )?;
        Ok(())
    }

    pub fn upsert_team_defense(&self, row: &TeamDefenseRow) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO team_defense_stats
             (team_id, game_id, season_id, week,
              points_allowed, yards_allowed, passing_yards_allowed,
              rushing_yards_allowed, interceptions, fumbles_recovered,
              sacks, sack_yards, defensive_touchdowns, pick_six,
              fumble_touchdowns, safeties, blocked_kicks, return_touchdowns,
              is_home, opponent_team_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                row.team_id.as_str(),
                row.game_id,
                row.season.as_u16(),
                row.week.as_u16(),
                row.points_allowed,
                row.yards_allowed,
                row.passing_yards_allowed,
                row.rushing_yards_allowed,
                row.interceptions,
                row.fumbles_recovered,
                row.sacks,
                row.sack_yards,
                row.defensive_touchdowns,
                row.pick_six,
                row.fumble_touchdowns,
                row.safeties,
                row.blocked_kicks,
                row.return_touchdowns,
                row.is_home.map(|h| h as i64),
                row.opponent_team_id.as_ref().map(|t| t.as_str().to_string())
            ],
        )?;
        Ok(())
    }

    pub fn insert_injury(&self, injury: &InjuryRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO historical_injuries
             (season, game_type, team, week, gsis_id, position, full_name,
              report_primary_injury, report_status, practice_status, date_modified)
             VALUES (?, 'REG', ?, ?, NULL, ?, ?, ?, ?, ?, ?)",
            params![
                injury.season.as_u16(),
                injury.team.as_str(),
                injury.week.as_u16(),
                injury.position,
                injury.full_name,
                injury.report_primary_injury,
                injury.report_status,
                injury.practice_status,
                injury.date_modified
            ],
        )?;
        Ok(())
    }

    /// Insert a scoring system row using whichever DST column names the
    /// caller supplies (current or legacy).
    pub fn insert_scoring_system(
        &self,
        name: &str,
        values: &[(&str, f64)],
    ) -> Result<()> {
        let mut columns = vec!["system_name".to_string()];
        let mut placeholders = vec!["?".to_string()];
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(name.to_string())];
        for (col, value) in values {
            columns.push(col.to_string());
            placeholders.push("?".to_string());
            bound.push(Box::new(*value));
        }
        let sql = format!(
            "INSERT OR REPLACE INTO scoring_systems ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn.execute(
            &sql,
            rusqlite::params_from_iter(bound.iter().map(|p| p.as_ref())),
        )?;
        Ok(())
    }

    /// Delete every stat row for a week; used when a previously ready week
    /// is re-ingested.
    pub fn clear_week(&self, season: Season, week: Week) -> Result<()> {
        self.conn.execute(
            "DELETE FROM game_stats WHERE game_id IN
             (SELECT game_id FROM games WHERE season_id = ? AND week = ?)",
            params![season.as_u16(), week.as_u16()],
        )?;
        self.conn.execute(
            "DELETE FROM team_defense_stats WHERE season_id = ? AND week = ?",
            params![season.as_u16(), week.as_u16()],
        )?;
        Ok(())
    }
}
