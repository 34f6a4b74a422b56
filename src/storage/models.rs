//! Row models for the storage layer

use crate::cli::types::{position, PlayerId, Position, Season, TeamId, Week};
use rusqlite::types::ValueRef;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Coerce a cell to a float, tolerating NULLs, integer affinity, and
/// stray text/byte sentinels left behind by upstream collectors.
pub(crate) fn opt_num(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok()),
        ValueRef::Blob(b) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok()),
    })
}

/// An NFL franchise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRow {
    pub team_id: TeamId,
    pub team_name: String,
    pub city: Option<String>,
    pub division: Option<String>,
    pub conference: Option<String>,
}

/// A player as stored in `players`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRow {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: Position,
}

/// A scheduled or completed game. Scores stay NULL until final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRow {
    pub game_id: String,
    pub season: Season,
    pub week: Week,
    pub game_date: Option<String>,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

/// One player's box-score line, joined with the game's (season, week).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStatRow {
    pub player_id: PlayerId,
    pub game_id: String,
    pub team_id: Option<TeamId>,
    pub season: Season,
    pub week: Week,
    pub pass_attempts: Option<f64>,
    pub pass_completions: Option<f64>,
    pub pass_yards: Option<f64>,
    pub pass_touchdowns: Option<f64>,
    pub pass_interceptions: Option<f64>,
    pub pass_sacks: Option<f64>,
    pub rush_attempts: Option<f64>,
    pub rush_yards: Option<f64>,
    pub rush_touchdowns: Option<f64>,
    pub rush_fumbles: Option<f64>,
    pub receptions: Option<f64>,
    pub receiving_targets: Option<f64>,
    pub receiving_yards: Option<f64>,
    pub receiving_touchdowns: Option<f64>,
    pub receiving_fumbles: Option<f64>,
    pub target_share: Option<f64>,
}

impl GameStatRow {
    /// Column list matching `from_row`, for SELECTs joined with `games g`.
    pub(crate) const COLUMNS: &'static str = "gs.player_id, gs.game_id, gs.team_id, \
        g.season_id, g.week, \
        gs.pass_attempts, gs.pass_completions, gs.pass_yards, gs.pass_touchdowns, \
        gs.pass_interceptions, gs.pass_sacks, \
        gs.rush_attempts, gs.rush_yards, gs.rush_touchdowns, gs.rush_fumbles, \
        gs.receptions, gs.receiving_targets, gs.receiving_yards, \
        gs.receiving_touchdowns, gs.receiving_fumbles, gs.target_share";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Self::from_row_at(row, 0)
    }

    /// Map columns starting at `base`, for SELECTs that prepend extra
    /// columns (e.g. the player's position in training scans).
    pub(crate) fn from_row_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Self> {
        Ok(GameStatRow {
            player_id: PlayerId::new(row.get::<_, String>(base)?),
            game_id: row.get(base + 1)?,
            team_id: row.get::<_, Option<String>>(base + 2)?.map(TeamId::new),
            season: Season::new(row.get::<_, u16>(base + 3)?),
            week: Week::new(row.get::<_, u16>(base + 4)?),
            pass_attempts: opt_num(row, base + 5)?,
            pass_completions: opt_num(row, base + 6)?,
            pass_yards: opt_num(row, base + 7)?,
            pass_touchdowns: opt_num(row, base + 8)?,
            pass_interceptions: opt_num(row, base + 9)?,
            pass_sacks: opt_num(row, base + 10)?,
            rush_attempts: opt_num(row, base + 11)?,
            rush_yards: opt_num(row, base + 12)?,
            rush_touchdowns: opt_num(row, base + 13)?,
            rush_fumbles: opt_num(row, base + 14)?,
            receptions: opt_num(row, base + 15)?,
            receiving_targets: opt_num(row, base + 16)?,
            receiving_yards: opt_num(row, base + 17)?,
            receiving_touchdowns: opt_num(row, base + 18)?,
            receiving_fumbles: opt_num(row, base + 19)?,
            target_share: opt_num(row, base + 20)?,
        })
    }
}

/// One team's defensive line for a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamDefenseRow {
    pub team_id: TeamId,
    pub game_id: String,
    pub season: Season,
    pub week: Week,
    pub points_allowed: Option<f64>,
    pub yards_allowed: Option<f64>,
    pub passing_yards_allowed: Option<f64>,
    pub rushing_yards_allowed: Option<f64>,
    pub interceptions: Option<f64>,
    pub fumbles_recovered: Option<f64>,
    pub sacks: Option<f64>,
    pub sack_yards: Option<f64>,
    pub defensive_touchdowns: Option<f64>,
    pub pick_six: Option<f64>,
    pub fumble_touchdowns: Option<f64>,
    pub safeties: Option<f64>,
    pub blocked_kicks: Option<f64>,
    pub return_touchdowns: Option<f64>,
    pub is_home: Option<bool>,
    pub opponent_team_id: Option<TeamId>,
}

impl TeamDefenseRow {
    pub(crate) const COLUMNS: &'static str = "tds.team_id, tds.game_id, tds.season_id, tds.week, \
        tds.points_allowed, tds.yards_allowed, tds.passing_yards_allowed, \
        tds.rushing_yards_allowed, tds.interceptions, tds.fumbles_recovered, \
        tds.sacks, tds.sack_yards, tds.defensive_touchdowns, tds.pick_six, \
        tds.fumble_touchdowns, tds.safeties, tds.blocked_kicks, \
        tds.return_touchdowns, tds.is_home, tds.opponent_team_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TeamDefenseRow {
            team_id: TeamId::new(row.get::<_, String>(0)?),
            game_id: row.get(1)?,
            season: Season::new(row.get::<_, u16>(2)?),
            week: Week::new(row.get::<_, u16>(3)?),
            points_allowed: opt_num(row, 4)?,
            yards_allowed: opt_num(row, 5)?,
            passing_yards_allowed: opt_num(row, 6)?,
            rushing_yards_allowed: opt_num(row, 7)?,
            interceptions: opt_num(row, 8)?,
            fumbles_recovered: opt_num(row, 9)?,
            sacks: opt_num(row, 10)?,
            sack_yards: opt_num(row, 11)?,
            defensive_touchdowns: opt_num(row, 12)?,
            pick_six: opt_num(row, 13)?,
            fumble_touchdowns: opt_num(row, 14)?,
            safeties: opt_num(row, 15)?,
            blocked_kicks: opt_num(row, 16)?,
            return_touchdowns: opt_num(row, 17)?,
            is_home: row.get::<_, Option<i64>>(18)?.map(|v| v != 0),
            opponent_team_id: row.get::<_, Option<String>>(19)?.map(TeamId::new),
        })
    }
}

/// An injury report line as stored in `historical_injuries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryRow {
    pub season: Season,
    pub week: Week,
    pub team: TeamId,
    pub position: Option<String>,
    pub full_name: String,
    pub report_primary_injury: Option<String>,
    pub report_status: Option<String>,
    pub practice_status: Option<String>,
    pub date_modified: Option<String>,
}

impl InjuryRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(InjuryRow {
            season: Season::new(row.get::<_, u16>(0)?),
            week: Week::new(row.get::<_, u16>(1)?),
            team: TeamId::new(row.get::<_, String>(2)?),
            position: row.get(3)?,
            full_name: row.get(4)?,
            report_primary_injury: row.get(5)?,
            report_status: row.get(6)?,
            practice_status: row.get(7)?,
            date_modified: row.get(8)?,
        })
    }
}

/// A skill player eligible for projection in a given week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligiblePlayer {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: Position,
    pub team_id: TeamId,
    pub last_week_played: Week,
}

/// One side of a scheduled game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekMatchup {
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    pub is_home: bool,
}

/// Per-game offensive aggregates for one team, used by strength analysis.
#[derive(Debug, Clone, Default)]
pub struct OffenseGameAgg {
    pub week: Week,
    pub team_points: f64,
    pub pass_yards: f64,
    pub rush_yards: f64,
    pub pass_tds: f64,
    pub rush_tds: f64,
    pub rec_tds: f64,
    pub turnovers: f64,
    pub sacks_allowed: f64,
}

/// Per-game opponent production split by position, measured against one
/// defense.
#[derive(Debug, Clone, Default)]
pub struct OpponentSplitAgg {
    pub week: Week,
    pub qb_pass_yards: f64,
    pub qb_pass_tds: f64,
    pub qb_pass_attempts: f64,
    pub rb_rush_yards: f64,
    pub rb_rush_tds: f64,
    pub rb_rush_attempts: f64,
    pub rb_rec_yards: f64,
    pub wr_rec_yards: f64,
    pub te_rec_yards: f64,
}

/// League-wide defensive averages over a lookback window, for ranking.
#[derive(Debug, Clone)]
pub struct LeagueDefenseAvg {
    pub team_id: TeamId,
    pub avg_points_allowed: f64,
    pub avg_sacks: f64,
    pub avg_turnovers: f64,
}

/// Raw counts behind a week-readiness verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeekReadinessCounts {
    pub games: i64,
    pub scored_games: i64,
    pub dst_rows: i64,
    pub synthetic_ids: i64,
}

/// A training scan row: a box-score line plus the player's position.
#[derive(Debug, Clone)]
pub struct TrainingStatRow {
    pub position: Position,
    pub stats: GameStatRow,
}

pub(crate) fn parse_position_cell(raw: &str) -> Position {
    position::parse_lenient(raw)
}
