//! Leak-free feature building for players and team defenses.
//!
//! Every feature is derived from games strictly preceding the target
//! (season, week) under lexicographic order. The builder owns a
//! request-scoped prefetch cache so that bulk prediction and training
//! compute fantasy points exactly once per row per ruleset.

#[cfg(test)]
mod tests;

use crate::cli::types::{PlayerId, Position, Season, TeamId, Week};
use crate::error::Result;
use crate::matchup::MatchupAnalyzer;
use crate::scoring::{self, ScoringRules};
use crate::storage::{Database, GameStatRow, TeamDefenseRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Base feature order shared by every player model.
pub const BASE_FEATURE_NAMES: [&str; 10] = [
    "avg_fantasy_points_l3",
    "avg_targets_l3",
    "avg_carries_l3",
    "avg_passing_attempts_l3",
    "avg_fantasy_points_season",
    "games_played_season",
    "position_encoded",
    "target_share_l3",
    "consistency_score",
    "trend_score",
];

/// DST feature order.
pub const DST_FEATURE_NAMES: [&str; 17] = [
    "avg_points_allowed_l3",
    "avg_sacks_l3",
    "avg_turnovers_l3",
    "avg_fantasy_points_l3",
    "avg_points_allowed_season",
    "avg_sacks_season",
    "avg_turnovers_season",
    "avg_fantasy_points_season",
    "games_played_season",
    "opponent_avg_points_l3",
    "opponent_avg_points_season",
    "is_home",
    "consistency_score",
    "trend_score",
    "opponent_offensive_score",
    "matchup_points_modifier",
    "matchup_sack_modifier",
];

/// Most prior games ever pulled for one player.
const PLAYER_HISTORY_LIMIT: usize = 50;
/// Most prior games ever pulled for one defense.
const DST_HISTORY_LIMIT: usize = 20;
/// Minimum history before a projection is attempted.
const MIN_HISTORY_GAMES: usize = 3;

/// League-average points baseline used when opponent scoring data is
/// unavailable.
pub const LEAGUE_AVG_POINTS: f64 = 21.0;

/// Rolling and matchup features for one (player, season, week, ruleset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerFeatures {
    pub player_id: PlayerId,
    pub season: Season,
    pub week: Week,
    pub position: Position,
    pub team_id: Option<TeamId>,

    pub avg_fantasy_points_l3: f64,
    pub avg_targets_l3: f64,
    pub avg_carries_l3: f64,
    pub avg_passing_attempts_l3: f64,
    pub avg_fantasy_points_season: f64,
    pub games_played_season: usize,
    pub target_share_l3: f64,
    pub consistency_score: f64,
    pub trend_score: f64,

    /// Position-specific matchup features keyed by feature name; the
    /// artifact schema fixes their order at prediction time.
    pub matchup: BTreeMap<String, f64>,
}

impl PlayerFeatures {
    /// Look up one feature by schema name.
    pub fn value(&self, name: &str) -> Option<f64> {
        match name {
            "avg_fantasy_points_l3" => Some(self.avg_fantasy_points_l3),
            "avg_targets_l3" => Some(self.avg_targets_l3),
            "avg_carries_l3" => Some(self.avg_carries_l3),
            "avg_passing_attempts_l3" => Some(self.avg_passing_attempts_l3),
            "avg_fantasy_points_season" => Some(self.avg_fantasy_points_season),
            "games_played_season" => Some(self.games_played_season as f64),
            "position_encoded" => Some(self.position.code()),
            "target_share_l3" => Some(self.target_share_l3),
            "consistency_score" => Some(self.consistency_score),
            "trend_score" => Some(self.trend_score),
            other => self.matchup.get(other).copied(),
        }
    }

    /// Assemble the vector in the exact order an artifact recorded.
    /// Missing matchup features fill with 0, matching training-time
    /// behavior for players without a scheduled opponent.
    pub fn vector(&self, names: &[String]) -> Vec<f64> {
        names
            .iter()
            .map(|name| self.value(name).unwrap_or(0.0))
            .collect()
    }
}

/// Rolling and matchup features for one (team DST, season, week, ruleset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstFeatures {
    pub team_id: TeamId,
    pub season: Season,
    pub week: Week,

    pub avg_points_allowed_l3: f64,
    pub avg_sacks_l3: f64,
    pub avg_turnovers_l3: f64,
    pub avg_fantasy_points_l3: f64,
    pub avg_points_allowed_season: f64,
    pub avg_sacks_season: f64,
    pub avg_turnovers_season: f64,
    pub avg_fantasy_points_season: f64,
    pub games_played_season: usize,
    pub opponent_avg_points_l3: f64,
    pub opponent_avg_points_season: f64,
    pub is_home: bool,
    pub consistency_score: f64,
    pub trend_score: f64,
    pub opponent_offensive_score: f64,
    pub matchup_points_modifier: f64,
    pub matchup_sack_modifier: f64,
}

impl DstFeatures {
    pub fn value(&self, name: &str) -> Option<f64> {
        match name {
            "avg_points_allowed_l3" => Some(self.avg_points_allowed_l3),
            "avg_sacks_l3" => Some(self.avg_sacks_l3),
            "avg_turnovers_l3" => Some(self.avg_turnovers_l3),
            "avg_fantasy_points_l3" => Some(self.avg_fantasy_points_l3),
            "avg_points_allowed_season" => Some(self.avg_points_allowed_season),
            "avg_sacks_season" => Some(self.avg_sacks_season),
            "avg_turnovers_season" => Some(self.avg_turnovers_season),
            "avg_fantasy_points_season" => Some(self.avg_fantasy_points_season),
            "games_played_season" => Some(self.games_played_season as f64),
            "opponent_avg_points_l3" => Some(self.opponent_avg_points_l3),
            "opponent_avg_points_season" => Some(self.opponent_avg_points_season),
            "is_home" => Some(if self.is_home { 1.0 } else { 0.0 }),
            "consistency_score" => Some(self.consistency_score),
            "trend_score" => Some(self.trend_score),
            "opponent_offensive_score" => Some(self.opponent_offensive_score),
            "matchup_points_modifier" => Some(self.matchup_points_modifier),
            "matchup_sack_modifier" => Some(self.matchup_sack_modifier),
            _ => None,
        }
    }

    pub fn vector(&self, names: &[String]) -> Vec<f64> {
        names
            .iter()
            .map(|name| self.value(name).unwrap_or(0.0))
            .collect()
    }
}

/// A box-score row with its fantasy points computed once.
#[derive(Debug, Clone)]
pub struct ScoredStatRow {
    pub stats: GameStatRow,
    pub fantasy_points: f64,
}

/// A defensive row with its fantasy points computed once.
#[derive(Debug, Clone)]
pub struct ScoredDefenseRow {
    pub stats: TeamDefenseRow,
    pub fantasy_points: f64,
}

#[derive(Default)]
struct FeatureCache {
    /// Per-player scored history, most recent first.
    players: HashMap<PlayerId, Vec<ScoredStatRow>>,
    /// Per-team scored defensive history, most recent first.
    defenses: HashMap<TeamId, Vec<ScoredDefenseRow>>,
    positions: HashMap<PlayerId, Position>,
}

/// Builds feature structs from historical rows, one ruleset per builder.
pub struct FeatureBuilder<'a> {
    db: &'a Database,
    rules: &'a ScoringRules,
    analyzer: MatchupAnalyzer<'a>,
    cache: FeatureCache,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(db: &'a Database, rules: &'a ScoringRules) -> Self {
        FeatureBuilder {
            db,
            rules,
            analyzer: MatchupAnalyzer::new(db),
            cache: FeatureCache::default(),
        }
    }

    pub fn analyzer(&self) -> &MatchupAnalyzer<'a> {
        &self.analyzer
    }

    /// Drop all cached history; required whenever the underlying store
    /// changes.
    pub fn clear_cache(&mut self) {
        self.cache = FeatureCache::default();
    }

    /// Bulk-load every listed player's history strictly before
    /// `(season, week)` and score each row once. Subsequent single-player
    /// builds at or before that bound are served from memory.
    pub fn prefetch_players(
        &mut self,
        player_ids: &[PlayerId],
        season: Season,
        week: Week,
    ) -> Result<()> {
        let grouped = self.db.player_history_bulk(player_ids, season, week)?;
        for (player_id, rows) in grouped {
            let scored = rows
                .into_iter()
                .map(|stats| ScoredStatRow {
                    fantasy_points: scoring::score_player(&stats, self.rules).total,
                    stats,
                })
                .collect();
            self.cache.players.insert(player_id, scored);
        }
        let positions = self.db.player_positions(player_ids)?;
        self.cache.positions.extend(positions);
        Ok(())
    }

    /// Bulk-load and score full histories for training over `seasons`.
    /// Rows are grouped per player/team, most recent first, so any target
    /// week within the scan can be sliced leak-free.
    pub fn prefetch_training(&mut self, seasons: &[Season]) -> Result<()> {
        let stat_rows = self.db.training_stat_rows(seasons)?;
        let defense_rows = self.db.training_defense_rows(seasons)?;
        self.cache_training_rows(&stat_rows, &defense_rows);
        Ok(())
    }

    /// Score and cache already-loaded training rows. Fantasy points are
    /// computed exactly once per row here; later feature builds only
    /// slice.
    pub fn cache_training_rows(
        &mut self,
        stat_rows: &[crate::storage::TrainingStatRow],
        defense_rows: &[TeamDefenseRow],
    ) {
        for row in stat_rows {
            self.cache
                .positions
                .insert(row.stats.player_id.clone(), row.position);
            let scored = ScoredStatRow {
                fantasy_points: scoring::score_player(&row.stats, self.rules).total,
                stats: row.stats.clone(),
            };
            self.cache
                .players
                .entry(scored.stats.player_id.clone())
                .or_default()
                .push(scored);
        }
        // Training scans come back oldest-first; the cache wants newest
        // first.
        for rows in self.cache.players.values_mut() {
            rows.sort_by(|a, b| {
                (b.stats.season, b.stats.week).cmp(&(a.stats.season, a.stats.week))
            });
        }

        for stats in defense_rows {
            let scored = ScoredDefenseRow {
                fantasy_points: scoring::score_dst(stats, self.rules).total,
                stats: stats.clone(),
            };
            self.cache
                .defenses
                .entry(scored.stats.team_id.clone())
                .or_default()
                .push(scored);
        }
        for rows in self.cache.defenses.values_mut() {
            rows.sort_by(|a, b| {
                (b.stats.season, b.stats.week).cmp(&(a.stats.season, a.stats.week))
            });
        }
    }

    /// Bulk-load defensive histories for the listed teams before
    /// `(season, week)`.
    pub fn prefetch_defenses(
        &mut self,
        team_ids: &[TeamId],
        season: Season,
        week: Week,
    ) -> Result<()> {
        for team_id in team_ids {
            let rows = self
                .db
                .defense_history(team_id, season, week, DST_HISTORY_LIMIT)?;
            let scored = rows
                .into_iter()
                .map(|stats| ScoredDefenseRow {
                    fantasy_points: scoring::score_dst(&stats, self.rules).total,
                    stats,
                })
                .collect();
            self.cache.defenses.insert(team_id.clone(), scored);
        }
        Ok(())
    }

    /// Build features for one player entering `(season, week)`.
    ///
    /// Returns `Ok(None)` with fewer than 3 prior games; the caller drops
    /// the player rather than treating it as an error. `with_matchup`
    /// controls whether position-specific opponent features are attached
    /// (only artifacts that declare support consume them).
    pub fn build_player_features(
        &mut self,
        player_id: &PlayerId,
        season: Season,
        week: Week,
        with_matchup: bool,
    ) -> Result<Option<PlayerFeatures>> {
        let history = self.player_rows(player_id, season, week)?;
        if history.len() < MIN_HISTORY_GAMES {
            return Ok(None);
        }

        let position = match self.cache.positions.get(player_id) {
            Some(position) => *position,
            None => match self.db.get_player(player_id)? {
                Some(player) => {
                    self.cache.positions.insert(player_id.clone(), player.position);
                    player.position
                }
                None => return Ok(None),
            },
        };

        let num = |v: Option<f64>| v.unwrap_or(0.0);
        let last3 = &history[..3];
        let avg_fantasy_points_l3 = mean(last3.iter().map(|r| r.fantasy_points));
        let avg_targets_l3 = mean(last3.iter().map(|r| num(r.stats.receiving_targets)));
        let avg_carries_l3 = mean(last3.iter().map(|r| num(r.stats.rush_attempts)));
        let avg_passing_attempts_l3 = mean(last3.iter().map(|r| num(r.stats.pass_attempts)));
        let target_share_l3 = mean(last3.iter().map(|r| num(r.stats.target_share)));

        let season_rows: Vec<&ScoredStatRow> = history
            .iter()
            .filter(|r| r.stats.season == season)
            .collect();
        let games_played_season = season_rows.len();
        let avg_fantasy_points_season = if season_rows.is_empty() {
            0.0
        } else {
            mean(season_rows.iter().map(|r| r.fantasy_points))
        };

        let last5: Vec<f64> = history
            .iter()
            .take(5)
            .map(|r| r.fantasy_points)
            .collect();
        let consistency_score = if last5.len() >= 3 { pop_std(&last5) } else { 0.0 };
        let trend_score = if last5.len() >= 4 { slope(&last5) } else { 0.0 };

        let team_id = history
            .iter()
            .find_map(|r| r.stats.team_id.clone());

        let mut matchup = BTreeMap::new();
        if with_matchup {
            if let Some(team) = &team_id {
                if let Some(opponent) = self.analyzer.opponent_for(team, season, week)? {
                    for (name, value) in self.analyzer.position_matchup_features(
                        position, team, &opponent, season, week,
                    )? {
                        matchup.insert(name, value);
                    }
                }
            }
        }

        Ok(Some(PlayerFeatures {
            player_id: player_id.clone(),
            season,
            week,
            position,
            team_id,
            avg_fantasy_points_l3,
            avg_targets_l3,
            avg_carries_l3,
            avg_passing_attempts_l3,
            avg_fantasy_points_season,
            games_played_season,
            target_share_l3,
            consistency_score,
            trend_score,
            matchup,
        }))
    }

    /// Build features for one team defense entering `(season, week)`.
    pub fn build_dst_features(
        &mut self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Option<DstFeatures>> {
        let history = self.defense_rows(team_id, season, week)?;
        if history.len() < MIN_HISTORY_GAMES {
            return Ok(None);
        }

        let num = |v: Option<f64>| v.unwrap_or(0.0);
        let last3 = &history[..3];
        let avg_points_allowed_l3 = mean(last3.iter().map(|r| num(r.stats.points_allowed)));
        let avg_sacks_l3 = mean(last3.iter().map(|r| num(r.stats.sacks)));
        let avg_turnovers_l3 = mean(
            last3
                .iter()
                .map(|r| num(r.stats.interceptions) + num(r.stats.fumbles_recovered)),
        );
        let avg_fantasy_points_l3 = mean(last3.iter().map(|r| r.fantasy_points));

        let season_rows: Vec<&ScoredDefenseRow> = history
            .iter()
            .filter(|r| r.stats.season == season)
            .collect();
        let games_played_season = season_rows.len();
        let (
            avg_points_allowed_season,
            avg_sacks_season,
            avg_turnovers_season,
            avg_fantasy_points_season,
        ) = if season_rows.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            (
                mean(season_rows.iter().map(|r| num(r.stats.points_allowed))),
                mean(season_rows.iter().map(|r| num(r.stats.sacks))),
                mean(
                    season_rows
                        .iter()
                        .map(|r| num(r.stats.interceptions) + num(r.stats.fumbles_recovered)),
                ),
                mean(season_rows.iter().map(|r| r.fantasy_points)),
            )
        };

        let last5: Vec<f64> = history
            .iter()
            .take(5)
            .map(|r| r.fantasy_points)
            .collect();
        let consistency_score = if last5.len() >= 3 { pop_std(&last5) } else { 0.0 };
        let trend_score = if last5.len() >= 4 { slope(&last5) } else { 0.0 };

        let is_home = self
            .db
            .week_matchups(season, week)?
            .into_iter()
            .find(|m| &m.team_id == team_id)
            .map(|m| m.is_home)
            .unwrap_or(true);

        let mut features = DstFeatures {
            team_id: team_id.clone(),
            season,
            week,
            avg_points_allowed_l3,
            avg_sacks_l3,
            avg_turnovers_l3,
            avg_fantasy_points_l3,
            avg_points_allowed_season,
            avg_sacks_season,
            avg_turnovers_season,
            avg_fantasy_points_season,
            games_played_season,
            opponent_avg_points_l3: LEAGUE_AVG_POINTS,
            opponent_avg_points_season: LEAGUE_AVG_POINTS,
            is_home,
            consistency_score,
            trend_score,
            opponent_offensive_score: 0.0,
            matchup_points_modifier: 1.0,
            matchup_sack_modifier: 1.0,
        };

        if let Some(matchup) = self.analyzer.matchup_for_dst(team_id, season, week)? {
            features.opponent_offensive_score = matchup.offense_strength.offensive_score;
            features.matchup_points_modifier = matchup.points_modifier;
            features.matchup_sack_modifier = matchup.sack_modifier;
        }

        Ok(Some(features))
    }

    /// Most recent prior fantasy-point totals for a player, newest first.
    /// Used for ceiling/floor bands around a projection.
    pub fn recent_player_points(
        &mut self,
        player_id: &PlayerId,
        season: Season,
        week: Week,
        count: usize,
    ) -> Result<Vec<f64>> {
        Ok(self
            .player_rows(player_id, season, week)?
            .iter()
            .take(count)
            .map(|r| r.fantasy_points)
            .collect())
    }

    /// Most recent prior fantasy-point totals for a defense, newest first.
    pub fn recent_dst_points(
        &mut self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        count: usize,
    ) -> Result<Vec<f64>> {
        Ok(self
            .defense_rows(team_id, season, week)?
            .iter()
            .take(count)
            .map(|r| r.fantasy_points)
            .collect())
    }

    /// Prior rows for a player, cache-first, capped at the history limit.
    fn player_rows(
        &mut self,
        player_id: &PlayerId,
        season: Season,
        week: Week,
    ) -> Result<Vec<ScoredStatRow>> {
        if let Some(cached) = self.cache.players.get(player_id) {
            let sliced: Vec<ScoredStatRow> = cached
                .iter()
                .filter(|r| (r.stats.season, r.stats.week) < (season, week))
                .take(PLAYER_HISTORY_LIMIT)
                .cloned()
                .collect();
            return Ok(sliced);
        }
        let rows = self
            .db
            .player_history(player_id, season, week, PLAYER_HISTORY_LIMIT)?;
        Ok(rows
            .into_iter()
            .map(|stats| ScoredStatRow {
                fantasy_points: scoring::score_player(&stats, self.rules).total,
                stats,
            })
            .collect())
    }

    /// Prior rows for a defense, cache-first, capped at the history limit.
    fn defense_rows(
        &mut self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Vec<ScoredDefenseRow>> {
        if let Some(cached) = self.cache.defenses.get(team_id) {
            let sliced: Vec<ScoredDefenseRow> = cached
                .iter()
                .filter(|r| (r.stats.season, r.stats.week) < (season, week))
                .take(DST_HISTORY_LIMIT)
                .cloned()
                .collect();
            return Ok(sliced);
        }
        let rows = self
            .db
            .defense_history(team_id, season, week, DST_HISTORY_LIMIT)?;
        Ok(rows
            .into_iter()
            .map(|stats| ScoredDefenseRow {
                fantasy_points: scoring::score_dst(&stats, self.rules).total,
                stats,
            })
            .collect())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

/// Population standard deviation.
fn pop_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Least-squares slope of `values` over x = 0..n. Values arrive most
/// recent first, so a negative slope means the player is trending up.
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }
    if var == 0.0 {
        0.0
    } else {
        cov / var
    }
}
