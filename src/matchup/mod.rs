//! Team strength and matchup analysis.
//!
//! Produces offensive/defensive strength composites over a recent-game
//! window and turns pairs of them into bounded matchup modifiers. Missing
//! data collapses to zero-initialized values; callers check
//! `games_analyzed` to tell "weak" from "unknown".

pub mod profile;

#[cfg(test)]
mod tests;

pub use profile::{position_feature_names, PositionDefensiveProfile};

use crate::cli::types::{Position, Season, TeamId, Week};
use crate::error::Result;
use crate::storage::Database;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::num::NonZeroUsize;

/// Games of history to aggregate when sizing up a team.
pub const DEFAULT_LOOKBACK: u16 = 8;

/// Strength composites land on a 0-100 scale; 70 marks a "strong" unit.
const STRONG_THRESHOLD: f64 = 70.0;

const PROFILE_CACHE_SIZE: usize = 64;

/// Offensive strength metrics for a team entering a given week.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffensiveStrength {
    pub team_id: TeamId,
    pub season: Season,
    pub week: Week,
    pub games_analyzed: usize,
    pub points_per_game: f64,
    pub yards_per_game: f64,
    pub passing_yards_per_game: f64,
    pub rushing_yards_per_game: f64,
    pub passing_tds_per_game: f64,
    pub rushing_tds_per_game: f64,
    pub turnovers_per_game: f64,
    pub sacks_allowed_per_game: f64,
    /// Composite 0-100 score.
    pub offensive_score: f64,
}

/// Defensive strength metrics for a team entering a given week.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefensiveStrength {
    pub team_id: TeamId,
    pub season: Season,
    pub week: Week,
    pub games_analyzed: usize,
    pub points_allowed_per_game: f64,
    pub yards_allowed_per_game: f64,
    pub passing_yards_allowed_per_game: f64,
    pub rushing_yards_allowed_per_game: f64,
    pub sacks_per_game: f64,
    pub interceptions_per_game: f64,
    pub fumbles_recovered_per_game: f64,
    pub turnovers_forced_per_game: f64,
    /// Composite 0-100 score.
    pub defensive_score: f64,
}

/// How one team's offense lines up against another's defense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupStrength {
    pub offensive_team: TeamId,
    pub defensive_team: TeamId,
    pub season: Season,
    pub week: Week,
    pub offense_strength: OffensiveStrength,
    pub defense_strength: DefensiveStrength,
    pub matchup_type: String,
    pub offensive_advantage: f64,
    pub defensive_advantage: f64,
    pub points_modifier: f64,
    pub turnover_modifier: f64,
    pub sack_modifier: f64,
}

fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

type StrengthKey = (TeamId, Season, Week);

/// Analyzer over the stat store. Strength and profile lookups are
/// memoized per (team, season, week) for the life of the analyzer, which
/// is scoped to one request.
pub struct MatchupAnalyzer<'a> {
    db: &'a Database,
    offense_cache: RefCell<LruCache<StrengthKey, OffensiveStrength>>,
    defense_cache: RefCell<LruCache<StrengthKey, DefensiveStrength>>,
    profile_cache: RefCell<LruCache<StrengthKey, PositionDefensiveProfile>>,
}

impl<'a> MatchupAnalyzer<'a> {
    pub fn new(db: &'a Database) -> Self {
        let cap = NonZeroUsize::new(PROFILE_CACHE_SIZE).unwrap();
        MatchupAnalyzer {
            db,
            offense_cache: RefCell::new(LruCache::new(cap)),
            defense_cache: RefCell::new(LruCache::new(cap)),
            profile_cache: RefCell::new(LruCache::new(cap)),
        }
    }

    /// Offensive strength over the prior `DEFAULT_LOOKBACK` games.
    pub fn offensive_strength(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<OffensiveStrength> {
        let key = (team_id.clone(), season, week);
        if let Some(hit) = self.offense_cache.borrow_mut().get(&key) {
            return Ok(hit.clone());
        }
        let strength = self.compute_offense(team_id, season, week, DEFAULT_LOOKBACK)?;
        self.offense_cache.borrow_mut().put(key, strength.clone());
        Ok(strength)
    }

    /// Defensive strength over the prior `DEFAULT_LOOKBACK` games.
    pub fn defensive_strength(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<DefensiveStrength> {
        let key = (team_id.clone(), season, week);
        if let Some(hit) = self.defense_cache.borrow_mut().get(&key) {
            return Ok(hit.clone());
        }
        let strength = self.compute_defense(team_id, season, week, DEFAULT_LOOKBACK)?;
        self.defense_cache.borrow_mut().put(key, strength.clone());
        Ok(strength)
    }

    fn compute_offense(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        lookback: u16,
    ) -> Result<OffensiveStrength> {
        let games = self
            .db
            .offense_game_aggregates(team_id, season, week, lookback)?;
        let mut offense = OffensiveStrength {
            team_id: team_id.clone(),
            season,
            week,
            ..Default::default()
        };
        if games.is_empty() {
            return Ok(offense);
        }

        let n = games.len() as f64;
        offense.games_analyzed = games.len();
        offense.points_per_game = games.iter().map(|g| g.team_points).sum::<f64>() / n;
        offense.passing_yards_per_game = games.iter().map(|g| g.pass_yards).sum::<f64>() / n;
        offense.rushing_yards_per_game = games.iter().map(|g| g.rush_yards).sum::<f64>() / n;
        offense.yards_per_game = offense.passing_yards_per_game + offense.rushing_yards_per_game;
        offense.passing_tds_per_game = games.iter().map(|g| g.pass_tds).sum::<f64>() / n;
        offense.rushing_tds_per_game =
            games.iter().map(|g| g.rush_tds + g.rec_tds).sum::<f64>() / n;
        offense.turnovers_per_game = games.iter().map(|g| g.turnovers).sum::<f64>() / n;
        offense.sacks_allowed_per_game = games.iter().map(|g| g.sacks_allowed).sum::<f64>() / n;

        // 0-100 composite against league baselines (~30 ppg and ~400 ypg
        // cap out the scale).
        let points_score = clamp(offense.points_per_game / 30.0 * 100.0, 0.0, 100.0);
        let yards_score = clamp(offense.yards_per_game / 400.0 * 100.0, 0.0, 100.0);
        let td_score = clamp(
            (offense.passing_tds_per_game + offense.rushing_tds_per_game) / 3.0 * 100.0,
            0.0,
            100.0,
        );
        let turnover_score = (100.0 - offense.turnovers_per_game * 25.0).max(0.0);
        offense.offensive_score =
            points_score * 0.4 + yards_score * 0.3 + td_score * 0.2 + turnover_score * 0.1;
        Ok(offense)
    }

    fn compute_defense(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        lookback: u16,
    ) -> Result<DefensiveStrength> {
        let games = self.db.defense_window(team_id, season, week, lookback)?;
        let mut defense = DefensiveStrength {
            team_id: team_id.clone(),
            season,
            week,
            ..Default::default()
        };
        if games.is_empty() {
            return Ok(defense);
        }

        let n = games.len() as f64;
        let num = |v: Option<f64>| v.unwrap_or(0.0);
        defense.games_analyzed = games.len();
        defense.points_allowed_per_game =
            games.iter().map(|g| num(g.points_allowed)).sum::<f64>() / n;
        defense.yards_allowed_per_game =
            games.iter().map(|g| num(g.yards_allowed)).sum::<f64>() / n;
        defense.passing_yards_allowed_per_game = games
            .iter()
            .map(|g| num(g.passing_yards_allowed))
            .sum::<f64>()
            / n;
        defense.rushing_yards_allowed_per_game = games
            .iter()
            .map(|g| num(g.rushing_yards_allowed))
            .sum::<f64>()
            / n;
        defense.sacks_per_game = games.iter().map(|g| num(g.sacks)).sum::<f64>() / n;
        defense.interceptions_per_game =
            games.iter().map(|g| num(g.interceptions)).sum::<f64>() / n;
        defense.fumbles_recovered_per_game =
            games.iter().map(|g| num(g.fumbles_recovered)).sum::<f64>() / n;
        defense.turnovers_forced_per_game =
            defense.interceptions_per_game + defense.fumbles_recovered_per_game;

        let points_score = clamp(
            100.0 - (defense.points_allowed_per_game - 14.0) * 3.0,
            0.0,
            100.0,
        );
        let yards_score = clamp(
            100.0 - (defense.yards_allowed_per_game - 250.0) * 0.2,
            0.0,
            100.0,
        );
        let turnover_score = (defense.turnovers_forced_per_game * 40.0).min(100.0);
        let sack_score = (defense.sacks_per_game * 25.0).min(100.0);
        defense.defensive_score =
            points_score * 0.4 + yards_score * 0.3 + turnover_score * 0.2 + sack_score * 0.1;
        Ok(defense)
    }

    /// Full matchup between an offense and a defense entering a week.
    pub fn analyze_matchup(
        &self,
        offensive_team: &TeamId,
        defensive_team: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<MatchupStrength> {
        let offense = self.offensive_strength(offensive_team, season, week)?;
        let defense = self.defensive_strength(defensive_team, season, week)?;

        let offense_strong = offense.offensive_score >= STRONG_THRESHOLD;
        let defense_strong = defense.defensive_score >= STRONG_THRESHOLD;
        let matchup_type = match (offense_strong, defense_strong) {
            (true, true) => "Strong vs Strong",
            (true, false) => "Strong vs Weak",
            (false, true) => "Weak vs Strong",
            (false, false) => "Weak vs Weak",
        };

        let offensive_advantage = offense.offensive_score - defense.defensive_score;
        let defensive_advantage = defense.defensive_score - offense.offensive_score;

        let points_modifier = clamp(1.0 + offensive_advantage / 200.0, 0.5, 1.5);
        let turnover_modifier = clamp(1.0 + defensive_advantage / 200.0, 0.5, 1.5);
        let sack_modifier = clamp(
            1.0 + (defense.sacks_per_game - offense.sacks_allowed_per_game) / 5.0,
            0.5,
            1.5,
        );

        Ok(MatchupStrength {
            offensive_team: offensive_team.clone(),
            defensive_team: defensive_team.clone(),
            season,
            week,
            offense_strength: offense,
            defense_strength: defense,
            matchup_type: matchup_type.to_string(),
            offensive_advantage,
            defensive_advantage,
            points_modifier,
            turnover_modifier,
            sack_modifier,
        })
    }

    /// The scheduled opponent, if the team plays that week.
    pub fn opponent_for(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Option<TeamId>> {
        self.db.opponent_for(team_id, season, week)
    }

    /// Matchup from a skill player's perspective: their offense against the
    /// opposing defense.
    pub fn matchup_for_player(
        &self,
        player_team: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Option<MatchupStrength>> {
        match self.opponent_for(player_team, season, week)? {
            Some(opponent) => Ok(Some(self.analyze_matchup(
                player_team,
                &opponent,
                season,
                week,
            )?)),
            None => Ok(None),
        }
    }

    /// Matchup from a DST's perspective: the opposing offense against this
    /// defense.
    pub fn matchup_for_dst(
        &self,
        dst_team: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Option<MatchupStrength>> {
        match self.opponent_for(dst_team, season, week)? {
            Some(opponent) => Ok(Some(self.analyze_matchup(
                &opponent, dst_team, season, week,
            )?)),
            None => Ok(None),
        }
    }

    /// Position-specific defensive profile, memoized per (team, season,
    /// week).
    pub fn position_profile(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<PositionDefensiveProfile> {
        let key = (team_id.clone(), season, week);
        if let Some(hit) = self.profile_cache.borrow_mut().get(&key) {
            return Ok(hit.clone());
        }
        let profile =
            profile::build_profile(self.db, team_id, season, week, DEFAULT_LOOKBACK)?;
        self.profile_cache.borrow_mut().put(key, profile.clone());
        Ok(profile)
    }

    /// Ordered position-specific matchup features for model input.
    pub fn position_matchup_features(
        &self,
        position: Position,
        _offensive_team: &TeamId,
        defensive_team: &TeamId,
        season: Season,
        week: Week,
    ) -> Result<Vec<(String, f64)>> {
        let profile = self.position_profile(defensive_team, season, week)?;
        Ok(profile::matchup_features(position, &profile))
    }
}
