//! Position-specific defensive profiles and matchup feature derivation.

use crate::cli::types::{Position, Season, TeamId, Week};
use crate::error::Result;
use crate::storage::Database;
use serde::{Deserialize, Serialize};

/// League-median rank used when a defense cannot be ranked yet.
const NEUTRAL_RANK: u32 = 16;

/// How a defense has fared against each skill position recently.
/// Ranks run 1 (best defense) to 32 (worst).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDefensiveProfile {
    pub team_id: TeamId,
    pub season: Season,
    pub week: Week,
    pub games_analyzed: usize,

    // Pass defense (vs QB/WR/TE)
    pub pass_yards_allowed_per_game: f64,
    pub pass_tds_allowed_per_game: f64,
    /// Sacks per opponent pass attempt.
    pub sack_rate: f64,
    /// Interceptions per opponent pass attempt.
    pub int_rate: f64,

    // Rush defense (vs RB)
    pub rush_yards_allowed_per_game: f64,
    pub rush_tds_allowed_per_game: f64,
    pub yards_per_carry_allowed: f64,

    // Per-position receiving yards allowed
    pub rb_receiving_yards_allowed: f64,
    pub wr_yards_allowed_per_game: f64,
    pub te_yards_allowed_per_game: f64,

    pub pass_defense_rank: u32,
    pub rush_defense_rank: u32,
    pub sack_pressure_rank: u32,
    pub turnover_creation_rank: u32,
}

impl PositionDefensiveProfile {
    fn empty(team_id: &TeamId, season: Season, week: Week) -> Self {
        PositionDefensiveProfile {
            team_id: team_id.clone(),
            season,
            week,
            games_analyzed: 0,
            pass_yards_allowed_per_game: 0.0,
            pass_tds_allowed_per_game: 0.0,
            sack_rate: 0.0,
            int_rate: 0.0,
            rush_yards_allowed_per_game: 0.0,
            rush_tds_allowed_per_game: 0.0,
            yards_per_carry_allowed: 4.0,
            rb_receiving_yards_allowed: 0.0,
            wr_yards_allowed_per_game: 0.0,
            te_yards_allowed_per_game: 0.0,
            pass_defense_rank: NEUTRAL_RANK,
            rush_defense_rank: NEUTRAL_RANK,
            sack_pressure_rank: NEUTRAL_RANK,
            turnover_creation_rank: NEUTRAL_RANK,
        }
    }
}

/// Build a profile from the defense's recent window and its opponents'
/// per-position production. Missing windows yield the zeroed profile.
pub(crate) fn build_profile(
    db: &Database,
    team_id: &TeamId,
    season: Season,
    week: Week,
    lookback: u16,
) -> Result<PositionDefensiveProfile> {
    let mut profile = PositionDefensiveProfile::empty(team_id, season, week);

    let defense = db.defense_window(team_id, season, week, lookback)?;
    let splits = db.opponent_position_splits(team_id, season, week, lookback)?;
    if defense.is_empty() || splits.is_empty() {
        return Ok(profile);
    }

    let games = defense.len();
    let n = splits.len() as f64;
    profile.games_analyzed = games;
    profile.pass_yards_allowed_per_game =
        splits.iter().map(|s| s.qb_pass_yards).sum::<f64>() / n;
    profile.rush_yards_allowed_per_game =
        splits.iter().map(|s| s.rb_rush_yards).sum::<f64>() / n;

    let total_pass_attempts: f64 = splits.iter().map(|s| s.qb_pass_attempts).sum();
    if total_pass_attempts > 0.0 {
        profile.pass_tds_allowed_per_game =
            splits.iter().map(|s| s.qb_pass_tds).sum::<f64>() / n;
        let sacks: f64 = defense.iter().filter_map(|d| d.sacks).sum();
        let ints: f64 = defense.iter().filter_map(|d| d.interceptions).sum();
        profile.sack_rate = sacks / total_pass_attempts;
        profile.int_rate = ints / total_pass_attempts;
    }

    let total_rush_attempts: f64 = splits.iter().map(|s| s.rb_rush_attempts).sum();
    if total_rush_attempts > 0.0 {
        profile.rush_tds_allowed_per_game =
            splits.iter().map(|s| s.rb_rush_tds).sum::<f64>() / n;
        profile.yards_per_carry_allowed =
            profile.rush_yards_allowed_per_game / (total_rush_attempts / games as f64);
    }

    profile.rb_receiving_yards_allowed =
        splits.iter().map(|s| s.rb_rec_yards).sum::<f64>() / n;
    profile.wr_yards_allowed_per_game =
        splits.iter().map(|s| s.wr_rec_yards).sum::<f64>() / n;
    profile.te_yards_allowed_per_game =
        splits.iter().map(|s| s.te_rec_yards).sum::<f64>() / n;

    assign_rankings(db, &mut profile, season, week)?;
    Ok(profile)
}

/// Rank this defense against the league over the same window: points
/// allowed ascending (best = 1), sacks and turnovers descending. Rush
/// rank approximates to the points rank until a dedicated rush ranking
/// exists.
fn assign_rankings(
    db: &Database,
    profile: &mut PositionDefensiveProfile,
    season: Season,
    week: Week,
) -> Result<()> {
    let league = db.league_defense_averages(season, week)?;
    if league.is_empty() {
        return Ok(());
    }

    let team_row = league.iter().find(|t| t.team_id == profile.team_id);
    let Some(team_row) = team_row else {
        return Ok(());
    };

    profile.pass_defense_rank =
        rank_min(league.iter().map(|t| t.avg_points_allowed), team_row.avg_points_allowed, true);
    profile.sack_pressure_rank =
        rank_min(league.iter().map(|t| t.avg_sacks), team_row.avg_sacks, false);
    profile.turnover_creation_rank =
        rank_min(league.iter().map(|t| t.avg_turnovers), team_row.avg_turnovers, false);
    profile.rush_defense_rank = profile.pass_defense_rank;
    Ok(())
}

/// Minimum-style rank of `value` within `values`: 1 + the count of
/// strictly better entries. `ascending` means lower is better.
fn rank_min(values: impl Iterator<Item = f64>, value: f64, ascending: bool) -> u32 {
    let better = values
        .filter(|&v| if ascending { v < value } else { v > value })
        .count();
    better as u32 + 1
}

/// Canonical feature order per position; this is the order recorded in
/// artifact schemas.
pub fn position_feature_names(position: Position) -> &'static [&'static str] {
    match position {
        Position::QB => &[
            "opponent_pass_defense_rank",
            "opponent_pass_rush_pressure",
            "opponent_turnover_creation",
            "qb_efficiency_modifier",
            "qb_ceiling_modifier",
        ],
        Position::RB => &[
            "opponent_rush_defense_rank",
            "opponent_rb_receiving_weakness",
            "rb_volume_modifier",
            "rb_efficiency_modifier",
            "rb_goal_line_advantage",
        ],
        Position::WR => &[
            "opponent_pass_defense_rank",
            "opponent_wr_coverage_weakness",
            "wr_pressure_impact",
            "wr_efficiency_modifier",
            "wr_ceiling_modifier",
        ],
        Position::TE => &[
            "opponent_te_coverage_weakness",
            "opponent_pass_defense_rank",
            "te_checkdown_opportunity",
            "te_efficiency_modifier",
            "te_red_zone_advantage",
        ],
        _ => &[],
    }
}

/// Ordered matchup features for one position against a defense profile.
/// Modifiers come from top-8 / bottom-8 rank thresholds and are clamped
/// per position.
pub(crate) fn matchup_features(
    position: Position,
    defense: &PositionDefensiveProfile,
) -> Vec<(String, f64)> {
    let pass_rank = defense.pass_defense_rank as f64;
    let rush_rank = defense.rush_defense_rank as f64;
    let sack_rank = defense.sack_pressure_rank as f64;
    let turnover_rank = defense.turnover_creation_rank as f64;

    let named = |pairs: Vec<f64>| -> Vec<(String, f64)> {
        position_feature_names(position)
            .iter()
            .zip(pairs)
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    };

    match position {
        Position::QB => {
            let mut efficiency: f64 = 1.0;
            if pass_rank > 24.0 {
                efficiency += 0.15;
            } else if pass_rank < 9.0 {
                efficiency -= 0.15;
            }
            if sack_rank < 9.0 {
                efficiency -= 0.10;
            } else if sack_rank > 24.0 {
                efficiency += 0.10;
            }
            let efficiency = efficiency.clamp(0.7, 1.4);
            let ceiling = if pass_rank > 20.0 {
                1.15
            } else if pass_rank < 12.0 {
                0.90
            } else {
                1.0
            };
            named(vec![
                pass_rank,
                16.0 - sack_rank,
                16.0 - turnover_rank,
                efficiency,
                ceiling,
            ])
        }
        Position::RB => {
            let receiving_weakness = ((defense.rb_receiving_yards_allowed - 20.0) / 5.0).max(0.0);
            let mut efficiency: f64 = 1.0;
            if rush_rank > 24.0 {
                efficiency += 0.20;
            } else if rush_rank < 9.0 {
                efficiency -= 0.20;
            }
            if defense.rb_receiving_yards_allowed > 30.0 {
                efficiency += 0.05;
            }
            let efficiency = efficiency.clamp(0.6, 1.5);
            let volume = if rush_rank > 20.0 {
                1.10
            } else if rush_rank < 12.0 {
                0.95
            } else {
                1.0
            };
            named(vec![rush_rank, receiving_weakness, volume, efficiency, 0.0])
        }
        Position::WR => {
            let coverage_weakness = ((defense.wr_yards_allowed_per_game - 200.0) / 20.0).max(0.0);
            let mut efficiency: f64 = 1.0;
            if pass_rank > 20.0 {
                efficiency += 0.18;
            } else if pass_rank < 12.0 {
                efficiency -= 0.18;
            }
            if sack_rank < 12.0 {
                efficiency -= 0.08;
            }
            let efficiency = efficiency.clamp(0.7, 1.4);
            let ceiling = if pass_rank > 24.0 { 1.25 } else { 1.0 };
            named(vec![
                pass_rank,
                coverage_weakness,
                sack_rank - 16.0,
                efficiency,
                ceiling,
            ])
        }
        Position::TE => {
            let coverage_weakness = ((defense.te_yards_allowed_per_game - 40.0) / 5.0).max(0.0);
            let mut efficiency: f64 = 1.0;
            if defense.te_yards_allowed_per_game > 60.0 {
                efficiency += 0.20;
            } else if defense.te_yards_allowed_per_game < 30.0 {
                efficiency -= 0.15;
            }
            if sack_rank < 12.0 {
                efficiency += 0.08;
            }
            let efficiency = efficiency.clamp(0.7, 1.3);
            named(vec![
                coverage_weakness,
                33.0 - pass_rank,
                16.0 - sack_rank,
                efficiency,
                0.0,
            ])
        }
        _ => Vec::new(),
    }
}
