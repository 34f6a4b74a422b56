//! Fantasy point calculation for players and team defenses.
//!
//! Scoring is a pure function of a box-score row and a ruleset: no state,
//! no I/O. Rulesets are loaded once at startup into a [`ScoringTable`] and
//! treated as immutable afterwards.

pub mod rules;

#[cfg(test)]
mod tests;

pub use rules::{slugify, ScoringRules, ScoringTable};

use crate::storage::{GameStatRow, TeamDefenseRow};
use serde::{Deserialize, Serialize};

/// A player's scored game with the component breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FantasyPoints {
    pub passing: f64,
    pub rushing: f64,
    pub receiving: f64,
    pub bonus: f64,
    pub penalty: f64,
    pub total: f64,
}

/// A team defense's scored game with the component breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DstFantasyPoints {
    pub points_allowed: f64,
    pub turnovers: f64,
    pub sacks: f64,
    pub touchdowns: f64,
    pub safety: f64,
    pub bonus: f64,
    pub total: f64,
}

fn num(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

/// Score one player's box-score line under a ruleset.
pub fn score_player(stats: &GameStatRow, rules: &ScoringRules) -> FantasyPoints {
    let mut points = FantasyPoints::default();

    points.passing += num(stats.pass_yards) * rules.pass_yard_points;
    points.passing += num(stats.pass_touchdowns) * rules.pass_td_points;

    points.rushing += num(stats.rush_yards) * rules.rush_yard_points;
    points.rushing += num(stats.rush_touchdowns) * rules.rush_td_points;

    points.receiving += num(stats.receptions) * rules.reception_points;
    points.receiving += num(stats.receiving_yards) * rules.receiving_yard_points;
    points.receiving += num(stats.receiving_touchdowns) * rules.receiving_td_points;

    points.penalty += num(stats.pass_interceptions) * rules.pass_int_points;
    let fumbles_lost = num(stats.rush_fumbles) + num(stats.receiving_fumbles);
    points.penalty += fumbles_lost * rules.fumble_points;

    if rules.has_yardage_bonuses() {
        if num(stats.rush_yards) >= 100.0 {
            points.bonus += 3.0;
        }
        if num(stats.receiving_yards) >= 100.0 {
            points.bonus += 3.0;
        }
        if num(stats.pass_yards) >= 300.0 {
            points.bonus += 3.0;
        }
    }

    points.total =
        points.passing + points.rushing + points.receiving + points.bonus + points.penalty;
    points
}

/// Score one team defense's game under a ruleset.
pub fn score_dst(defense: &TeamDefenseRow, rules: &ScoringRules) -> DstFantasyPoints {
    let mut points = DstFantasyPoints::default();

    let allowed = num(defense.points_allowed);
    points.points_allowed = rules.dst_tiers.for_points_allowed(allowed);

    points.turnovers += num(defense.interceptions) * rules.dst_interception_points;
    points.turnovers += num(defense.fumbles_recovered) * rules.dst_fumble_recovery_points;
    points.sacks += num(defense.sacks) * rules.dst_sack_points;

    let total_tds = num(defense.defensive_touchdowns)
        + num(defense.pick_six)
        + num(defense.fumble_touchdowns)
        + num(defense.return_touchdowns);
    points.touchdowns += total_tds * rules.dst_touchdown_points;

    points.safety += num(defense.safeties) * rules.dst_safety_points;

    let yards_allowed = num(defense.yards_allowed);
    if yards_allowed < 100.0 {
        points.bonus += rules.dst_under100_bonus;
    } else if yards_allowed < 300.0 {
        points.bonus += rules.dst_under300_bonus;
    }

    points.total = points.points_allowed
        + points.turnovers
        + points.sacks
        + points.touchdowns
        + points.safety
        + points.bonus;
    points
}
