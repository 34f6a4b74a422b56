//! Scoring rulesets: coefficients, DST tiers, and the startup-loaded table.

use crate::error::{GamedayError, Result};
use crate::storage::Database;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The seven points-allowed tiers for team defenses. Boundary values fall
/// into the lower-indexed tier (6 scores as "1-6", 7 as "7-13").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DstTiers {
    pub shutout: f64,
    pub allowed_1_6: f64,
    pub allowed_7_13: f64,
    pub allowed_14_20: f64,
    pub allowed_21_27: f64,
    pub allowed_28_34: f64,
    pub allowed_35_plus: f64,
}

impl DstTiers {
    pub fn for_points_allowed(&self, allowed: f64) -> f64 {
        if allowed <= 0.0 {
            self.shutout
        } else if allowed <= 6.0 {
            self.allowed_1_6
        } else if allowed <= 13.0 {
            self.allowed_7_13
        } else if allowed <= 20.0 {
            self.allowed_14_20
        } else if allowed <= 27.0 {
            self.allowed_21_27
        } else if allowed <= 34.0 {
            self.allowed_28_34
        } else {
            self.allowed_35_plus
        }
    }
}

/// A named scoring ruleset: per-unit coefficients for players plus DST
/// tier values and optional yardage bonuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub name: String,
    pub pass_yard_points: f64,
    pub pass_td_points: f64,
    pub pass_int_points: f64,
    pub rush_yard_points: f64,
    pub rush_td_points: f64,
    pub reception_points: f64,
    pub receiving_yard_points: f64,
    pub receiving_td_points: f64,
    pub fumble_points: f64,
    pub dst_sack_points: f64,
    pub dst_interception_points: f64,
    pub dst_fumble_recovery_points: f64,
    pub dst_touchdown_points: f64,
    pub dst_safety_points: f64,
    pub dst_tiers: DstTiers,
    pub dst_under300_bonus: f64,
    pub dst_under100_bonus: f64,
}

impl ScoringRules {
    /// Filesystem-safe identifier: lowercased name with spaces stripped.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// The DFS rulesets award flat bonuses at 100 rush / 100 receiving /
    /// 300 passing yards.
    pub fn has_yardage_bonuses(&self) -> bool {
        matches!(self.name.as_str(), "FanDuel" | "DraftKings")
    }
}

pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "")
}

/// Pick a value from a loaded column map, accepting the current column
/// name or its legacy DST spelling.
fn either(values: &HashMap<String, f64>, new_key: &str, old_key: &str, default: f64) -> f64 {
    values
        .get(new_key)
        .or_else(|| values.get(old_key))
        .copied()
        .unwrap_or(default)
}

fn plain(values: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    values.get(key).copied().unwrap_or(default)
}

impl ScoringRules {
    /// Build rules from a raw `scoring_systems` column map. Handles both
    /// current (`sack_points`, `dst_shutout_points`, ...) and legacy
    /// (`dst_sack_points`, `dst_points_allowed_0_points`, ...) spellings.
    pub fn from_columns(name: &str, values: &HashMap<String, f64>) -> Self {
        ScoringRules {
            name: name.to_string(),
            pass_yard_points: plain(values, "pass_yard_points", 0.04),
            pass_td_points: plain(values, "pass_td_points", 4.0),
            pass_int_points: plain(values, "pass_int_points", -1.0),
            rush_yard_points: plain(values, "rush_yard_points", 0.1),
            rush_td_points: plain(values, "rush_td_points", 6.0),
            reception_points: plain(values, "reception_points", 0.0),
            receiving_yard_points: plain(values, "receiving_yard_points", 0.1),
            receiving_td_points: plain(values, "receiving_td_points", 6.0),
            fumble_points: plain(values, "fumble_points", -2.0),
            dst_sack_points: either(values, "sack_points", "dst_sack_points", 1.0),
            dst_interception_points: either(values, "int_points", "dst_interception_points", 2.0),
            dst_fumble_recovery_points: either(
                values,
                "fumble_recovery_points",
                "dst_fumble_recovery_points",
                2.0,
            ),
            dst_touchdown_points: either(values, "defensive_td_points", "dst_touchdown_points", 6.0),
            dst_safety_points: either(values, "safety_points", "dst_safety_points", 2.0),
            dst_tiers: DstTiers {
                shutout: either(values, "dst_shutout_points", "dst_points_allowed_0_points", 10.0),
                allowed_1_6: either(
                    values,
                    "dst_1to6_points",
                    "dst_points_allowed_1_6_points",
                    7.0,
                ),
                allowed_7_13: either(
                    values,
                    "dst_7to13_points",
                    "dst_points_allowed_7_13_points",
                    4.0,
                ),
                allowed_14_20: either(
                    values,
                    "dst_14to20_points",
                    "dst_points_allowed_14_20_points",
                    1.0,
                ),
                allowed_21_27: either(
                    values,
                    "dst_21to27_points",
                    "dst_points_allowed_21_27_points",
                    0.0,
                ),
                allowed_28_34: either(
                    values,
                    "dst_28to34_points",
                    "dst_points_allowed_28_34_points",
                    -1.0,
                ),
                allowed_35_plus: either(
                    values,
                    "dst_35plus_points",
                    "dst_points_allowed_35_points",
                    -4.0,
                ),
            },
            dst_under300_bonus: plain(values, "dst_under300_bonus", 0.0),
            dst_under100_bonus: plain(values, "dst_under100_bonus", 0.0),
        }
    }
}

/// All rulesets known to the engine, keyed by system name. Loaded once
/// and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ScoringTable {
    rules: HashMap<String, ScoringRules>,
}

impl ScoringTable {
    /// Load every row of `scoring_systems`; fall back to the builtin
    /// defaults when the table is empty so an unseeded store still scores.
    pub fn load(db: &Database) -> Result<Self> {
        let rows = db.scoring_system_rows()?;
        if rows.is_empty() {
            info!("scoring_systems table empty, using builtin rulesets");
            return Ok(Self::builtin());
        }
        let mut rules = HashMap::new();
        for (name, values) in rows {
            rules.insert(name.clone(), ScoringRules::from_columns(&name, &values));
        }
        info!("loaded {} scoring rulesets", rules.len());
        Ok(ScoringTable { rules })
    }

    /// Builtin rulesets matching the seeded defaults: Standard, PPR,
    /// Half PPR, FanDuel, DraftKings.
    pub fn builtin() -> Self {
        let mut rules = HashMap::new();
        for ruleset in builtin_rulesets() {
            rules.insert(ruleset.name.clone(), ruleset);
        }
        ScoringTable { rules }
    }

    pub fn get(&self, name: &str) -> Result<&ScoringRules> {
        self.rules.get(name).ok_or_else(|| GamedayError::UnknownRuleset {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn builtin_rulesets() -> Vec<ScoringRules> {
    let standard_tiers = DstTiers {
        shutout: 10.0,
        allowed_1_6: 7.0,
        allowed_7_13: 4.0,
        allowed_14_20: 1.0,
        allowed_21_27: 0.0,
        allowed_28_34: -1.0,
        allowed_35_plus: -4.0,
    };
    let base = ScoringRules {
        name: "Standard".to_string(),
        pass_yard_points: 0.04,
        pass_td_points: 4.0,
        pass_int_points: -2.0,
        rush_yard_points: 0.1,
        rush_td_points: 6.0,
        reception_points: 0.0,
        receiving_yard_points: 0.1,
        receiving_td_points: 6.0,
        fumble_points: -2.0,
        dst_sack_points: 1.0,
        dst_interception_points: 2.0,
        dst_fumble_recovery_points: 2.0,
        dst_touchdown_points: 6.0,
        dst_safety_points: 2.0,
        dst_tiers: standard_tiers,
        dst_under300_bonus: 0.0,
        dst_under100_bonus: 0.0,
    };

    let ppr = ScoringRules {
        name: "PPR".to_string(),
        reception_points: 1.0,
        ..base.clone()
    };
    let half_ppr = ScoringRules {
        name: "Half PPR".to_string(),
        reception_points: 0.5,
        ..base.clone()
    };
    let fanduel = ScoringRules {
        name: "FanDuel".to_string(),
        pass_int_points: -1.0,
        reception_points: 0.5,
        ..base.clone()
    };
    let draftkings = ScoringRules {
        name: "DraftKings".to_string(),
        pass_int_points: -1.0,
        reception_points: 1.0,
        fumble_points: -1.0,
        ..base.clone()
    };

    vec![base, ppr, half_ppr, fanduel, draftkings]
}
