//! Lineup composition from adjusted predictions.

pub mod salary;


use crate::cli::types::{Position, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Required slot counts. The default template matches the weekly
/// projection surface; the DFS template adds FLEX and DST for
/// salary-capped play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotTemplate {
    pub qb: usize,
    pub rb: usize,
    pub wr: usize,
    pub te: usize,
    pub flex: usize,
    pub dst: usize,
}

impl Default for SlotTemplate {
    fn default() -> Self {
        SlotTemplate {
            qb: 1,
            rb: 2,
            wr: 3,
            te: 1,
            flex: 0,
            dst: 0,
        }
    }
}

impl SlotTemplate {
    /// DraftKings-style template used with a salary cap.
    pub fn dfs() -> Self {
        SlotTemplate {
            qb: 1,
            rb: 2,
            wr: 3,
            te: 1,
            flex: 1,
            dst: 1,
        }
    }

    fn required(&self, position: Position) -> usize {
        match position {
            Position::QB => self.qb,
            Position::RB => self.rb,
            Position::WR => self.wr,
            Position::TE => self.te,
            Position::Dst => self.dst,
            _ => 0,
        }
    }
}

/// Constraints for salary-capped composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupConstraints {
    pub template: SlotTemplate,
    pub salary_cap: f64,
    pub min_teams: usize,
    pub max_players_per_team: usize,
}

impl Default for LineupConstraints {
    fn default() -> Self {
        LineupConstraints {
            template: SlotTemplate::dfs(),
            salary_cap: 50_000.0,
            min_teams: 2,
            max_players_per_team: 4,
        }
    }
}

/// One selectable projection, player or DST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupCandidate {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub team: TeamId,
    pub projected_points: f64,
    pub ceiling: f64,
    pub floor: f64,
    pub salary: f64,
}

impl LineupCandidate {
    fn value(&self) -> f64 {
        self.projected_points / (self.salary / 1000.0).max(1e-9)
    }
}

/// A composed lineup: ordered slot map plus totals. Slots that could not
/// be filled are reported, never silently padded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposedLineup {
    pub slots: BTreeMap<String, Vec<LineupCandidate>>,
    pub total_projected: f64,
    pub total_salary: Option<f64>,
    pub teams_used: Option<Vec<TeamId>>,
    /// (slot, missing count) for every under-filled slot.
    pub unfilled: Vec<(String, usize)>,
}

const SLOT_ORDER: [(Position, &str); 5] = [
    (Position::QB, "QB"),
    (Position::RB, "RB"),
    (Position::WR, "WR"),
    (Position::TE, "TE"),
    (Position::Dst, "DST"),
];

/// Fill each required slot with the top projections for its position.
pub fn compose_basic(candidates: &[LineupCandidate], template: SlotTemplate) -> ComposedLineup {
    let mut by_position: BTreeMap<Position, Vec<&LineupCandidate>> = BTreeMap::new();
    for candidate in candidates {
        by_position
            .entry(candidate.position)
            .or_default()
            .push(candidate);
    }
    for pool in by_position.values_mut() {
        pool.sort_by(|a, b| {
            b.projected_points
                .partial_cmp(&a.projected_points)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut slots = BTreeMap::new();
    let mut unfilled = Vec::new();
    let mut total_projected = 0.0;
    let mut taken: Vec<&LineupCandidate> = Vec::new();

    for (position, label) in SLOT_ORDER {
        let want = template.required(position);
        if want == 0 {
            continue;
        }
        let pool = by_position.get(&position).map(|p| p.as_slice()).unwrap_or(&[]);
        let picks: Vec<LineupCandidate> = pool.iter().take(want).map(|c| (*c).clone()).collect();
        if picks.len() < want {
            unfilled.push((label.to_string(), want - picks.len()));
        }
        for pick in &picks {
            total_projected += pick.projected_points;
        }
        taken.extend(pool.iter().take(want).copied());
        slots.insert(label.to_string(), picks);
    }

    // FLEX draws the best remaining RB/WR/TE.
    if template.flex > 0 {
        let mut flex_pool: Vec<&LineupCandidate> = candidates
            .iter()
            .filter(|c| c.position.is_flex_eligible())
            .filter(|c| !taken.iter().any(|t| t.id == c.id))
            .collect();
        flex_pool.sort_by(|a, b| {
            b.projected_points
                .partial_cmp(&a.projected_points)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let picks: Vec<LineupCandidate> = flex_pool
            .iter()
            .take(template.flex)
            .map(|c| (*c).clone())
            .collect();
        if picks.len() < template.flex {
            unfilled.push(("FLEX".to_string(), template.flex - picks.len()));
        }
        for pick in &picks {
            total_projected += pick.projected_points;
        }
        slots.insert("FLEX".to_string(), picks);
    }

    ComposedLineup {
        slots,
        total_projected,
        total_salary: None,
        teams_used: None,
        unfilled,
    }
}

/// Greedy salary-capped composition by value (points per $1000),
/// honoring the cap, team-diversity floor, and per-team ceiling. FLEX
/// takes RB/WR/TE only.
pub fn compose_salary_capped(
    candidates: &[LineupCandidate],
    constraints: &LineupConstraints,
) -> ComposedLineup {
    let mut ordered: Vec<&LineupCandidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| {
        b.value()
            .partial_cmp(&a.value())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let template = constraints.template;
    let mut needs: BTreeMap<Position, usize> = BTreeMap::new();
    for (position, _) in SLOT_ORDER {
        let want = template.required(position);
        if want > 0 {
            needs.insert(position, want);
        }
    }
    let mut flex_needs = template.flex;

    let mut picked: Vec<(&LineupCandidate, &'static str)> = Vec::new();
    let mut remaining = constraints.salary_cap;

    let slots_total: usize =
        needs.values().sum::<usize>() + flex_needs;

    for candidate in ordered {
        if picked.len() == slots_total {
            break;
        }
        if candidate.salary > remaining {
            continue;
        }
        let team_count = picked
            .iter()
            .filter(|(p, _)| p.team == candidate.team)
            .count();
        if team_count >= constraints.max_players_per_team {
            continue;
        }
        // Keep the diversity floor satisfiable: the last slot must not
        // close out a one-team lineup.
        if picked.len() + 1 == slots_total && constraints.min_teams > 1 {
            let mut teams: Vec<&TeamId> = picked.iter().map(|(p, _)| &p.team).collect();
            teams.push(&candidate.team);
            teams.sort();
            teams.dedup();
            if teams.len() < constraints.min_teams {
                continue;
            }
        }

        let slot = if needs.get(&candidate.position).copied().unwrap_or(0) > 0 {
            *needs.get_mut(&candidate.position).unwrap() -= 1;
            slot_label(candidate.position)
        } else if flex_needs > 0 && candidate.position.is_flex_eligible() {
            flex_needs -= 1;
            "FLEX"
        } else {
            continue;
        };

        remaining -= candidate.salary;
        picked.push((candidate, slot));
    }

    let mut slots: BTreeMap<String, Vec<LineupCandidate>> = BTreeMap::new();
    let mut total_projected = 0.0;
    let mut total_salary = 0.0;
    for (candidate, slot) in &picked {
        total_projected += candidate.projected_points;
        total_salary += candidate.salary;
        slots
            .entry(slot.to_string())
            .or_default()
            .push((*candidate).clone());
    }

    let mut unfilled: Vec<(String, usize)> = needs
        .iter()
        .filter(|&(_, &missing)| missing > 0)
        .map(|(&position, &missing)| (slot_label(position).to_string(), missing))
        .collect();
    if flex_needs > 0 {
        unfilled.push(("FLEX".to_string(), flex_needs));
    }

    let mut teams_used: Vec<TeamId> = picked.iter().map(|(p, _)| p.team.clone()).collect();
    teams_used.sort();
    teams_used.dedup();

    ComposedLineup {
        slots,
        total_projected,
        total_salary: Some(total_salary),
        teams_used: Some(teams_used),
        unfilled,
    }
}

fn slot_label(position: Position) -> &'static str {
    match position {
        Position::QB => "QB",
        Position::RB => "RB",
        Position::WR => "WR",
        Position::TE => "TE",
        Position::Dst => "DST",
        _ => "FLEX",
    }
}

/// Ceiling/floor band around a projection from recent-game variance:
/// roughly the 90th/10th percentiles at ±1.3 standard deviations.
pub fn projection_band(projected: f64, history: &[f64], dst: bool) -> (f64, f64) {
    if history.is_empty() {
        return if dst {
            (projected * 1.8, (projected * 0.2).max(0.0))
        } else {
            (projected * 1.5, (projected * 0.3).max(0.0))
        };
    }
    let n = history.len() as f64;
    let mean = history.iter().sum::<f64>() / n;
    let std = (history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    (projected + 1.3 * std, (projected - 1.3 * std).max(0.0))
}
