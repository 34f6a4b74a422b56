//! Injury reports and injury-aware prediction adjustment.
//!
//! The filter only ever lowers predictions; the one injury-driven boost
//! (a DST facing a depleted offense) is applied by the orchestrator on
//! top of the base DST prediction, never here.

#[cfg(test)]
mod tests;

use crate::cli::types::{Position, Season, TeamId, Week};
use crate::error::Result;
use crate::gameday::PlayerPrediction;
use crate::storage::{Database, InjuryRow};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Report status from the league injury feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryStatus {
    Active,
    Questionable,
    Doubtful,
    Out,
}

impl InjuryStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("out") => InjuryStatus::Out,
            Some("doubtful") => InjuryStatus::Doubtful,
            Some("questionable") => InjuryStatus::Questionable,
            _ => InjuryStatus::Active,
        }
    }
}

/// One player's line on an injury report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub player_name: String,
    pub team: TeamId,
    pub position: Option<String>,
    pub status: InjuryStatus,
    /// INACTIVE / ACTIVE from the fantasy feed; INACTIVE rules a player
    /// out regardless of report status.
    pub fantasy_status: Option<String>,
    pub primary_injury: Option<String>,
    pub practice_status: Option<String>,
    pub date_modified: Option<String>,
}

impl InjuryRecord {
    pub fn from_row(row: &InjuryRow) -> Self {
        InjuryRecord {
            player_name: row.full_name.clone(),
            team: row.team.clone(),
            position: row.position.clone(),
            status: InjuryStatus::parse(row.report_status.as_deref()),
            fantasy_status: None,
            primary_injury: row.report_primary_injury.clone(),
            practice_status: row.practice_status.clone(),
            date_modified: row.date_modified.clone(),
        }
    }

    pub fn is_out(&self) -> bool {
        self.status == InjuryStatus::Out
            || self
                .fantasy_status
                .as_deref()
                .map(|s| s.eq_ignore_ascii_case("INACTIVE"))
                .unwrap_or(false)
    }

    pub fn is_questionable(&self) -> bool {
        self.status == InjuryStatus::Questionable
    }

    /// Multiplicative reduction applied to a prediction: 0.0 is no
    /// impact, 1.0 is ruled out.
    pub fn impact_severity(&self) -> f64 {
        if self.is_out() {
            1.0
        } else {
            match self.status {
                InjuryStatus::Doubtful => 0.8,
                InjuryStatus::Questionable => 0.3,
                _ => 0.0,
            }
        }
    }
}

/// Source of injury reports. The production implementation reads the
/// relational store; tests substitute fixed lists.
pub trait InjurySource {
    /// The most recent report available.
    fn current_injuries(&self) -> Result<Vec<InjuryRecord>>;

    /// The report as filed for a specific week.
    fn historical_injuries(&self, season: Season, week: Week) -> Result<Vec<InjuryRecord>>;

    fn is_player_out(&self, name: &str, team: Option<&TeamId>) -> Result<bool> {
        let name_lower = name.to_lowercase();
        Ok(self.current_injuries()?.iter().any(|injury| {
            injury.player_name.to_lowercase() == name_lower
                && team.map(|t| &injury.team == t).unwrap_or(true)
                && injury.is_out()
        }))
    }
}

/// Injury source backed by the `historical_injuries` table; the latest
/// (season, week) present is treated as the current report.
pub struct DbInjurySource<'a> {
    db: &'a Database,
}

impl<'a> DbInjurySource<'a> {
    pub fn new(db: &'a Database) -> Self {
        DbInjurySource { db }
    }
}

impl InjurySource for DbInjurySource<'_> {
    fn current_injuries(&self) -> Result<Vec<InjuryRecord>> {
        match self.db.latest_injury_week()? {
            Some((season, week)) => self.historical_injuries(season, week),
            None => Ok(Vec::new()),
        }
    }

    fn historical_injuries(&self, season: Season, week: Week) -> Result<Vec<InjuryRecord>> {
        let rows = self.db.injuries_for_week(season, week)?;
        Ok(rows.iter().map(InjuryRecord::from_row).collect())
    }
}

/// Summary of the current report, grouped for the gameday payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryReport {
    pub total_out: usize,
    pub total_questionable: usize,
    pub out_by_position: BTreeMap<String, Vec<InjuryRecord>>,
    pub questionable: Vec<InjuryRecord>,
    pub high_impact_teams: Vec<TeamId>,
}

/// Applies a report to a prediction set.
pub struct InjuryFilter {
    injuries: Vec<InjuryRecord>,
}

impl InjuryFilter {
    pub fn new(injuries: Vec<InjuryRecord>) -> Self {
        InjuryFilter { injuries }
    }

    pub fn injuries(&self) -> &[InjuryRecord] {
        &self.injuries
    }

    /// Remove every prediction whose player is ruled out
    /// (case-insensitive name match).
    pub fn filter_out(&self, predictions: Vec<PlayerPrediction>) -> Vec<PlayerPrediction> {
        let out_names: Vec<String> = self
            .injuries
            .iter()
            .filter(|i| i.is_out())
            .map(|i| i.player_name.to_lowercase())
            .collect();
        let before = predictions.len();
        let kept: Vec<PlayerPrediction> = predictions
            .into_iter()
            .filter(|p| !out_names.contains(&p.player_name.to_lowercase()))
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            info!("filtered {removed} OUT players from predictions");
        }
        kept
    }

    /// Scale down predictions for players with a positive-severity
    /// injury. Never raises a prediction.
    pub fn adjust(&self, predictions: Vec<PlayerPrediction>) -> Vec<PlayerPrediction> {
        let severities: HashMap<String, f64> = self
            .injuries
            .iter()
            .map(|i| (i.player_name.to_lowercase(), i.impact_severity()))
            .collect();

        predictions
            .into_iter()
            .map(|mut prediction| {
                if let Some(&severity) = severities.get(&prediction.player_name.to_lowercase()) {
                    if severity > 0.0 {
                        prediction.predicted_points *= 1.0 - severity;
                        prediction.injury_adjustment = Some(severity);
                    }
                }
                prediction
            })
            .collect()
    }

    /// Report summary with position groupings and the teams losing the
    /// most to injury (weight Out=3, Doubtful=2, Questionable=1, flagged
    /// above 3.0).
    pub fn gameday_report(&self) -> InjuryReport {
        let out_players: Vec<&InjuryRecord> =
            self.injuries.iter().filter(|i| i.is_out()).collect();
        let questionable: Vec<InjuryRecord> = self
            .injuries
            .iter()
            .filter(|i| i.is_questionable() && !i.is_out())
            .cloned()
            .collect();

        let mut out_by_position: BTreeMap<String, Vec<InjuryRecord>> = BTreeMap::new();
        for injury in &out_players {
            let position = injury
                .position
                .clone()
                .unwrap_or_else(|| "UNK".to_string());
            out_by_position
                .entry(position)
                .or_default()
                .push((*injury).clone());
        }

        let mut team_weights: HashMap<TeamId, f64> = HashMap::new();
        for injury in &self.injuries {
            let weight = if injury.is_out() {
                3.0
            } else {
                match injury.status {
                    InjuryStatus::Doubtful => 2.0,
                    InjuryStatus::Questionable => 1.0,
                    _ => 0.0,
                }
            };
            if weight > 0.0 {
                *team_weights.entry(injury.team.clone()).or_default() += weight;
            }
        }
        let mut high_impact_teams: Vec<TeamId> = team_weights
            .into_iter()
            .filter(|(_, weight)| *weight > 3.0)
            .map(|(team, _)| team)
            .collect();
        high_impact_teams.sort();

        InjuryReport {
            total_out: out_players.len(),
            total_questionable: questionable.len(),
            out_by_position,
            questionable,
            high_impact_teams,
        }
    }

    /// Impactful injuries for one team, grouped by position.
    pub fn team_impact(&self, team: &TeamId) -> BTreeMap<String, Vec<InjuryRecord>> {
        let mut by_position: BTreeMap<String, Vec<InjuryRecord>> = BTreeMap::new();
        for injury in self.injuries.iter().filter(|i| &i.team == team) {
            if injury.impact_severity() > 0.0 {
                let position = injury
                    .position
                    .clone()
                    .unwrap_or_else(|| "UNK".to_string());
                by_position.entry(position).or_default().push(injury.clone());
            }
        }
        by_position
    }
}

/// Multiplicative DST uplift from the opponent's injured roster: +0.15
/// per Out QB, +0.05 per Questionable QB, +0.03 per Out offensive
/// lineman, capped at +0.25.
pub fn dst_injury_boost(opponent_impact: &BTreeMap<String, Vec<InjuryRecord>>) -> f64 {
    let mut boost: f64 = 0.0;

    if let Some(qbs) = opponent_impact.get("QB") {
        for injury in qbs {
            if injury.is_out() {
                boost += 0.15;
            } else if injury.is_questionable() {
                boost += 0.05;
            }
        }
    }

    for (position, injuries) in opponent_impact {
        if Position::parse_is_offensive_line(position) {
            for injury in injuries {
                if injury.is_out() {
                    boost += 0.03;
                }
            }
        }
    }

    boost.min(0.25)
}
