//! The gameday orchestrator: one call from (season, week, ruleset) to a
//! full prediction set, injury-adjusted, with a composed lineup.


use crate::cli::types::{PlayerId, Position, Season, TeamId, Week};
use crate::error::{GamedayError, Result};
use crate::features::FeatureBuilder;
use crate::injury::{
    dst_injury_boost, DbInjurySource, InjuryFilter, InjuryRecord, InjuryReport, InjurySource,
};
use crate::lineup::{
    compose_basic, compose_salary_capped, projection_band, salary, ComposedLineup,
    LineupCandidate, LineupConstraints, SlotTemplate,
};
use crate::model::{ModelArtifact, ModelStore};
use crate::scoring::ScoringTable;
use crate::storage::Database;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Variance window for ceiling/floor bands.
const BAND_HISTORY_GAMES: usize = 8;

/// One request to the orchestrator.
#[derive(Debug, Clone)]
pub struct GamedayRequest {
    pub season: Season,
    pub week: Week,
    pub ruleset: String,
    pub include_injury_adjustments: bool,
    /// Enables the salary-capped DFS lineup (with FLEX and DST slots).
    pub salary_cap: Option<f64>,
    /// Train/load artifacts that carry position matchup features.
    pub with_position_features: bool,
    /// Coarse steps abort once this instant passes.
    pub deadline: Option<Instant>,
}

impl GamedayRequest {
    pub fn new(season: Season, week: Week, ruleset: impl Into<String>) -> Self {
        GamedayRequest {
            season,
            week,
            ruleset: ruleset.into(),
            include_injury_adjustments: true,
            salary_cap: None,
            with_position_features: false,
            deadline: None,
        }
    }
}

/// A projected player after model prediction (and, later, injury
/// adjustment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPrediction {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: Position,
    pub team_id: TeamId,
    pub predicted_points: f64,
    /// Severity applied by the injury filter, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injury_adjustment: Option<f64>,
}

/// A projected team defense with the opponent-injury uplift applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstPrediction {
    pub team_id: TeamId,
    pub opponent: TeamId,
    pub base_prediction: f64,
    pub injury_boost: f64,
    pub adjusted_prediction: f64,
    pub opponent_key_injuries: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GamedaySummary {
    pub total_players_analyzed: usize,
    pub average_projection: f64,
    pub top_projection: f64,
    pub optimal_lineup_projection: f64,
}

/// The full gameday payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamedayResult {
    pub timestamp: String,
    pub season: Season,
    pub week: Week,
    pub ruleset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injury_report: Option<InjuryReport>,
    pub player_predictions: Vec<PlayerPrediction>,
    pub optimal_lineup: ComposedLineup,
    pub dst_predictions: Vec<DstPrediction>,
    pub summary: GamedaySummary,
}

/// Gameday status lookup for a single player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerGamedayStatus {
    pub player_name: String,
    pub team: Option<TeamId>,
    pub is_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injury: Option<InjuryRecord>,
    /// AVOID, MONITOR, or CLEAR.
    pub recommendation: String,
}

/// Orchestrates the projection pipeline for the life of a request. Owns
/// the model store handle and the per-request feature cache exclusively.
pub struct GamedayPredictor<'a> {
    db: &'a Database,
    scoring: ScoringTable,
    store: ModelStore,
    injuries: Option<Box<dyn InjurySource + 'a>>,
}

impl<'a> GamedayPredictor<'a> {
    pub fn new(db: &'a Database, scoring: ScoringTable, store: ModelStore) -> Self {
        GamedayPredictor {
            injuries: Some(Box::new(DbInjurySource::new(db))),
            db,
            scoring,
            store,
        }
    }

    /// Replace the injury source (tests, or a live feed collaborator).
    pub fn with_injury_source(mut self, source: Box<dyn InjurySource + 'a>) -> Self {
        self.injuries = Some(source);
        self
    }

    /// Run with no injury source at all; predictions go out unadjusted.
    pub fn without_injury_source(mut self) -> Self {
        self.injuries = None;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn scoring(&self) -> &ScoringTable {
        &self.scoring
    }

    /// The single public pipeline operation: injuries, eligibility,
    /// model resolution, prefetch, prediction, adjustment, DST boosts,
    /// lineup, summary.
    pub fn gameday_predictions(&self, request: &GamedayRequest) -> Result<GamedayResult> {
        if request.week.as_u16() == 0 || request.week.as_u16() > Week::MAX {
            return Err(GamedayError::BadWeek {
                season: request.season.as_u16(),
                week: request.week.as_u16(),
            });
        }
        let rules = self.scoring.get(&request.ruleset)?;
        info!(
            "gameday predictions for {} W{} under {}",
            request.season, request.week, rules.name
        );

        // 1. Injury report (optional; source failures degrade).
        check_deadline(request, "injury report")?;
        let filter = self.load_injury_filter(request);
        let injury_report = filter.as_ref().map(|f| f.gameday_report());
        if let Some(report) = &injury_report {
            info!(
                "injury report: {} OUT, {} questionable",
                report.total_out, report.total_questionable
            );
        }

        // 2. Eligible players.
        check_deadline(request, "eligibility scan")?;
        let eligible = self.db.eligible_players(request.season, request.week)?;
        info!("found {} eligible players", eligible.len());

        // 3. Resident cutoff artifact.
        check_deadline(request, "model resolution")?;
        let artifact = self.store.ensure_cutoff(
            self.db,
            rules,
            request.season,
            request.week,
            request.with_position_features,
        )?;

        // 4. Prefetch the feature cache.
        check_deadline(request, "feature prefetch")?;
        let mut builder = FeatureBuilder::new(self.db, rules);
        let ids: Vec<PlayerId> = eligible.iter().map(|p| p.player_id.clone()).collect();
        builder.prefetch_players(&ids, request.season, request.week)?;

        // 5. Build features (DB-bound, sequential), then predict
        // (CPU-bound, parallel).
        let with_matchup = artifact.metadata.features.supports_position_features;
        let mut inputs = Vec::with_capacity(eligible.len());
        for player in &eligible {
            let features = builder.build_player_features(
                &player.player_id,
                request.season,
                request.week,
                with_matchup,
            )?;
            if let Some(features) = features {
                inputs.push((player.clone(), features));
            }
        }
        check_deadline(request, "prediction")?;
        let mut predictions: Vec<PlayerPrediction> = inputs
            .par_iter()
            .filter_map(|(player, features)| {
                let points = artifact.predict_player(features)?;
                if points <= 0.0 {
                    return None;
                }
                Some(PlayerPrediction {
                    player_id: player.player_id.clone(),
                    player_name: player.player_name.clone(),
                    position: player.position,
                    team_id: player.team_id.clone(),
                    predicted_points: points,
                    injury_adjustment: None,
                })
            })
            .collect();
        let dropped = inputs.len() - predictions.len();
        if dropped > 0 {
            info!("{dropped} players dropped (no model or nonpositive prediction)");
        }

        // 6. Injury filtering and adjustment.
        if let Some(filter) = &filter {
            predictions = filter.filter_out(predictions);
            predictions = filter.adjust(predictions);
        }
        predictions.sort_by(|a, b| {
            a.position
                .code()
                .partial_cmp(&b.position.code())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    b.predicted_points
                        .partial_cmp(&a.predicted_points)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        // 7. DST predictions with the opponent-injury uplift.
        check_deadline(request, "dst predictions")?;
        let dst_predictions =
            self.predict_defenses(request, &artifact, &mut builder, filter.as_ref())?;

        // 8. Lineup composition.
        check_deadline(request, "lineup composition")?;
        let optimal_lineup = self.compose_lineup(
            request,
            &mut builder,
            &predictions,
            &dst_predictions,
        )?;

        // 9. Summary.
        let summary = summarize(&predictions, &optimal_lineup);
        Ok(GamedayResult {
            timestamp: chrono::Utc::now().to_rfc3339(),
            season: request.season,
            week: request.week,
            ruleset: rules.name.clone(),
            injury_report,
            player_predictions: predictions,
            optimal_lineup,
            dst_predictions,
            summary,
        })
    }

    /// Project one player under the CURRENT artifact for a ruleset.
    ///
    /// Unlike the bulk pipeline, a thin history is an error here rather
    /// than a silent drop, since the caller asked about this player
    /// specifically.
    pub fn project_player(
        &self,
        player_id: &PlayerId,
        season: Season,
        week: Week,
        ruleset: &str,
    ) -> Result<f64> {
        let rules = self.scoring.get(ruleset)?;
        let player = self
            .db
            .get_player(player_id)?
            .ok_or_else(|| GamedayError::PlayerNotFound {
                id: player_id.to_string(),
            })?;
        let artifact = self.store.current(&rules.name)?;

        let mut builder = FeatureBuilder::new(self.db, rules);
        let features = builder.build_player_features(
            player_id,
            season,
            week,
            artifact.metadata.features.supports_position_features,
        )?;
        let Some(features) = features else {
            let games = builder
                .recent_player_points(player_id, season, week, 50)?
                .len();
            return Err(GamedayError::NotEnoughHistory {
                subject: player.player_name,
                games,
            });
        };
        artifact
            .predict_player(&features)
            .ok_or_else(|| GamedayError::NoModel {
                ruleset: rules.name.clone(),
            })
    }

    /// Project one team defense under the CURRENT artifact for a ruleset.
    pub fn project_dst(
        &self,
        team_id: &TeamId,
        season: Season,
        week: Week,
        ruleset: &str,
    ) -> Result<f64> {
        let rules = self.scoring.get(ruleset)?;
        let artifact = self.store.current(&rules.name)?;

        let mut builder = FeatureBuilder::new(self.db, rules);
        let features = builder.build_dst_features(team_id, season, week)?;
        let Some(features) = features else {
            let games = builder
                .recent_dst_points(team_id, season, week, 20)?
                .len();
            if games == 0 {
                return Err(GamedayError::TeamNotFound {
                    id: team_id.to_string(),
                });
            }
            return Err(GamedayError::NotEnoughHistory {
                subject: format!("{team_id} DST"),
                games,
            });
        };
        artifact
            .predict_dst(&features)
            .ok_or_else(|| GamedayError::NoModel {
                ruleset: rules.name.clone(),
            })
    }

    /// Gameday status for one player by report name.
    pub fn player_gameday_status(
        &self,
        player_name: &str,
        team: Option<&TeamId>,
    ) -> Result<PlayerGamedayStatus> {
        let records = match &self.injuries {
            Some(source) => source.current_injuries()?,
            None => Vec::new(),
        };
        let name_lower = player_name.to_lowercase();
        let injury = records.into_iter().find(|r| {
            r.player_name.to_lowercase() == name_lower
                && team.map(|t| &r.team == t).unwrap_or(true)
        });
        let is_out = injury.as_ref().map(|r| r.is_out()).unwrap_or(false);
        let recommendation = if is_out {
            "AVOID"
        } else if injury.is_some() {
            "MONITOR"
        } else {
            "CLEAR"
        };
        Ok(PlayerGamedayStatus {
            player_name: player_name.to_string(),
            team: team.cloned(),
            is_out,
            injury,
            recommendation: recommendation.to_string(),
        })
    }

    fn load_injury_filter(&self, request: &GamedayRequest) -> Option<InjuryFilter> {
        if !request.include_injury_adjustments {
            return None;
        }
        let source = self.injuries.as_ref()?;
        match source.current_injuries() {
            Ok(records) => Some(InjuryFilter::new(records)),
            Err(e) => {
                warn!("injury source unavailable, predictions proceed unadjusted: {e}");
                None
            }
        }
    }

    fn predict_defenses(
        &self,
        request: &GamedayRequest,
        artifact: &Arc<ModelArtifact>,
        builder: &mut FeatureBuilder<'_>,
        filter: Option<&InjuryFilter>,
    ) -> Result<Vec<DstPrediction>> {
        let matchups = self.db.week_matchups(request.season, request.week)?;
        let teams: Vec<TeamId> = matchups.iter().map(|m| m.team_id.clone()).collect();
        builder.prefetch_defenses(&teams, request.season, request.week)?;

        let mut out = Vec::new();
        for matchup in &matchups {
            let features =
                builder.build_dst_features(&matchup.team_id, request.season, request.week)?;
            let Some(features) = features else { continue };
            let Some(base) = artifact.predict_dst(&features) else {
                continue;
            };

            let (boost, key_injuries) = match filter {
                Some(filter) => {
                    let impact = filter.team_impact(&matchup.opponent_id);
                    let key = impact
                        .iter()
                        .filter(|(position, _)| matches!(position.as_str(), "QB" | "RB" | "WR"))
                        .map(|(_, injuries)| injuries.len())
                        .sum();
                    (dst_injury_boost(&impact), key)
                }
                None => (0.0, 0),
            };

            out.push(DstPrediction {
                team_id: matchup.team_id.clone(),
                opponent: matchup.opponent_id.clone(),
                base_prediction: base,
                injury_boost: boost,
                adjusted_prediction: base * (1.0 + boost),
                opponent_key_injuries: key_injuries,
            });
        }
        out.sort_by(|a, b| {
            b.adjusted_prediction
                .partial_cmp(&a.adjusted_prediction)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(out)
    }

    fn compose_lineup(
        &self,
        request: &GamedayRequest,
        builder: &mut FeatureBuilder<'_>,
        predictions: &[PlayerPrediction],
        dst_predictions: &[DstPrediction],
    ) -> Result<ComposedLineup> {
        // Deterministic salary jitter per (season, week, ruleset).
        let seed = request.season.as_u16() as u64 * 1000
            + request.week.as_u16() as u64
            + request.ruleset.len() as u64;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut candidates = Vec::with_capacity(predictions.len() + dst_predictions.len());
        for prediction in predictions {
            let history = builder.recent_player_points(
                &prediction.player_id,
                request.season,
                request.week,
                BAND_HISTORY_GAMES,
            )?;
            let (ceiling, floor) =
                projection_band(prediction.predicted_points, &history, false);
            candidates.push(LineupCandidate {
                id: prediction.player_id.to_string(),
                name: prediction.player_name.clone(),
                position: prediction.position,
                team: prediction.team_id.clone(),
                projected_points: prediction.predicted_points,
                ceiling,
                floor,
                salary: salary::estimate_salary(
                    prediction.predicted_points,
                    prediction.position,
                    &mut rng,
                ),
            });
        }

        if let Some(cap) = request.salary_cap {
            for dst in dst_predictions {
                let history = builder.recent_dst_points(
                    &dst.team_id,
                    request.season,
                    request.week,
                    BAND_HISTORY_GAMES,
                )?;
                let (ceiling, floor) =
                    projection_band(dst.adjusted_prediction, &history, true);
                let name = self.db.team_name(&dst.team_id)?;
                candidates.push(LineupCandidate {
                    id: format!("DST_{}", dst.team_id),
                    name: format!("{name} DST"),
                    position: Position::Dst,
                    team: dst.team_id.clone(),
                    projected_points: dst.adjusted_prediction,
                    ceiling,
                    floor,
                    salary: salary::estimate_dst_salary(dst.adjusted_prediction, &mut rng),
                });
            }
            let constraints = LineupConstraints {
                salary_cap: cap,
                ..Default::default()
            };
            Ok(compose_salary_capped(&candidates, &constraints))
        } else {
            Ok(compose_basic(&candidates, SlotTemplate::default()))
        }
    }
}

fn check_deadline(request: &GamedayRequest, stage: &'static str) -> Result<()> {
    if let Some(deadline) = request.deadline {
        if Instant::now() >= deadline {
            return Err(GamedayError::DeadlineExceeded { stage });
        }
    }
    Ok(())
}

fn summarize(predictions: &[PlayerPrediction], lineup: &ComposedLineup) -> GamedaySummary {
    if predictions.is_empty() {
        return GamedaySummary {
            optimal_lineup_projection: lineup.total_projected,
            ..Default::default()
        };
    }
    let total = predictions.len();
    let sum: f64 = predictions.iter().map(|p| p.predicted_points).sum();
    let top = predictions
        .iter()
        .map(|p| p.predicted_points)
        .fold(0.0, f64::max);
    GamedaySummary {
        total_players_analyzed: total,
        average_projection: sum / total as f64,
        top_projection: top,
        optimal_lineup_projection: lineup.total_projected,
    }
}
