//! Training-row assembly and candidate fitting.

use super::artifact::{ArtifactMetadata, FeatureSchema, ModelArtifact, PositionModel};
use super::regress::{
    mean_absolute_error, train_test_split, BaggedForest, GradientBoost, Regressor, RidgeModel,
    StandardScaler, TRAINING_SEED,
};
use crate::cli::types::{Position, Season, Week};
use crate::error::Result;
use crate::features::{FeatureBuilder, BASE_FEATURE_NAMES, DST_FEATURE_NAMES};
use crate::matchup::position_feature_names;
use crate::scoring::{self, ScoringRules};
use crate::storage::Database;
use log::{info, warn};
use std::collections::BTreeMap;

/// Positions are skipped below this many training rows.
const MIN_TRAINING_ROWS: usize = 50;

/// Weeks 1-2 lack the history the feature vector needs.
const MIN_TARGET_WEEK: u16 = 3;

struct TrainingSet {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl TrainingSet {
    fn new() -> Self {
        TrainingSet {
            rows: Vec::new(),
            targets: Vec::new(),
        }
    }
}

/// Train a full artifact over `seasons` for one ruleset. With a cutoff,
/// every row at or after the cutoff (season, week) is excluded, making
/// the artifact safe to evaluate against that week.
pub(crate) fn train_artifact(
    db: &Database,
    rules: &ScoringRules,
    seasons: &[Season],
    cutoff: Option<(Season, Week)>,
    trained_through: Option<(Season, Week)>,
    with_position_features: bool,
) -> Result<ModelArtifact> {
    let stat_rows = db.training_stat_rows(seasons)?;
    let defense_rows = db.training_defense_rows(seasons)?;
    info!(
        "training {} on {} box-score rows, {} defense rows (cutoff {:?})",
        rules.name,
        stat_rows.len(),
        defense_rows.len(),
        cutoff
    );

    let mut builder = FeatureBuilder::new(db, rules);
    builder.cache_training_rows(&stat_rows, &defense_rows);

    let before_cutoff = |season: Season, week: Week| match cutoff {
        Some((cs, cw)) => (season, week) < (cs, cw),
        None => true,
    };

    // Player rows per position.
    let mut sets: BTreeMap<Position, TrainingSet> = BTreeMap::new();
    for row in &stat_rows {
        let (season, week) = (row.stats.season, row.stats.week);
        if week.as_u16() < MIN_TARGET_WEEK || !before_cutoff(season, week) {
            continue;
        }
        let features = builder.build_player_features(
            &row.stats.player_id,
            season,
            week,
            with_position_features,
        )?;
        let Some(features) = features else { continue };

        let names = feature_names_for(row.position, with_position_features);
        let vector = features.vector(&names);
        let target = scoring::score_player(&row.stats, rules).total;
        let set = sets.entry(row.position).or_insert_with(TrainingSet::new);
        set.rows.push(vector);
        set.targets.push(target);
    }

    let mut players = BTreeMap::new();
    for (position, set) in sets {
        let names = feature_names_for(position, with_position_features);
        match fit_position(&format!("{position}"), &set, names) {
            Some(model) => {
                players.insert(position, model);
            }
            None => {
                warn!(
                    "insufficient training data for {position}: {} rows",
                    set.rows.len()
                );
            }
        }
    }

    // DST rows.
    let mut dst_set = TrainingSet::new();
    let dst_names: Vec<String> = DST_FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    for row in &defense_rows {
        let (season, week) = (row.season, row.week);
        if week.as_u16() < MIN_TARGET_WEEK || !before_cutoff(season, week) {
            continue;
        }
        let features = builder.build_dst_features(&row.team_id, season, week)?;
        let Some(features) = features else { continue };
        dst_set.rows.push(features.vector(&dst_names));
        dst_set.targets.push(scoring::score_dst(row, rules).total);
    }
    let dst = fit_position("DST", &dst_set, dst_names);
    if dst.is_none() {
        warn!(
            "insufficient training data for DST: {} rows",
            dst_set.rows.len()
        );
    }

    let last_data = db.latest_completed_game(Some(seasons))?;
    let metadata = ArtifactMetadata {
        ruleset: rules.name.clone(),
        seasons_used: seasons.iter().map(|s| s.as_u16()).collect(),
        cutoff: cutoff.map(|(s, w)| (s.as_u16(), w.as_u16())),
        trained_through: trained_through.map(|(s, w)| (s.as_u16(), w.as_u16())),
        last_data_season: last_data.map(|(s, _)| s.as_u16()),
        last_data_week: last_data.map(|(_, w)| w.as_u16()),
        trained_at_utc: chrono::Utc::now().to_rfc3339(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        features: FeatureSchema::current(with_position_features),
    };

    Ok(ModelArtifact {
        metadata,
        players,
        dst,
    })
}

/// Ordered feature names for one position under the given schema mode.
pub(crate) fn feature_names_for(position: Position, with_position_features: bool) -> Vec<String> {
    let mut names: Vec<String> = BASE_FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    if with_position_features {
        names.extend(
            position_feature_names(position)
                .iter()
                .map(|s| s.to_string()),
        );
    }
    names
}

/// Fit the three candidate regressors on an 80/20 split and keep the one
/// with the lowest held-out MAE. Returns None below the row minimum.
fn fit_position(label: &str, set: &TrainingSet, feature_names: Vec<String>) -> Option<PositionModel> {
    let n = set.rows.len();
    if n < MIN_TRAINING_ROWS {
        return None;
    }

    let (train_idx, test_idx) = train_test_split(n, TRAINING_SEED);
    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| set.rows[i].clone()).collect();
    let train_targets: Vec<f64> = train_idx.iter().map(|&i| set.targets[i]).collect();
    let test_rows: Vec<Vec<f64>> = test_idx.iter().map(|&i| set.rows[i].clone()).collect();
    let test_targets: Vec<f64> = test_idx.iter().map(|&i| set.targets[i]).collect();

    let scaler = StandardScaler::fit(&train_rows);

    let forest = Regressor::Forest(BaggedForest::fit(&train_rows, &train_targets, TRAINING_SEED));
    let boost = Regressor::Boost(GradientBoost::fit(&train_rows, &train_targets));
    let ridge = Regressor::Ridge(RidgeModel::fit(
        &scaler.transform(&train_rows),
        &train_targets,
    ));

    let mut best: Option<(f64, Regressor)> = None;
    for candidate in [forest, boost, ridge] {
        let predicted: Vec<f64> = test_rows
            .iter()
            .map(|row| {
                if candidate.requires_scaler() {
                    candidate.predict(&scaler.transform_row(row))
                } else {
                    candidate.predict(row)
                }
            })
            .collect();
        let mae = mean_absolute_error(&test_targets, &predicted);
        info!("{label} {}: MAE={mae:.2}", candidate.kind().label());
        if best.as_ref().map(|(b, _)| mae < *b).unwrap_or(true) {
            best = Some((mae, candidate));
        }
    }

    let (holdout_mae, regressor) = best?;
    info!("best model for {label}: {} MAE={holdout_mae:.2}", regressor.kind().label());
    Some(PositionModel {
        selected: regressor.kind(),
        regressor,
        scaler,
        feature_names,
        holdout_mae,
        training_rows: n,
    })
}
