//! Model artifacts: the serialized bundle, sidecar metadata, and atomic
//! persistence.
//!
//! An artifact is self-describing: predicting with it needs only the
//! artifact plus current feature inputs. The JSON sidecar mirrors the
//! embedded metadata and is the source of truth for the feature schema.

use super::regress::{CandidateKind, Regressor, StandardScaler};
use crate::cli::types::{position::SKILL_POSITIONS, Position};
use crate::error::{GamedayError, Result};
use crate::features::{DstFeatures, PlayerFeatures, BASE_FEATURE_NAMES, DST_FEATURE_NAMES};
use crate::matchup::position_feature_names;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Bumped whenever feature derivation changes incompatibly. Loading an
/// artifact with a different version is a SchemaMismatch, never a silent
/// upgrade.
pub const SCHEMA_VERSION: u32 = 2;

/// DST predictions are clamped into this range.
pub const DST_PREDICTION_RANGE: (f64, f64) = (0.0, 30.0);

/// The exact input shape every model in an artifact expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub schema_version: u32,
    pub base_feature_names: Vec<String>,
    /// Full ordered per-position lists (base + position features) when
    /// position features are enabled.
    pub position_feature_names: BTreeMap<String, Vec<String>>,
    pub dst_feature_names: Vec<String>,
    pub supports_position_features: bool,
}

impl FeatureSchema {
    /// The schema the current builder produces.
    pub fn current(supports_position_features: bool) -> Self {
        let base: Vec<String> = BASE_FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let mut per_position = BTreeMap::new();
        if supports_position_features {
            for position in SKILL_POSITIONS {
                let mut names = base.clone();
                names.extend(
                    position_feature_names(position)
                        .iter()
                        .map(|s| s.to_string()),
                );
                per_position.insert(position.to_string(), names);
            }
        }
        FeatureSchema {
            schema_version: SCHEMA_VERSION,
            base_feature_names: base,
            position_feature_names: per_position,
            dst_feature_names: DST_FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            supports_position_features,
        }
    }

    /// Verify this schema matches what the running builder would produce.
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(GamedayError::SchemaMismatch {
                reason: format!(
                    "artifact schema v{} but this build expects v{}",
                    self.schema_version, SCHEMA_VERSION
                ),
            });
        }
        let expected = FeatureSchema::current(self.supports_position_features);
        if self.base_feature_names != expected.base_feature_names {
            return Err(GamedayError::SchemaMismatch {
                reason: "base feature names drifted from the builder".to_string(),
            });
        }
        if self.dst_feature_names != expected.dst_feature_names {
            return Err(GamedayError::SchemaMismatch {
                reason: "DST feature names drifted from the builder".to_string(),
            });
        }
        if self.position_feature_names != expected.position_feature_names {
            return Err(GamedayError::SchemaMismatch {
                reason: "position feature names drifted from the builder".to_string(),
            });
        }
        Ok(())
    }
}

/// Sidecar metadata persisted next to every blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub ruleset: String,
    pub seasons_used: Vec<u16>,
    /// Target (season, week) for cutoff artifacts; None for the rolling
    /// CURRENT artifact.
    pub cutoff: Option<(u16, u16)>,
    /// Most recent ready (season, week) the training data could include.
    pub trained_through: Option<(u16, u16)>,
    pub last_data_season: Option<u16>,
    pub last_data_week: Option<u16>,
    pub trained_at_utc: String,
    pub engine_version: String,
    pub features: FeatureSchema,
}

/// One position's fitted model with everything prediction needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionModel {
    pub regressor: Regressor,
    pub scaler: StandardScaler,
    /// Exact ordered feature names used at fit time.
    pub feature_names: Vec<String>,
    pub selected: CandidateKind,
    pub holdout_mae: f64,
    pub training_rows: usize,
}

impl PositionModel {
    pub fn predict_vector(&self, raw: &[f64]) -> f64 {
        if self.regressor.requires_scaler() {
            self.regressor.predict(&self.scaler.transform_row(raw))
        } else {
            self.regressor.predict(raw)
        }
    }
}

/// A trained bundle: per-position player models plus the DST model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub players: BTreeMap<Position, PositionModel>,
    pub dst: Option<PositionModel>,
}

impl ModelArtifact {
    /// Predict a player's points; None when the position is unmodeled.
    /// Player predictions clamp to >= 0.
    pub fn predict_player(&self, features: &PlayerFeatures) -> Option<f64> {
        let model = self.players.get(&features.position)?;
        let raw = features.vector(&model.feature_names);
        Some(model.predict_vector(&raw).max(0.0))
    }

    /// Predict a DST's points; None when no DST model was trained. DST
    /// predictions clamp to [0, 30].
    pub fn predict_dst(&self, features: &DstFeatures) -> Option<f64> {
        let model = self.dst.as_ref()?;
        let raw = features.vector(&model.feature_names);
        let (lo, hi) = DST_PREDICTION_RANGE;
        Some(model.predict_vector(&raw).clamp(lo, hi))
    }

    /// Positions this artifact can serve.
    pub fn modeled_positions(&self) -> Vec<Position> {
        self.players.keys().copied().collect()
    }
}

/// Write bytes atomically: temp sibling, fsync, rename into place.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    });
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Persist the blob and its JSON sidecar.
pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    let blob = bincode::serialize(artifact)?;
    write_atomic(path, &blob)?;
    let sidecar = serde_json::to_vec_pretty(&artifact.metadata)?;
    write_atomic(&path.with_extension("json"), &sidecar)?;
    Ok(())
}

/// Load and validate an artifact. Schema drift surfaces as
/// SchemaMismatch.
pub fn load_artifact(path: &Path) -> Result<ModelArtifact> {
    let bytes = fs::read(path)?;
    let artifact: ModelArtifact =
        bincode::deserialize(&bytes).map_err(|e| GamedayError::SchemaMismatch {
            reason: format!("artifact {} failed to decode: {e}", path.display()),
        })?;
    artifact.metadata.features.validate()?;
    Ok(artifact)
}

/// Pointer file contents for the newest non-cutoff artifact of a ruleset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentPointer {
    pub file: String,
    pub metadata: ArtifactMetadata,
}

pub(crate) fn current_pointer_path(scoring_dir: &Path) -> PathBuf {
    scoring_dir.join("CURRENT.json")
}

pub(crate) fn read_current_pointer(scoring_dir: &Path) -> Result<Option<CurrentPointer>> {
    let path = current_pointer_path(scoring_dir);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub(crate) fn write_current_pointer(scoring_dir: &Path, pointer: &CurrentPointer) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(pointer)?;
    write_atomic(&current_pointer_path(scoring_dir), &bytes)
}
