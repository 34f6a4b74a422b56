//! Model lifecycle: training, persistence, selection, and serving.

pub mod artifact;
pub mod regress;
mod training;


pub use artifact::{
    load_artifact, save_artifact, ArtifactMetadata, CurrentPointer, FeatureSchema, ModelArtifact,
    PositionModel, DST_PREDICTION_RANGE, SCHEMA_VERSION,
};
pub use regress::{CandidateKind, Regressor, StandardScaler};

use crate::cli::types::{Season, Week};
use crate::cutoff;
use crate::error::{GamedayError, Result};
use crate::scoring::{slugify, ScoringRules};
use crate::storage::Database;
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Identity of a cutoff artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CutoffKey {
    pub ruleset_slug: String,
    pub season: Season,
    pub week: Week,
}

/// Trains, persists, loads, and serves model artifacts.
///
/// Artifacts are immutable once published and shared by reference across
/// concurrent predictions. Training is serialized per ruleset, and
/// cutoff training is singleflighted per (ruleset, season, week) so
/// concurrent requests share one pass.
pub struct ModelStore {
    base_dir: PathBuf,
    current: Mutex<HashMap<String, Arc<ModelArtifact>>>,
    cutoffs: Mutex<HashMap<CutoffKey, Arc<ModelArtifact>>>,
    train_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    cutoff_locks: Mutex<HashMap<CutoffKey, Arc<Mutex<()>>>>,
}

impl ModelStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ModelStore {
            base_dir: base_dir.into(),
            current: Mutex::new(HashMap::new()),
            cutoffs: Mutex::new(HashMap::new()),
            train_locks: Mutex::new(HashMap::new()),
            cutoff_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn scoring_dir(&self, slug: &str) -> PathBuf {
        self.base_dir.join(slug)
    }

    /// `<base>/<slug>/<slug>_<season>_wk<week>.bin`
    pub fn cutoff_path(&self, ruleset: &str, season: Season, week: Week) -> PathBuf {
        let slug = slugify(ruleset);
        self.scoring_dir(&slug)
            .join(format!("{slug}_{season}_wk{week}.bin"))
    }

    /// Pre-pointer layout kept for backward compatibility on load.
    fn legacy_path(&self, slug: &str) -> PathBuf {
        self.base_dir.join(format!("{slug}.bin"))
    }

    fn train_lock(&self, slug: &str) -> Arc<Mutex<()>> {
        self.train_locks
            .lock()
            .unwrap()
            .entry(slug.to_string())
            .or_default()
            .clone()
    }

    fn cutoff_lock(&self, key: &CutoffKey) -> Arc<Mutex<()>> {
        self.cutoff_locks
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Train a fresh artifact. Only one training runs per ruleset at a
    /// time.
    pub fn train(
        &self,
        db: &Database,
        rules: &ScoringRules,
        seasons: &[Season],
        cutoff: Option<(Season, Week)>,
        with_position_features: bool,
    ) -> Result<ModelArtifact> {
        let slug = rules.slug();
        let lock = self.train_lock(&slug);
        let _guard = lock.lock().unwrap();
        let trained_through = match cutoff {
            Some((season, week)) => cutoff::latest_ready_before(db, season, week),
            None => db.latest_completed_game(Some(seasons))?,
        };
        training::train_artifact(db, rules, seasons, cutoff, trained_through, with_position_features)
    }

    /// Persist a non-cutoff artifact under its versioned name and swap
    /// the CURRENT pointer to it.
    pub fn publish_current(&self, db: &Database, artifact: &ModelArtifact) -> Result<PathBuf> {
        let slug = slugify(&artifact.metadata.ruleset);
        let seasons: Vec<Season> = artifact
            .metadata
            .seasons_used
            .iter()
            .map(|&s| Season::new(s))
            .collect();
        let (tag_season, tag_week) = db
            .latest_completed_game(Some(seasons.as_slice()))?
            .or(db.latest_completed_game(None)?)
            .unwrap_or((
                seasons.last().copied().unwrap_or(Season::new(0)),
                Week::new(1),
            ));

        let dir = self.scoring_dir(&slug);
        let file = format!("{slug}_{tag_season}_wk{tag_week}.bin");
        let path = dir.join(&file);
        save_artifact(artifact, &path)?;
        artifact::write_current_pointer(
            &dir,
            &CurrentPointer {
                file,
                metadata: artifact.metadata.clone(),
            },
        )?;
        info!("published {} artifact at {}", artifact.metadata.ruleset, path.display());

        self.current
            .lock()
            .unwrap()
            .insert(slug, Arc::new(artifact.clone()));
        Ok(path)
    }

    /// The newest non-cutoff artifact for a ruleset: memoized, else the
    /// CURRENT pointer, else the newest blob in the scoring directory,
    /// else the legacy flat path.
    pub fn current(&self, ruleset: &str) -> Result<Arc<ModelArtifact>> {
        let slug = slugify(ruleset);
        if let Some(artifact) = self.current.lock().unwrap().get(&slug) {
            return Ok(artifact.clone());
        }

        let dir = self.scoring_dir(&slug);
        let mut candidate: Option<PathBuf> = None;
        match artifact::read_current_pointer(&dir) {
            Ok(Some(pointer)) => {
                let path = dir.join(&pointer.file);
                if path.exists() {
                    candidate = Some(path);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("CURRENT.json read error for {ruleset}: {e}"),
        }
        if candidate.is_none() && dir.exists() {
            let mut blobs: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.extension().map(|e| e == "bin").unwrap_or(false))
                .collect();
            blobs.sort();
            candidate = blobs.pop();
        }
        if candidate.is_none() {
            let legacy = self.legacy_path(&slug);
            if legacy.exists() {
                candidate = Some(legacy);
            }
        }

        let path = candidate.ok_or_else(|| GamedayError::NoModel {
            ruleset: ruleset.to_string(),
        })?;
        info!("loading saved artifact for {ruleset} from {}", path.display());
        let artifact = Arc::new(load_artifact(&path)?);
        self.current.lock().unwrap().insert(slug, artifact.clone());
        Ok(artifact)
    }

    /// Resident cutoff artifact for (ruleset, season, week): load it if
    /// persisted, otherwise train with the cutoff and publish. Concurrent
    /// callers for the same key coalesce onto one training pass.
    pub fn ensure_cutoff(
        &self,
        db: &Database,
        rules: &ScoringRules,
        season: Season,
        week: Week,
        with_position_features: bool,
    ) -> Result<Arc<ModelArtifact>> {
        let key = CutoffKey {
            ruleset_slug: rules.slug(),
            season,
            week,
        };
        let lock = self.cutoff_lock(&key);
        let _guard = lock.lock().unwrap();

        if let Some(artifact) = self.cutoffs.lock().unwrap().get(&key) {
            return Ok(artifact.clone());
        }

        let path = self.cutoff_path(&rules.name, season, week);
        if path.exists() {
            info!("loading cutoff artifact {}", path.display());
            let artifact = Arc::new(load_artifact(&path)?);
            self.cutoffs.lock().unwrap().insert(key, artifact.clone());
            return Ok(artifact);
        }

        if cutoff::latest_ready_before(db, season, week).is_none() {
            return Err(GamedayError::NotReady {
                season: season.as_u16(),
                week: week.as_u16(),
            });
        }

        let seasons = cutoff::training_seasons(db, season);
        info!(
            "training cutoff artifact for {} before {season} W{week} (seasons {:?})",
            rules.name,
            seasons.iter().map(|s| s.as_u16()).collect::<Vec<_>>()
        );
        let artifact = self.train(db, rules, &seasons, Some((season, week)), with_position_features)?;
        save_artifact(&artifact, &path)?;

        let artifact = Arc::new(artifact);
        self.cutoffs.lock().unwrap().insert(key, artifact.clone());
        Ok(artifact)
    }

    /// Forget a cached cutoff artifact, e.g. after re-ingesting a week
    /// that had already been marked ready.
    pub fn invalidate_cutoff(&self, ruleset: &str, season: Season, week: Week) {
        let key = CutoffKey {
            ruleset_slug: slugify(ruleset),
            season,
            week,
        };
        self.cutoffs.lock().unwrap().remove(&key);
    }
}
