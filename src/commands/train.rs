//! Train command implementation

use crate::cli::types::Season;
use crate::config::GamedayConfig;
use crate::cutoff;
use crate::error::{GamedayError, Result};
use crate::model::ModelStore;
use crate::scoring::ScoringTable;
use crate::storage::Database;
use log::info;

pub fn handle_train(
    config: &GamedayConfig,
    scoring: String,
    seasons: Vec<Season>,
    position_features: bool,
) -> Result<()> {
    let db = Database::open(&config.db_path)?;
    let table = ScoringTable::load(&db)?;
    let rules = table.get(&scoring)?;
    let store = ModelStore::new(&config.model_dir);

    let seasons = if seasons.is_empty() {
        let latest = db
            .latest_completed_game(None)?
            .ok_or(GamedayError::NotReady {
                season: 0,
                week: 0,
            })?;
        cutoff::training_seasons(&db, latest.0)
    } else {
        seasons
    };
    info!(
        "training {} on seasons {:?}",
        rules.name,
        seasons.iter().map(|s| s.as_u16()).collect::<Vec<_>>()
    );

    let artifact = store.train(&db, rules, &seasons, None, position_features)?;
    let path = store.publish_current(&db, &artifact)?;

    println!("Published {} artifact to {}", rules.name, path.display());
    for (position, model) in &artifact.players {
        println!(
            "  {position}: {} ({} rows, holdout MAE {:.2})",
            model.selected.label(),
            model.training_rows,
            model.holdout_mae
        );
    }
    match &artifact.dst {
        Some(model) => println!(
            "  DST: {} ({} rows, holdout MAE {:.2})",
            model.selected.label(),
            model.training_rows,
            model.holdout_mae
        ),
        None => println!("  DST: skipped (insufficient rows)"),
    }
    Ok(())
}
