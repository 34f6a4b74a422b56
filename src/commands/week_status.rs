//! Week-status command implementation

use crate::cli::types::{Season, Week};
use crate::config::GamedayConfig;
use crate::cutoff;
use crate::error::Result;
use crate::storage::Database;

pub fn handle_week_status(
    config: &GamedayConfig,
    season: Season,
    week: Week,
    as_json: bool,
) -> Result<()> {
    let db = Database::open(&config.db_path)?;
    let status = cutoff::week_ready(&db, season, week);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "{} week {}: {}",
        season,
        week,
        if status.ready { "READY" } else { "NOT READY" }
    );
    println!(
        "  games={} scored={} dst_rows={} synthetic_ids={}",
        status.counts.games,
        status.counts.scored_games,
        status.counts.dst_rows,
        status.counts.synthetic_ids
    );
    if !status.ready {
        match cutoff::latest_ready_before(&db, season, week) {
            Some((s, w)) => println!("  latest ready week before this one: {s} week {w}"),
            None => println!("  no ready week exists before this one"),
        }
    }
    Ok(())
}
