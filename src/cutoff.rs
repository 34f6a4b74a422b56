//! Training-window policy: which seasons to train on and whether a week
//! is fully ingested.

use crate::cli::types::{Season, Week};
use crate::storage::{Database, WeekReadinessCounts};
use log::warn;
use serde::{Deserialize, Serialize};

/// Seasons before this are never used for training.
const EARLIEST_TRAINING_SEASON: u16 = 2020;

/// Completed games required before the in-progress season joins the
/// training window.
const MIN_CURRENT_SEASON_GAMES: i64 = 8;

/// Verdict for "is (season, week) safe to train on".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekReadiness {
    pub season: Season,
    pub week: Week,
    pub ready: bool,
    #[serde(flatten)]
    pub counts: WeekReadinessCounts,
}

/// Seasons to use when training for `current_season`: the three prior
/// seasons, plus the current one once it has enough completed games.
/// Seasons before 2020 are filtered out.
pub fn training_seasons(db: &Database, current_season: Season) -> Vec<Season> {
    let year = current_season.as_u16();
    let mut seasons: Vec<Season> = (year.saturating_sub(3)..year).map(Season::new).collect();

    match db.completed_game_count(current_season) {
        Ok(completed) if completed >= MIN_CURRENT_SEASON_GAMES => {
            seasons.push(current_season);
        }
        Ok(_) => {}
        Err(e) => {
            warn!("completed-game count failed for {current_season}: {e}");
        }
    }

    seasons.retain(|s| s.as_u16() >= EARLIEST_TRAINING_SEASON);
    seasons
}

/// Check whether `(season, week)` is fully ingested: every game has both
/// scores, the defense table holds exactly two rows per game, and no
/// box-score row still carries a synthetic collector id. Idempotent until
/// the underlying data changes; DB errors report not-ready.
pub fn week_ready(db: &Database, season: Season, week: Week) -> WeekReadiness {
    let counts = match db.readiness_counts(season, week) {
        Ok(counts) => counts,
        Err(e) => {
            warn!("week readiness check failed for {season} W{week}: {e}");
            WeekReadinessCounts::default()
        }
    };
    let ready = counts.games > 0
        && counts.scored_games == counts.games
        && counts.dst_rows == counts.games * 2
        && counts.synthetic_ids == 0;
    WeekReadiness {
        season,
        week,
        ready,
        counts,
    }
}

/// The most recent ready week strictly before `(season, week)`: scan this
/// season backwards, then up to four prior seasons from week 18 down.
pub fn latest_ready_before(db: &Database, season: Season, week: Week) -> Option<(Season, Week)> {
    for w in (1..week.as_u16()).rev() {
        if week_ready(db, season, Week::new(w)).ready {
            return Some((season, Week::new(w)));
        }
    }
    let year = season.as_u16();
    for s in (year.saturating_sub(4)..year).rev() {
        if s < 2000 {
            break;
        }
        for w in (1..=Week::MAX).rev() {
            if week_ready(db, Season::new(s), Week::new(w)).ready {
                return Some((Season::new(s), Week::new(w)));
            }
        }
    }
    None
}
