//! CLI argument definitions and parsing structures.

use super::types::{Position, Season, Week};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "nfl-gameday", about = "NFL fantasy projection and lineup engine")]
pub struct Gameday {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Full gameday run: projections, injury adjustments, DST boosts,
    /// and an optimal lineup for one week.
    Gameday {
        /// Season year (e.g. 2024).
        #[clap(long, short)]
        season: Season,

        /// Week to project (1-18).
        #[clap(long, short)]
        week: Week,

        /// Scoring ruleset name (e.g. FanDuel, DraftKings, PPR).
        #[clap(long, default_value = "FanDuel")]
        scoring: String,

        /// Skip injury filtering/adjustment entirely.
        #[clap(long)]
        no_injuries: bool,

        /// Compose a salary-capped DFS lineup (adds FLEX and DST slots).
        #[clap(long)]
        salary_cap: Option<f64>,

        /// Use artifacts carrying position-specific matchup features.
        #[clap(long)]
        position_features: bool,

        /// Output results as JSON instead of text.
        #[clap(long)]
        json: bool,
    },

    /// Train models for a scoring ruleset and publish them as CURRENT.
    Train {
        /// Scoring ruleset name.
        #[clap(long, default_value = "FanDuel")]
        scoring: String,

        /// Seasons to train on (repeatable): `--seasons 2022 --seasons 2023`.
        /// Defaults to the standard training window behind the latest
        /// completed season.
        #[clap(long)]
        seasons: Vec<Season>,

        /// Include position-specific matchup features in the schema.
        #[clap(long)]
        position_features: bool,
    },

    /// Rank realized fantasy scores for one completed week.
    ScoreWeek {
        /// Season year.
        #[clap(long, short)]
        season: Season,

        /// Week to rank.
        #[clap(long, short)]
        week: Week,

        /// Scoring ruleset name.
        #[clap(long, default_value = "FanDuel")]
        scoring: String,

        /// Restrict to one position.
        #[clap(short = 'p', long = "position", value_parser = clap::value_parser!(Position))]
        position: Option<Position>,

        /// Rank team defenses instead of players.
        #[clap(long)]
        dst: bool,

        /// Maximum rows printed.
        #[clap(long, default_value_t = 50)]
        limit: usize,

        /// Output results as JSON instead of text.
        #[clap(long)]
        json: bool,
    },

    /// Report whether a week is fully ingested and safe to train on.
    WeekStatus {
        /// Season year.
        #[clap(long, short)]
        season: Season,

        /// Week to check.
        #[clap(long, short)]
        week: Week,

        /// Output results as JSON instead of text.
        #[clap(long)]
        json: bool,
    },
}
