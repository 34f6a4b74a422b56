//! Entry point: parse CLI and dispatch to command handlers.

use clap::Parser;
use nfl_gameday::{
    cli::{Commands, Gameday},
    commands::{
        gameday::{handle_gameday, GamedayParams},
        score_week::{handle_score_week, ScoreWeekParams},
        train::handle_train,
        week_status::handle_week_status,
    },
    GamedayConfig, Result,
};

fn main() -> Result<()> {
    env_logger::init();
    let app = Gameday::parse();
    let config = GamedayConfig::from_env();

    match app.command {
        Commands::Gameday {
            season,
            week,
            scoring,
            no_injuries,
            salary_cap,
            position_features,
            json,
        } => handle_gameday(
            &config,
            GamedayParams {
                season,
                week,
                scoring,
                no_injuries,
                salary_cap,
                position_features,
                as_json: json,
            },
        )?,

        Commands::Train {
            scoring,
            seasons,
            position_features,
        } => handle_train(&config, scoring, seasons, position_features)?,

        Commands::ScoreWeek {
            season,
            week,
            scoring,
            position,
            dst,
            limit,
            json,
        } => handle_score_week(
            &config,
            ScoreWeekParams {
                season,
                week,
                scoring,
                position,
                dst,
                limit,
                as_json: json,
            },
        )?,

        Commands::WeekStatus { season, week, json } => {
            handle_week_status(&config, season, week, json)?
        }
    }

    Ok(())
}
