//! Gameday command implementation

use crate::cli::types::{Season, Week};
use crate::config::GamedayConfig;
use crate::error::Result;
use crate::gameday::{GamedayPredictor, GamedayRequest, GamedayResult};
use crate::lineup::ComposedLineup;
use crate::model::ModelStore;
use crate::scoring::ScoringTable;
use crate::storage::Database;

/// Options for the gameday command.
#[derive(Debug)]
pub struct GamedayParams {
    pub season: Season,
    pub week: Week,
    pub scoring: String,
    pub no_injuries: bool,
    pub salary_cap: Option<f64>,
    pub position_features: bool,
    pub as_json: bool,
}

pub fn handle_gameday(config: &GamedayConfig, params: GamedayParams) -> Result<()> {
    let db = Database::open(&config.db_path)?;
    let scoring = ScoringTable::load(&db)?;
    let store = ModelStore::new(&config.model_dir);
    let engine = GamedayPredictor::new(&db, scoring, store);

    let mut request = GamedayRequest::new(params.season, params.week, params.scoring);
    request.include_injury_adjustments = !params.no_injuries;
    request.salary_cap = params.salary_cap;
    request.with_position_features = params.position_features;

    let result = engine.gameday_predictions(&request)?;

    if params.as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &GamedayResult) {
    println!(
        "Gameday predictions for {} week {} ({})",
        result.season, result.week, result.ruleset
    );
    if let Some(report) = &result.injury_report {
        println!(
            "Injury report: {} OUT, {} questionable",
            report.total_out, report.total_questionable
        );
        if !report.high_impact_teams.is_empty() {
            let teams: Vec<&str> = report
                .high_impact_teams
                .iter()
                .map(|t| t.as_str())
                .collect();
            println!("High-impact teams: {}", teams.join(", "));
        }
    }
    println!();

    println!(
        "{:<26} {:<5} {:<5} {:>8} {:>8}",
        "Player", "Pos", "Team", "Points", "Adj"
    );
    for prediction in &result.player_predictions {
        let adj = prediction
            .injury_adjustment
            .map(|s| format!("-{:.0}%", s * 100.0))
            .unwrap_or_else(|| "--".to_string());
        println!(
            "{:<26} {:<5} {:<5} {:>8.2} {:>8}",
            prediction.player_name.chars().take(26).collect::<String>(),
            prediction.position,
            prediction.team_id,
            prediction.predicted_points,
            adj
        );
    }

    println!();
    print_lineup(&result.optimal_lineup);

    if !result.dst_predictions.is_empty() {
        println!();
        println!(
            "{:<6} {:<6} {:>8} {:>7} {:>9}",
            "DST", "Opp", "Base", "Boost", "Adjusted"
        );
        for dst in &result.dst_predictions {
            println!(
                "{:<6} {:<6} {:>8.2} {:>6.0}% {:>9.2}",
                dst.team_id,
                dst.opponent,
                dst.base_prediction,
                dst.injury_boost * 100.0,
                dst.adjusted_prediction
            );
        }
    }

    println!();
    println!(
        "Analyzed {} players, average {:.2}, top {:.2}, optimal lineup {:.2}",
        result.summary.total_players_analyzed,
        result.summary.average_projection,
        result.summary.top_projection,
        result.summary.optimal_lineup_projection
    );
}

fn print_lineup(lineup: &ComposedLineup) {
    println!("Optimal lineup ({:.2} projected):", lineup.total_projected);
    for (slot, picks) in &lineup.slots {
        for pick in picks {
            println!(
                "  {:<5} {:<26} {:<5} {:>7.2}",
                slot,
                pick.name.chars().take(26).collect::<String>(),
                pick.team,
                pick.projected_points
            );
        }
    }
    for (slot, missing) in &lineup.unfilled {
        println!("  {slot:<5} ({missing} slot(s) unfilled)");
    }
    if let Some(salary) = lineup.total_salary {
        println!("  Salary used: {salary:.0}");
    }
}
