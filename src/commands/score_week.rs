//! Score-week command implementation: realized fantasy rankings for a
//! completed week.

use crate::cli::types::{PlayerId, Position, Season, TeamId, Week};
use crate::config::GamedayConfig;
use crate::error::Result;
use crate::scoring::{self, ScoringTable};
use crate::storage::Database;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct ScoreWeekParams {
    pub season: Season,
    pub week: Week,
    pub scoring: String,
    pub position: Option<Position>,
    pub dst: bool,
    pub limit: usize,
    pub as_json: bool,
}

/// One player's realized line for the week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyRanking {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: Position,
    pub team: Option<TeamId>,
    pub fantasy_points: f64,
}

/// One defense's realized line for the week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstWeeklyRanking {
    pub team_id: TeamId,
    pub team_name: String,
    pub fantasy_points: f64,
    pub points_allowed: f64,
    pub sacks: f64,
    pub turnovers: f64,
}

pub fn handle_score_week(config: &GamedayConfig, params: ScoreWeekParams) -> Result<()> {
    let db = Database::open(&config.db_path)?;
    let table = ScoringTable::load(&db)?;
    let rules = table.get(&params.scoring)?;

    if params.dst {
        let mut rankings = Vec::new();
        for row in db.week_defense_rows(params.season, params.week)? {
            let points = scoring::score_dst(&row, rules);
            rankings.push(DstWeeklyRanking {
                team_name: db.team_name(&row.team_id)?,
                team_id: row.team_id.clone(),
                fantasy_points: points.total,
                points_allowed: row.points_allowed.unwrap_or(0.0),
                sacks: row.sacks.unwrap_or(0.0),
                turnovers: row.interceptions.unwrap_or(0.0)
                    + row.fumbles_recovered.unwrap_or(0.0),
            });
        }
        rankings.sort_by(|a, b| {
            b.fantasy_points
                .partial_cmp(&a.fantasy_points)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rankings.truncate(params.limit);

        if params.as_json {
            println!("{}", serde_json::to_string_pretty(&rankings)?);
        } else {
            println!(
                "DST rankings, {} week {} ({})",
                params.season, params.week, rules.name
            );
            println!(
                "{:<6} {:<24} {:>7} {:>8} {:>6} {:>5}",
                "Team", "Name", "Points", "Allowed", "Sacks", "TO"
            );
            for r in &rankings {
                println!(
                    "{:<6} {:<24} {:>7.2} {:>8.0} {:>6.0} {:>5.0}",
                    r.team_id, r.team_name, r.fantasy_points, r.points_allowed, r.sacks,
                    r.turnovers
                );
            }
        }
        return Ok(());
    }

    let rankings = {
        let rows = db.week_stat_rows(params.season, params.week)?;
        let ids: Vec<PlayerId> = rows.iter().map(|r| r.stats.player_id.clone()).collect();
        let names = db.player_names(&ids)?;
        let mut rankings: Vec<WeeklyRanking> = rows
            .into_iter()
            .filter(|r| {
                params
                    .position
                    .map(|position| r.position == position)
                    .unwrap_or(true)
            })
            .map(|r| WeeklyRanking {
                player_name: names
                    .get(&r.stats.player_id)
                    .cloned()
                    .unwrap_or_else(|| r.stats.player_id.to_string()),
                player_id: r.stats.player_id.clone(),
                position: r.position,
                team: r.stats.team_id.clone(),
                fantasy_points: scoring::score_player(&r.stats, rules).total,
            })
            .collect();
        rankings.sort_by(|a, b| {
            b.fantasy_points
                .partial_cmp(&a.fantasy_points)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rankings.truncate(params.limit);
        rankings
    };

    if params.as_json {
        println!("{}", serde_json::to_string_pretty(&rankings)?);
    } else {
        println!(
            "Weekly rankings, {} week {} ({})",
            params.season, params.week, rules.name
        );
        println!(
            "{:<26} {:<5} {:<6} {:>7}",
            "Player", "Pos", "Team", "Points"
        );
        for r in &rankings {
            println!(
                "{:<26} {:<5} {:<6} {:>7.2}",
                r.player_name.chars().take(26).collect::<String>(),
                r.position,
                r.team
                    .as_ref()
                    .map(|t| t.as_str())
                    .unwrap_or("--"),
                r.fantasy_points
            );
        }
    }
    Ok(())
}
