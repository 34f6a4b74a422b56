//! DFS salary estimation heuristic.
//!
//! Salaries are an approximation derived from projected points; a real
//! salary feed can replace this module without touching the composer.

use crate::cli::types::Position;
use rand::rngs::StdRng;
use rand::Rng;

/// Estimated salary for a skill player from projection and position.
/// Jitter comes from the caller's seeded RNG so one request prices
/// deterministically.
pub fn estimate_salary(projected_points: f64, position: Position, rng: &mut StdRng) -> f64 {
    let multiplier = match position {
        Position::QB => 600.0,
        Position::RB | Position::WR => 700.0,
        Position::TE => 500.0,
        _ => 600.0,
    };
    let salary = projected_points * multiplier + rng.gen_range(-500.0..500.0);

    let min_salary = match position {
        Position::QB => 4500.0,
        Position::RB | Position::WR => 4000.0,
        Position::TE => 3500.0,
        _ => 4000.0,
    };
    let max_salary = match position {
        Position::QB => 9000.0,
        Position::RB => 10_000.0,
        Position::WR => 9500.0,
        Position::TE => 7500.0,
        _ => 8000.0,
    };
    salary.clamp(min_salary, max_salary)
}

/// Estimated salary for a DST; a much flatter scale than skill players.
pub fn estimate_dst_salary(projected_points: f64, rng: &mut StdRng) -> f64 {
    let salary = projected_points * 250.0 + rng.gen_range(-200.0..200.0);
    salary.clamp(2000.0, 6000.0)
}
