//! Command handler implementations.

pub mod gameday;
pub mod score_week;
pub mod train;
pub mod week_status;
