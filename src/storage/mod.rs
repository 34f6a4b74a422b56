//! SQLite-backed stat store: schema, row models, and query operations.

pub mod ingest;
pub mod models;
pub mod queries;
pub mod schema;

#[cfg(test)]
mod tests;

pub use models::*;
pub use schema::Database;
