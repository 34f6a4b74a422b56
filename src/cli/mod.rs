//! Command-line interface: argument definitions and shared argument types.

pub mod args;
pub mod types;

pub use args::{Commands, Gameday};
