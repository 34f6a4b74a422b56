//! Error types for the gameday projection engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GamedayError>;

#[derive(Error, Debug)]
pub enum GamedayError {
    #[error("unknown scoring ruleset: {name}")]
    UnknownRuleset { name: String },

    #[error("invalid week {week} for season {season}")]
    BadWeek { season: u16, week: u16 },

    #[error("player not found: {id}")]
    PlayerNotFound { id: String },

    #[error("team not found: {id}")]
    TeamNotFound { id: String },

    #[error("no ready week available before season {season} week {week}")]
    NotReady { season: u16, week: u16 },

    #[error("model artifact schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    #[error("not enough history for {subject}: {games} prior games")]
    NotEnoughHistory { subject: String, games: usize },

    #[error("no model artifact available for ruleset {ruleset}")]
    NoModel { ruleset: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("artifact IO error: {0}")]
    ArtifactIo(#[from] std::io::Error),

    #[error("artifact encoding error: {0}")]
    ArtifactEncoding(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Coarse error taxonomy surfaced to callers (HTTP/CLI collaborators map
/// these onto status codes and exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    NotReady,
    SchemaMismatch,
    NotEnoughHistory,
    DataBackend,
    Internal,
}

impl GamedayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GamedayError::UnknownRuleset { .. } | GamedayError::BadWeek { .. } => {
                ErrorKind::BadInput
            }
            GamedayError::PlayerNotFound { .. } | GamedayError::TeamNotFound { .. } => {
                ErrorKind::NotFound
            }
            GamedayError::NotReady { .. } | GamedayError::NoModel { .. } => ErrorKind::NotReady,
            GamedayError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            GamedayError::NotEnoughHistory { .. } => ErrorKind::NotEnoughHistory,
            GamedayError::Database(_)
            | GamedayError::ArtifactIo(_)
            | GamedayError::ArtifactEncoding(_)
            | GamedayError::Json(_) => ErrorKind::DataBackend,
            GamedayError::DeadlineExceeded { .. } | GamedayError::Internal { .. } => {
                ErrorKind::Internal
            }
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GamedayError::Internal {
            message: message.into(),
        }
    }
}
