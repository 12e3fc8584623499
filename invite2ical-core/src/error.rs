//! Error types for invite2ical.

use thiserror::Error;

/// Errors that can occur while loading configuration or handling calendars.
#[derive(Error, Debug)]
pub enum InviteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Calendar holds more than one event with UID '{0}'")]
    DuplicateUid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for invite2ical operations.
pub type InviteResult<T> = Result<T, InviteError>;
