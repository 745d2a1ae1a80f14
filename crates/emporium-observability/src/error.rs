use thiserror::Error;

/// Errors raised while setting up observability.
#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// A log level name was not recognised.
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// The filter directives could not be parsed.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}
