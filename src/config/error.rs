//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid identifier for {0}")]
    InvalidIdentifier(&'static str),

    #[error("No contributors configured")]
    NoContributors,

    #[error("Duplicate contributor: {0}")]
    DuplicateContributor(String),

    #[error("Timeout must be greater than zero: {0}")]
    ZeroTimeout(&'static str),

    #[error("Conversation timeout is shorter than the identification timeout")]
    ConversationTimeoutTooShort,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
