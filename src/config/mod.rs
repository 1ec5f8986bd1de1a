//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `PILLAR_CONVERSATIONS` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use pillar_conversations::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Collection topic: {}", config.client.collection_destination);
//! ```

mod client;
mod error;
mod logging;

pub use client::ClientSettings;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Client addressing, contributors and timeouts
    pub client: ClientSettings,

    /// Log format and filter
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PILLAR_CONVERSATIONS` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Splits `client.contributors` on commas
    ///
    /// # Environment Variable Format
    ///
    /// - `PILLAR_CONVERSATIONS__CLIENT__COLLECTION_ID=books` -> `client.collection_id = "books"`
    /// - `PILLAR_CONVERSATIONS__CLIENT__CONTRIBUTORS=p1,p2` -> `client.contributors = ["p1", "p2"]`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PILLAR_CONVERSATIONS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("client.contributors")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.client.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
