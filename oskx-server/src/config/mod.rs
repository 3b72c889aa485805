//! Configuration module for oskx-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables.

pub mod file;

use crate::config::file::FileConfig;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file (a missing file yields the defaults)
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let mut config = if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            toml::from_str::<FileConfig>(&content)?
        } else {
            tracing::warn!(
                path = %self.config_path.display(),
                "config file not found, using defaults"
            );
            toml::from_str::<FileConfig>("")?
        };

        if let Some(listen) = self.listen_override {
            config.server.listen = listen;
        }

        self.validate(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        for user in &config.seed.users {
            if user.display_name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "seed user {} has an empty display name",
                    user.user_id
                )));
            }
            if user.points_balance < Decimal::ZERO {
                return Err(ConfigError::ValidationError(format!(
                    "seed user {} has a negative points balance",
                    user.user_id
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for user in &config.seed.users {
            if !seen.insert(user.user_id) {
                return Err(ConfigError::ValidationError(format!(
                    "seed user {} is listed twice",
                    user.user_id
                )));
            }
        }
        Ok(())
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
