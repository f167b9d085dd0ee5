//! Configuration loader
//!
//! Environment-aware TOML loading: a base `courier.toml`, an optional
//! `courier.{environment}.toml` overlay, then `COURIER__SECTION__KEY`
//! environment-variable overrides. Missing files fall back to defaults so a
//! bare process still starts against localhost.

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::debug;

use super::{ConfigurationError, CourierConfig};

/// Loaded configuration plus the environment it was resolved for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: CourierConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Self, ConfigurationError> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(&Self::default_config_directory(), &environment)
    }

    /// Load from a specific directory with an explicit environment.
    ///
    /// Used by tests to avoid mutating process-global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: &Path,
        environment: &str,
    ) -> Result<Self, ConfigurationError> {
        debug!(
            environment = %environment,
            directory = %config_dir.display(),
            "Loading configuration"
        );

        let base = config_dir.join("courier.toml");
        let overlay = config_dir.join(format!("courier.{environment}.toml"));

        let config: CourierConfig = Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overlay).required(false))
            .add_source(Environment::with_prefix("COURIER").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(Self {
            config,
            environment: environment.to_string(),
        })
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    fn detect_environment() -> String {
        env::var("COURIER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn default_config_directory() -> PathBuf {
        env::var("COURIER_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
