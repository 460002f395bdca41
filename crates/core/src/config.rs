//! Client configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `PAYDASH__`-prefixed environment variables (`PAYDASH__API__BASE_URL`).

use crate::error::CoreResult;
use crate::validation::{ValidateConfig, validators};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaydashConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// REST backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Path of the token refresh endpoint
    pub refresh_path: String,
}

/// Session persistence settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session file; defaults to `<data_dir>/session.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
            user_agent: concat!("paydash-client/", env!("CARGO_PKG_VERSION")).to_string(),
            refresh_path: "/auth/refresh".to_string(),
        }
    }
}

impl PaydashConfig {
    /// Load configuration, reading `path` if it exists
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut builder = Config::builder();

        // Start with defaults
        builder = builder.add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(false));
        }

        // Environment variables override file settings
        builder = builder.add_source(
            Environment::with_prefix("PAYDASH")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file that must exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unparsable or invalid
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_toml(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ValidateConfig for PaydashConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validators::validate_not_empty(&self.api.base_url, "api.base_url")?;
        validators::validate_http_url(&self.api.base_url, "api.base_url")?;
        validators::validate_range(self.api.timeout_secs, 1, 3600, "api.timeout_secs")?;
        validators::validate_not_empty(&self.api.user_agent, "api.user_agent")?;
        if !self.api.refresh_path.starts_with('/') {
            return Err(ConfigError::Message(
                "api.refresh_path: must start with '/'".to_string(),
            ));
        }
        Ok(())
    }
}
