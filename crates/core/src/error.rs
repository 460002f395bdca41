//! Common error handling for the core crate

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures from configuration loading and session persistence
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO operation failed: {message}")]
    Io { message: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Stored session exists but cannot be read back
    #[error("Session store error: {message}")]
    Session { message: String },
}

impl CoreError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn session_error(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }
}
