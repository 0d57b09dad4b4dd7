//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading or validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration variable is missing
    #[error("Missing required configuration: {var}")]
    MissingRequired { var: String },

    /// A configuration variable has an invalid value
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    /// Failed to load .env file
    #[error("Failed to load .env file from {path}: {source}")]
    EnvFileLoad {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Failed to read the consulting-types file
    #[error("Failed to read consulting types from {path}: {source}")]
    ConsultingTypesRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the consulting-types file
    #[error("Failed to parse consulting types from {path}: {source}")]
    ConsultingTypesParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_display() {
        let err = ConfigError::MissingRequired {
            var: "COUNSEL_CHAT_BASE_URL".to_string(),
        };
        assert!(err.to_string().contains("COUNSEL_CHAT_BASE_URL"));
        assert!(err.to_string().contains("Missing required"));
    }

    #[test]
    fn validation_display() {
        let err = ConfigError::Validation("at least one consulting type required".to_string());
        assert!(err.to_string().contains("at least one consulting type"));
    }
}
