//! Configuration loader.
//!
//! Loads configuration from an optional `.env` file followed by environment
//! variables, with the consulting-type list read from a JSON file named by
//! `COUNSEL_CONSULTING_TYPES_FILE`. Values from the `.env` file take
//! precedence over the process environment, which keeps local development
//! overrides out of the system environment.

use std::env;
use std::path::{Path, PathBuf};

use counsel_domain::ports::ChatCredential;

use super::dto::{ChatBackendSettings, ConsultingTypeSettings, SettingsSnapshot};
use super::error::{ConfigError, Result};
use super::validator::validate_settings;

/// Environment variable names recognized by the loader.
pub mod vars {
    pub const CHAT_BASE_URL: &str = "COUNSEL_CHAT_BASE_URL";
    pub const CHAT_SYSTEM_USER_ID: &str = "COUNSEL_CHAT_SYSTEM_USER_ID";
    pub const CHAT_SYSTEM_USERNAME: &str = "COUNSEL_CHAT_SYSTEM_USERNAME";
    pub const CHAT_SYSTEM_PASSWORD: &str = "COUNSEL_CHAT_SYSTEM_PASSWORD";
    pub const CHAT_TECHNICAL_USER_ID: &str = "COUNSEL_CHAT_TECHNICAL_USER_ID";
    pub const CHAT_TECHNICAL_USERNAME: &str = "COUNSEL_CHAT_TECHNICAL_USERNAME";
    pub const CHAT_TECHNICAL_PASSWORD: &str = "COUNSEL_CHAT_TECHNICAL_PASSWORD";
    pub const PLACEHOLDER_EMAIL_DOMAIN: &str = "COUNSEL_PLACEHOLDER_EMAIL_DOMAIN";
    pub const CONSULTING_TYPES_FILE: &str = "COUNSEL_CONSULTING_TYPES_FILE";
}

/// Configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Optional path to .env file
    env_file_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new loader. When `env_file_path` is given, the file is
    /// loaded (overriding the process environment) before any variable is
    /// read.
    pub fn new(env_file_path: Option<PathBuf>) -> Self {
        Self { env_file_path }
    }

    /// Load and validate the settings snapshot.
    pub fn load(&self) -> Result<SettingsSnapshot> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let snapshot = SettingsSnapshot {
            chat: ChatBackendSettings {
                base_url: required(vars::CHAT_BASE_URL)?,
                system: ChatCredential {
                    user_id: required(vars::CHAT_SYSTEM_USER_ID)?.as_str().into(),
                    username: required(vars::CHAT_SYSTEM_USERNAME)?,
                    password: required(vars::CHAT_SYSTEM_PASSWORD)?,
                },
                technical: ChatCredential {
                    user_id: required(vars::CHAT_TECHNICAL_USER_ID)?.as_str().into(),
                    username: required(vars::CHAT_TECHNICAL_USERNAME)?,
                    password: required(vars::CHAT_TECHNICAL_PASSWORD)?,
                },
            },
            placeholder_email_domain: required(vars::PLACEHOLDER_EMAIL_DOMAIN)?,
            consulting_types: self.load_consulting_types()?,
        };

        validate_settings(&snapshot)?;
        Ok(snapshot)
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        dotenvy::from_path_override(path).map_err(|source| ConfigError::EnvFileLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    fn load_consulting_types(&self) -> Result<Vec<ConsultingTypeSettings>> {
        let path = PathBuf::from(required(vars::CONSULTING_TYPES_FILE)?);
        let raw = std::fs::read_to_string(&path).map_err(|source| {
            ConfigError::ConsultingTypesRead {
                path: path.clone(),
                source,
            }
        })?;
        serde_json::from_str(&raw)
            .map_err(|source| ConfigError::ConsultingTypesParse { path, source })
    }
}

fn required(var: &str) -> Result<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingRequired {
            var: var.to_string(),
        }),
    }
}
