//! Layered configuration: `.env` file → environment → validated snapshot.

mod dto;
mod error;
mod loader;
mod validator;

pub use dto::{ChatBackendSettings, ConsultingTypeSettings, SettingsSnapshot};
pub use error::{ConfigError, Result};
pub use loader::{vars, ConfigLoader};
pub use validator::validate_settings;
