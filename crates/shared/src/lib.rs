//! Shared configuration and telemetry for the counseling platform saga
//! core.

pub mod config;
pub mod telemetry;

pub use config::{ConfigError, ConfigLoader, SettingsSnapshot};
