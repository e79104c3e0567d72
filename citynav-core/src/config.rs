//! Startup configuration checks for wiring real collaborators.

use thiserror::Error;

/// Environment variable naming the maps-platform API key used by real
/// directions and rendering collaborators. The synthetic tester stack
/// does not need it.
pub const MAPS_API_KEY_VAR: &str = "CITYNAV_MAPS_API_KEY";

/// Missing or empty required configuration. Fatal at wiring time, never
/// per-session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required credential {0} is not set")]
    MissingCredential(&'static str),
}

/// Read and trim a required credential from the environment.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] when the variable is unset
/// or blank.
pub fn require_credential(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingCredential(var)),
    }
}
