use std::str::FromStr;

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// An environment variable is set but could not be parsed into the expected type.
#[derive(Debug, Error)]
#[error("Invalid value for environment variable {name}: {value:?}")]
pub struct InvalidEnvVarError {
    pub name: String,
    pub value: String,
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Credentials (e.g. `APCA_API_KEY_ID`) go through this so the caller can
/// report exactly which variable is absent.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Reads an optional override. Unset or blank variables yield `Ok(None)`.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_override<T: FromStr>(name: &str) -> Result<Option<T>, InvalidEnvVarError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| InvalidEnvVarError {
                    name: name.to_string(),
                    value: raw,
                })
        }
        _ => Ok(None),
    }
}
