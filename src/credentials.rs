use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Credentials file structure
///
/// Format:
/// ```toml
/// [postgres.profile_name]
/// password = "your_postgres_password_here"
///
/// [object_store.profile_name]
/// password = "your_secret_key_here"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Credentials {
    #[serde(default)]
    pub postgres: HashMap<String, CredentialProfile>,
    #[serde(default)]
    pub object_store: HashMap<String, CredentialProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialProfile {
    pub password: String,
}

/// Credential type for looking up secrets
#[derive(Debug, Clone, Copy)]
pub enum CredentialType {
    Postgres,
    ObjectStore,
}

/// Credentials path: $TRACKMUS_CREDENTIALS, else ~/.config/trackmus/credentials.toml
pub fn get_credentials_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TRACKMUS_CREDENTIALS") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME")
        .map_err(|_| AppError::Config("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("trackmus")
        .join("credentials.toml"))
}

/// Load credentials from `path`
/// Returns None if the file doesn't exist
pub fn load_credentials_from(path: &Path) -> Result<Option<Credentials>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read credentials file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let credentials: Credentials = toml::from_str(&content).map_err(|e| {
        AppError::Config(format!(
            "Failed to parse credentials file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(Some(credentials))
}

/// Load credentials from the default location
pub fn load_credentials() -> Result<Option<Credentials>> {
    load_credentials_from(&get_credentials_path()?)
}

/// Get password for a specific profile and credential type
pub fn get_password(
    credentials: &Option<Credentials>,
    cred_type: CredentialType,
    profile: &str,
) -> Result<String> {
    let section_name = match cred_type {
        CredentialType::Postgres => "postgres",
        CredentialType::ObjectStore => "object_store",
    };

    match credentials {
        Some(creds) => {
            let profiles = match cred_type {
                CredentialType::Postgres => &creds.postgres,
                CredentialType::ObjectStore => &creds.object_store,
            };
            profiles
                .get(profile)
                .map(|p| p.password.clone())
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "Credential profile '[{}.{}]' not found in credentials file",
                        section_name, profile
                    ))
                })
        }
        None => Err(AppError::Config(
            "Credentials file not found. Set TRACKMUS_CREDENTIALS or create ~/.config/trackmus/credentials.toml"
                .to_string(),
        )),
    }
}
