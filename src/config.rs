use serde::Deserialize;
use std::path::Path;

use crate::constants::{DEFAULT_AVATAR_BUCKET, DEFAULT_MEDIA_BUCKET, PRESIGNED_URL_TTL};
use crate::error::{AppError, Result};

fn default_port() -> u16 {
    8080
}

fn default_database() -> String {
    "trackmus".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_media_bucket() -> String {
    DEFAULT_MEDIA_BUCKET.to_string()
}

fn default_avatar_bucket() -> String {
    DEFAULT_AVATAR_BUCKET.to_string()
}

fn default_presign_ttl_secs() -> u64 {
    PRESIGNED_URL_TTL.as_secs()
}

fn default_cleanup_queue() -> usize {
    64
}

fn default_existence_check_concurrency() -> usize {
    8
}

/// API server configuration file structure
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// HTTP port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// PostgreSQL connection (maps to [postgres] section in TOML)
#[derive(Debug, Deserialize)]
pub struct PostgresConfig {
    /// Base URL without password or database (e.g., postgres://trackmus@localhost:5432)
    pub url: String,
    /// Database name (default: trackmus)
    #[serde(default = "default_database")]
    pub database: String,
    /// Credential profile name to look up the password from the credentials file
    pub credential_profile: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// S3-compatible object store (maps to [object_store] section in TOML)
#[derive(Debug, Deserialize)]
pub struct ObjectStoreConfig {
    /// Endpoint URL, scheme included (e.g., http://minio:9000)
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key: String,
    /// Credential profile name to look up the secret key from the credentials file
    pub credential_profile: String,
    #[serde(default = "default_media_bucket")]
    pub media_bucket: String,
    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,
    /// Lifetime of presigned URLs in seconds (default: 900)
    #[serde(default = "default_presign_ttl_secs")]
    pub presign_ttl_secs: u64,
}

/// Media reconciliation tuning (maps to [media] section in TOML)
#[derive(Debug, Deserialize)]
pub struct MediaConfig {
    /// Stat the uploaded object and compare its size before accepting a confirmation
    #[serde(default)]
    pub verify_upload_size: bool,
    /// Orphan batches waiting for the cleanup worker before new ones are dropped
    #[serde(default = "default_cleanup_queue")]
    pub cleanup_queue: usize,
    /// Concurrent existence checks while listing media
    #[serde(default = "default_existence_check_concurrency")]
    pub existence_check_concurrency: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            verify_upload_size: false,
            cleanup_queue: default_cleanup_queue(),
            existence_check_concurrency: default_existence_check_concurrency(),
        }
    }
}

impl ApiConfig {
    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            AppError::Config(msg) => {
                AppError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ApiConfig = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.object_store.media_bucket == self.object_store.avatar_bucket {
            return Err(AppError::Config(
                "media_bucket and avatar_bucket must differ".to_string(),
            ));
        }
        let ttl = self.object_store.presign_ttl_secs;
        if ttl == 0 || ttl > 7 * 24 * 60 * 60 {
            return Err(AppError::Config(format!(
                "presign_ttl_secs must be between 1 and 604800, got {}",
                ttl
            )));
        }
        if self.media.cleanup_queue == 0 {
            return Err(AppError::Config("cleanup_queue must be at least 1".to_string()));
        }
        if self.media.existence_check_concurrency == 0 {
            return Err(AppError::Config(
                "existence_check_concurrency must be at least 1".to_string(),
            ));
        }
        if self.postgres.max_connections == 0 {
            return Err(AppError::Config("max_connections must be at least 1".to_string()));
        }
        Ok(())
    }
}
