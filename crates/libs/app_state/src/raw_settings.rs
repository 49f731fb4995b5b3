use serde::Deserialize;
use std::path::PathBuf;

/// Settings as they appear in `config/settings.yaml` and `APP__*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub logging: LoggingSettings,
    pub api: RawApiSettings,
    pub index: RawIndexSettings,
    pub model: RawModelSettings,
    pub search: SearchSettings,
    pub secrets: SecretSettings,
    pub constants: RawConstants,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawApiSettings {
    pub host: String,
    pub port: u32,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Uploads are written here for the duration of a request.
    pub upload_folder: PathBuf,
    /// Accepted image extensions, compared case-insensitively.
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendKind {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawIndexSettings {
    pub backend: IndexBackendKind,
    /// Name of the collection (table) holding the embeddings.
    pub collection: String,
    pub dimensions: usize,
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawModelSettings {
    /// Base url of the face inference service.
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretSettings {
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawConstants {
    pub database: DatabaseConstants,
}

/// Database connection pool configuration. Durations are in seconds.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConstants {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: u64,
    pub idle_timeout: u64,
    pub acquire_timeout: u64,
}
