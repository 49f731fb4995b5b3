use crate::{
    DatabaseConstants, IndexBackendKind, LoggingSettings, RawSettings, SearchSettings,
    SecretSettings,
};
use color_eyre::eyre::{Result, eyre};
use std::path::{Path, PathBuf, absolute};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub logging: LoggingSettings,
    pub api: ApiSettings,
    pub index: IndexSettings,
    pub model: ModelSettings,
    pub search: SearchSettings,
    pub secrets: SecretSettings,
    pub database: DatabaseConstants,
}

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub port: u32,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub upload_folder: PathBuf,
    /// Lowercase, without leading dot.
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub backend: IndexBackendKind,
    pub collection: String,
    pub dimensions: usize,
    pub operation_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub url: String,
    pub timeout: Duration,
}

impl TryFrom<RawSettings> for AppSettings {
    type Error = color_eyre::Report;

    fn try_from(raw: RawSettings) -> Result<Self> {
        if raw.index.dimensions == 0 {
            return Err(eyre!("index.dimensions must be positive"));
        }
        if raw.search.default_limit > raw.search.max_limit {
            return Err(eyre!("search.default_limit exceeds search.max_limit"));
        }
        if !raw.search.default_threshold.is_finite() {
            return Err(eyre!("search.default_threshold must be finite"));
        }
        let upload_folder = absolute(&raw.api.upload_folder)
            .map_err(|e| eyre!("Invalid upload_folder {:?}: {e}", raw.api.upload_folder))?;

        let api = ApiSettings {
            host: raw.api.host,
            port: raw.api.port,
            allowed_origins: raw.api.allowed_origins,
            max_upload_bytes: raw.api.max_upload_bytes,
            upload_folder,
            allowed_extensions: raw
                .api
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        };

        Ok(Self {
            logging: raw.logging,
            api,
            index: IndexSettings {
                backend: raw.index.backend,
                collection: raw.index.collection,
                dimensions: raw.index.dimensions,
                operation_timeout: Duration::from_millis(raw.index.operation_timeout_ms),
            },
            model: ModelSettings {
                url: raw.model.url,
                timeout: Duration::from_millis(raw.model.timeout_ms),
            },
            search: raw.search,
            secrets: raw.secrets,
            database: raw.constants.database,
        })
    }
}

impl ApiSettings {
    /// Whether an uploaded file name carries one of the allowed image extensions.
    #[must_use]
    pub fn is_allowed_image(&self, file_name: &str) -> bool {
        let Some(extension) = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
        else {
            return false;
        };
        self.allowed_extensions.contains(&extension)
    }
}

impl SearchSettings {
    /// Requested limit, or the default, capped at `max_limit`.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}
