use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use std::path::Path;
use tracing::debug;

const SETTINGS_PATH: &str = "config/settings.yaml";

/// Loads `config/settings.yaml`, overridden by `APP__SECTION__KEY` environment variables.
pub fn load_app_settings() -> Result<AppSettings> {
    // Need to load from dotenv to get it to overwrite the db url from env.
    dotenv::from_path(".env").ok();
    load_app_settings_from(Path::new(SETTINGS_PATH))
}

pub fn load_app_settings_from(config_path: &Path) -> Result<AppSettings> {
    let config_path = config_path.canonicalize()?;
    debug!("Loading settings from {}", config_path.display());

    let builder = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    raw_settings.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexBackendKind;
    use std::fs;
    use std::time::Duration;

    const SETTINGS: &str = r#"
logging:
  level: "api=info"
api:
  host: "127.0.0.1"
  port: 5000
  allowed_origins: ["http://localhost:4200"]
  max_upload_bytes: 52428800
  upload_folder: "uploads"
  allowed_extensions: ["png", "JPG", ".jpeg", "webp"]
index:
  backend: memory
  collection: face_embeddings
  dimensions: 512
  operation_timeout_ms: 2500
model:
  url: "http://localhost:8500"
  timeout_ms: 30000
search:
  default_limit: 50
  max_limit: 500
  default_threshold: 0.6
secrets:
  database_url: "postgres://localhost/faces"
constants:
  database:
    max_connections: 10
    min_connections: 1
    max_lifetime: 1800
    idle_timeout: 600
    acquire_timeout: 5
"#;

    #[test]
    fn loads_yaml_into_runtime_settings() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.yaml");
        fs::write(&path, SETTINGS)?;

        let settings = load_app_settings_from(&path)?;

        assert_eq!(settings.index.backend, IndexBackendKind::Memory);
        assert_eq!(settings.index.dimensions, 512);
        assert_eq!(settings.index.operation_timeout, Duration::from_millis(2500));
        assert_eq!(settings.model.timeout, Duration::from_secs(30));
        assert!(settings.api.upload_folder.is_absolute());
        assert_eq!(settings.api.allowed_extensions, ["png", "jpg", "jpeg", "webp"]);
        assert!(settings.api.is_allowed_image("party.JPEG"));
        assert!(settings.api.is_allowed_image("face.webp"));
        assert!(!settings.api.is_allowed_image("notes.txt"));
        assert!(!settings.api.is_allowed_image("png"));
        assert_eq!(settings.search.effective_limit(None), 50);
        assert_eq!(settings.search.effective_limit(Some(10_000)), 500);
        Ok(())
    }

    #[test]
    fn rejects_zero_dimensions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("settings.yaml");
        fs::write(&path, SETTINGS.replace("dimensions: 512", "dimensions: 0"))?;

        assert!(load_app_settings_from(&path).is_err());
        Ok(())
    }
}
