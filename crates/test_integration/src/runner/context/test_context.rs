use crate::runner::context::scripted_model::ScriptedModel;
use api::api_state::ApiContext;
use api::{build_app, create_index};
use app_state::{AppSettings, load_app_settings_from};
use color_eyre::Result;
use common_services::api::face::service::FaceService;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The main context for the integration tests: the real router on an ephemeral port,
/// backed by an in-memory index and a scripted face model.
pub struct TestContext {
    pub base_url: String,
    pub settings: AppSettings,
    pub http_client: reqwest::Client,
    pub model: Arc<ScriptedModel>,
    pub upload_dir: TempDir,
    api_handle: JoinHandle<()>,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        info!("Setting up test environment...");

        let settings_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/settings.yaml");
        let mut settings = load_app_settings_from(&settings_path)?;
        let upload_dir = tempfile::tempdir()?;
        settings.api.upload_folder = upload_dir.path().to_path_buf();

        let model = Arc::new(ScriptedModel::default());
        let face_service = FaceService::new(
            create_index(&settings)?,
            model.clone(),
            settings.model.timeout,
        );
        let app = build_app(ApiContext {
            face_service,
            settings: settings.clone(),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let api_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("API server failed: {}", e);
            }
        });
        info!("Test server listening on {}", base_url);

        Ok(Self {
            base_url,
            settings,
            http_client: reqwest::Client::new(),
            model,
            upload_dir,
            api_handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.api_handle.abort();
    }
}
