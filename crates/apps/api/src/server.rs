use crate::api_state::ApiContext;
use crate::create_router;
use app_state::{AppSettings, DatabaseConstants, IndexBackendKind};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use common_services::api::face::service::FaceService;
use face_index::{EmbeddingIndex, IndexConfig, MemoryBackend, PgVectorBackend, VectorBackend};
use http::{HeaderValue, header};
use ml_analysis::RemoteFaceModel;
use reqwest::Client;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::net::TcpListener;
use tower_http::cors;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Lazily connected pool; the index reports storage problems per request instead of
/// failing startup.
fn create_pool(database_url: &str, constants: &DatabaseConstants) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(constants.max_connections)
        .min_connections(constants.min_connections)
        .max_lifetime(Duration::from_secs(constants.max_lifetime))
        .idle_timeout(Duration::from_secs(constants.idle_timeout))
        .acquire_timeout(Duration::from_secs(constants.acquire_timeout))
        .test_before_acquire(true)
        .connect_lazy(database_url)?;
    Ok(pool)
}

pub fn create_index(settings: &AppSettings) -> Result<EmbeddingIndex> {
    let backend: Arc<dyn VectorBackend> = match settings.index.backend {
        IndexBackendKind::Postgres => {
            info!("Using pgvector collection {:?}", settings.index.collection);
            let pool = create_pool(&settings.secrets.database_url, &settings.database)?;
            Arc::new(PgVectorBackend::new(pool, &settings.index.collection)?)
        }
        IndexBackendKind::Memory => {
            warn!("Using the in-memory index, faces are lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };
    Ok(EmbeddingIndex::new(
        backend,
        IndexConfig {
            dimensions: settings.index.dimensions,
            operation_timeout: settings.index.operation_timeout,
        },
    ))
}

/// Creates the process-wide index and model client.
pub async fn init_face_service(settings: &AppSettings) -> Result<FaceService> {
    let index = create_index(settings)?;
    let http_client = Client::builder().timeout(settings.model.timeout).build()?;
    let model = RemoteFaceModel::connect(http_client, &settings.model.url).await?;
    Ok(FaceService::new(
        index,
        Arc::new(model),
        settings.model.timeout,
    ))
}

/// The router with CORS, body limit and request tracing applied.
///
/// The limit is enforced by the extractors, so an oversized upload surfaces as a face
/// error instead of a bare 413.
pub fn build_app(api_state: ApiContext) -> Router {
    let allowed_origins: Vec<HeaderValue> = api_state
        .settings
        .api
        .allowed_origins
        .iter()
        .filter_map(|s| match s.parse() {
            Ok(hv) => Some(hv),
            Err(e) => {
                error!("Invalid CORS origin configured: {} - Error: {}", s, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_origin(allowed_origins)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]);

    let max_upload_bytes = api_state.settings.api.max_upload_bytes;

    create_router(api_state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutting down");
}

pub async fn serve(settings: AppSettings) -> Result<()> {
    info!("🚀 Initializing server...");
    fs::create_dir_all(&settings.api.upload_folder).await?;

    let face_service = init_face_service(&settings).await?;
    let api_state = ApiContext {
        face_service: face_service.clone(),
        settings: settings.clone(),
    };
    let app = build_app(api_state);

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port)
        .parse()
        .map_err(|e| eyre!("Invalid address: {}", e))?;
    let listener = TcpListener::bind(addr).await?;
    info!("🐸 Server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    face_service.index().shutdown().await;
    Ok(served?)
}
