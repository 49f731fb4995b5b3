mod api_doc;
pub mod face;
pub mod root;

use crate::api_state::ApiContext;
use crate::face::router::face_public_router;
use crate::root::router::root_public_router;
use crate::routes::api_doc::ApiDoc;
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

// --- Router Construction ---
pub fn create_router(api_state: ApiContext) -> Router {
    Router::new()
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(root_public_router())
        .merge(face_public_router())
        .with_state(api_state)
}
