use crate::api_state::ApiContext;
use crate::face::handlers::{
    delete_event_handler, detect_faces_handler, extract_faces_handler, search_faces_handler,
    stats_handler,
};
use axum::{
    Router,
    routing::{delete, get, post},
};

pub fn face_public_router() -> Router<ApiContext> {
    Router::new()
        .route("/api/face/detect", post(detect_faces_handler))
        .route("/api/face/extract", post(extract_faces_handler))
        .route("/api/face/search", post(search_faces_handler))
        .route("/api/face/delete-event", delete(delete_event_handler))
        .route("/api/face/stats", get(stats_handler))
}
