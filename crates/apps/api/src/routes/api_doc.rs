use crate::routes::{face, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::handlers::health_check,
        face::handlers::detect_faces_handler,
        face::handlers::extract_faces_handler,
        face::handlers::search_faces_handler,
        face::handlers::delete_event_handler,
        face::handlers::stats_handler,
    ),
    tags(
        (name = "Face", description = "Face detection, indexing and similarity search"),
        (name = "System", description = "Health check"),
    )
)]
pub struct ApiDoc;
