use axum::Json;
use axum::extract::State;
use common_services::api::face::interfaces::HealthReport;
use common_services::api::face::service::FaceService;

#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    responses(
        (status = 200, description = "Liveness and capability probe. Unavailable dependencies are reported as degraded.", body = HealthReport),
    )
)]
pub async fn health_check(State(service): State<FaceService>) -> Json<HealthReport> {
    Json(service.health().await)
}
