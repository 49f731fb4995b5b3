use app_state::{ApiSettings, AppSettings, SearchSettings};
use axum::extract::FromRef;
use common_services::api::face::service::FaceService;

#[derive(Clone)]
pub struct ApiContext {
    pub face_service: FaceService,
    pub settings: AppSettings,
}

impl FromRef<ApiContext> for FaceService {
    fn from_ref(state: &ApiContext) -> Self {
        state.face_service.clone()
    }
}

impl FromRef<ApiContext> for ApiSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.api.clone()
    }
}

impl FromRef<ApiContext> for SearchSettings {
    fn from_ref(state: &ApiContext) -> Self {
        state.settings.search.clone()
    }
}
