use crate::face::form::{DetectForm, ExtractForm, FaceForm, SearchForm};
use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Multipart, State};
use app_state::{ApiSettings, SearchSettings};
use common_services::api::face::error::FaceError;
use common_services::api::face::interfaces::{
    DeleteEventRequest, DeleteEventResponse, DetectResponse, ExtractParams, ExtractResponse,
    SearchParams, SearchResponse,
};
use common_services::api::face::service::FaceService;
use common_services::upload::UploadedImage;
use common_types::IndexStats;
use tracing::instrument;

/// Count and locate the faces in an image.
///
/// # Errors
///
/// Returns a `FaceError` if the upload is missing or invalid, or the model fails.
#[utoipa::path(
    post,
    path = "/api/face/detect",
    tag = "Face",
    request_body(content = DetectForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Faces found in the image", body = DetectResponse),
        (status = 400, description = "Missing, disallowed or unreadable file."),
        (status = 500, description = "The face model failed."),
    )
)]
#[instrument(skip(service, api_settings, multipart), err(Debug))]
pub async fn detect_faces_handler(
    State(service): State<FaceService>,
    State(api_settings): State<ApiSettings>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, FaceError> {
    let form = FaceForm::read(multipart).await?;
    let file = form.file()?;
    let upload = UploadedImage::store(&api_settings, &file.file_name, &file.bytes).await?;
    let response = service.detect_faces(&upload.read().await?).await?;
    Ok(Json(response))
}

/// Extract the faces of a photo and index their embeddings under the photo's event.
///
/// The photo's previously indexed faces are replaced.
///
/// # Errors
///
/// Returns a `FaceError` if parameters or the upload are invalid, or extraction or
/// indexing fails.
#[utoipa::path(
    post,
    path = "/api/face/extract",
    tag = "Face",
    request_body(content = ExtractForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Indexed faces", body = ExtractResponse),
        (status = 400, description = "Missing parameters or invalid file."),
        (status = 500, description = "Extraction or indexing failed."),
    )
)]
#[instrument(skip(service, api_settings, multipart), err(Debug))]
pub async fn extract_faces_handler(
    State(service): State<FaceService>,
    State(api_settings): State<ApiSettings>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>, FaceError> {
    let form = FaceForm::read(multipart).await?;
    let file = form.file()?;
    let params = ExtractParams::parse(form.field("photo_id"), form.field("event_id"))?;
    let upload = UploadedImage::store(&api_settings, &file.file_name, &file.bytes).await?;
    let response = service.index_photo(params, &upload.read().await?).await?;
    Ok(Json(response))
}

/// Find the faces of an event most similar to the first face in the query image.
///
/// # Errors
///
/// Returns a `FaceError` if parameters or the upload are invalid, the query image has no
/// face, or the search fails.
#[utoipa::path(
    post,
    path = "/api/face/search",
    tag = "Face",
    request_body(content = SearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Matches ordered by descending similarity", body = SearchResponse),
        (status = 400, description = "Missing event_id, invalid file or no face in the query image."),
        (status = 500, description = "Search failed."),
    )
)]
#[instrument(skip(service, api_settings, search_settings, multipart), err(Debug))]
pub async fn search_faces_handler(
    State(service): State<FaceService>,
    State(api_settings): State<ApiSettings>,
    State(search_settings): State<SearchSettings>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SearchResponse>, FaceError> {
    let form = FaceForm::read(multipart).await?;
    let file = form.file()?;
    let params = SearchParams::parse(
        form.field("event_id"),
        form.field("limit"),
        form.field("threshold"),
        &search_settings,
    )?;
    let upload = UploadedImage::store(&api_settings, &file.file_name, &file.bytes).await?;
    let response = service.search_faces(params, &upload.read().await?).await?;
    Ok(Json(response))
}

/// Delete every indexed face of an event.
///
/// # Errors
///
/// Returns a `FaceError` if `event_id` is missing or the index is unavailable.
#[utoipa::path(
    delete,
    path = "/api/face/delete-event",
    tag = "Face",
    request_body(content = DeleteEventRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Faces deleted", body = DeleteEventResponse),
        (status = 400, description = "Missing or malformed event_id."),
        (status = 500, description = "Delete failed."),
    )
)]
#[instrument(skip(service, body), err(Debug))]
pub async fn delete_event_handler(
    State(service): State<FaceService>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<DeleteEventResponse>, FaceError> {
    let body = body.map_err(|e| FaceError::InvalidParameter {
        name: "event_id",
        value: e.body_text(),
    })?;
    let event_id = DeleteEventRequest::from_body(&body)?.event_id()?;
    let response = service.delete_event(event_id).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/face/stats",
    tag = "Face",
    responses(
        (status = 200, description = "Index statistics", body = IndexStats),
        (status = 500, description = "The index is unavailable."),
    )
)]
#[instrument(skip(service), err(Debug))]
pub async fn stats_handler(
    State(service): State<FaceService>,
) -> Result<Json<IndexStats>, FaceError> {
    Ok(Json(service.stats().await?))
}
