use crate::api::face::error::FaceError;
use app_state::SearchSettings;
use common_types::{BoundingBox, FaceDetection, SearchMatch};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

fn required<'a>(name: &'static str, raw: Option<&'a str>) -> Result<&'a str, FaceError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(FaceError::MissingParameter(name)),
    }
}

fn parse_field<T: FromStr>(name: &'static str, value: &str) -> Result<T, FaceError> {
    value.parse().map_err(|_| FaceError::InvalidParameter {
        name,
        value: value.to_string(),
    })
}

fn optional<T: FromStr>(name: &'static str, raw: Option<&str>) -> Result<Option<T>, FaceError> {
    match raw.map(str::trim) {
        Some(value) if !value.is_empty() => parse_field(name, value).map(Some),
        _ => Ok(None),
    }
}

/// Validated form fields of an extract request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractParams {
    pub photo_id: i64,
    pub event_id: i64,
}

impl ExtractParams {
    pub fn parse(photo_id: Option<&str>, event_id: Option<&str>) -> Result<Self, FaceError> {
        let photo_id = parse_field("photo_id", required("photo_id", photo_id)?)?;
        let event_id = parse_field("event_id", required("event_id", event_id)?)?;
        Ok(Self { photo_id, event_id })
    }
}

/// Validated form fields of a search request, with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub event_id: i64,
    pub limit: usize,
    pub threshold: f32,
}

impl SearchParams {
    pub fn parse(
        event_id: Option<&str>,
        limit: Option<&str>,
        threshold: Option<&str>,
        settings: &SearchSettings,
    ) -> Result<Self, FaceError> {
        let event_id = parse_field("event_id", required("event_id", event_id)?)?;
        let limit = settings.effective_limit(optional::<usize>("limit", limit)?);
        let threshold = match optional::<f32>("threshold", threshold)? {
            Some(value) if !value.is_finite() => {
                return Err(FaceError::InvalidParameter {
                    name: "threshold",
                    value: value.to_string(),
                });
            }
            Some(value) => value,
            None => settings.default_threshold,
        };
        Ok(Self {
            event_id,
            limit,
            threshold,
        })
    }
}

/// `event_id` as sent by clients: a JSON number or a numeric string.
#[derive(Deserialize, ToSchema, Debug, Clone)]
#[serde(untagged)]
pub enum EventIdField {
    Number(i64),
    Text(String),
}

#[derive(Deserialize, ToSchema, Debug, Clone, Default)]
pub struct DeleteEventRequest {
    #[serde(default)]
    pub event_id: Option<EventIdField>,
}

impl DeleteEventRequest {
    /// Parses a JSON body. An empty body is treated as a request without `event_id`.
    pub fn from_body(body: &[u8]) -> Result<Self, FaceError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| FaceError::InvalidParameter {
            name: "body",
            value: e.to_string(),
        })
    }

    pub fn event_id(&self) -> Result<i64, FaceError> {
        match &self.event_id {
            Some(EventIdField::Number(id)) => Ok(*id),
            Some(EventIdField::Text(text)) => {
                parse_field("event_id", required("event_id", Some(text))?)
            }
            None => Err(FaceError::MissingParameter("event_id")),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct DetectedFace {
    #[schema(value_type = Vec<f32>)]
    pub bbox: BoundingBox,
    pub confidence: f32,
    #[schema(value_type = Option<Vec<Vec<f32>>>)]
    pub landmarks: Option<Vec<[f32; 2]>>,
}

impl From<FaceDetection> for DetectedFace {
    fn from(face: FaceDetection) -> Self {
        Self {
            bbox: face.bbox,
            confidence: face.confidence,
            landmarks: face.landmarks,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct DetectResponse {
    pub face_count: usize,
    pub faces: Vec<DetectedFace>,
}

/// A face that was written to the index.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct IndexedFace {
    pub vector_id: String,
    pub face_index: u32,
    #[schema(value_type = Vec<f32>)]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ExtractResponse {
    pub face_count: usize,
    pub embeddings: Vec<IndexedFace>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub matches: Vec<SearchMatch>,
    pub total_matches: usize,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct DeleteEventResponse {
    pub message: String,
    pub deleted_count: u64,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFlags {
    pub model_available: bool,
    pub gpu_available: bool,
    pub index_available: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub capability_flags: CapabilityFlags,
}
