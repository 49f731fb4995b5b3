use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use color_eyre::eyre;
use face_index::IndexError;
use ml_analysis::ExtractionError;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("No file provided")]
    MissingFile,

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("{0} is required")]
    MissingParameter(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("No face detected in query image")]
    NoFaceDetected,

    #[error("image could not be decoded")]
    UnreadableImage(#[source] ExtractionError),

    #[error("embedding dimensionality mismatch")]
    DimensionMismatch(#[source] IndexError),

    #[error("degenerate embedding")]
    DegenerateVector(#[source] IndexError),

    #[error("vector storage unavailable")]
    StorageUnavailable(#[source] IndexError),

    #[error("face model unavailable")]
    ModelUnavailable(#[source] ExtractionError),

    #[error("face model did not answer within {0:?}")]
    ModelTimeout(Duration),

    #[error("internal error")]
    Internal(#[from] eyre::Report),
}

impl FaceError {
    /// Machine-stable error code returned in the response body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingFile => "missing_file",
            Self::InvalidFile(_) => "invalid_file",
            Self::MissingParameter(_) => "missing_parameter",
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::NoFaceDetected => "no_face_detected",
            Self::UnreadableImage(_) => "unreadable_image",
            Self::DimensionMismatch(_) => "dimension_mismatch",
            Self::DegenerateVector(_) => "degenerate_vector",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::ModelUnavailable(_) | Self::ModelTimeout(_) => "model_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingFile
            | Self::InvalidFile(_)
            | Self::MissingParameter(_)
            | Self::InvalidParameter { .. }
            | Self::NoFaceDetected
            | Self::UnreadableImage(_) => StatusCode::BAD_REQUEST,
            Self::DimensionMismatch(_)
            | Self::DegenerateVector(_)
            | Self::StorageUnavailable(_)
            | Self::ModelUnavailable(_)
            | Self::ModelTimeout(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to callers. Server-side failures never expose their source.
    fn public_message(&self) -> String {
        match self {
            Self::MissingFile
            | Self::InvalidFile(_)
            | Self::MissingParameter(_)
            | Self::InvalidParameter { .. }
            | Self::NoFaceDetected
            | Self::UnreadableImage(_) => self.to_string(),
            Self::DimensionMismatch(_) | Self::DegenerateVector(_) => {
                "The face embedding could not be processed.".to_string()
            }
            Self::StorageUnavailable(_) => "The face index is unavailable.".to_string(),
            Self::ModelUnavailable(_) | Self::ModelTimeout(_) => {
                "The face model is unavailable.".to_string()
            }
            Self::Internal(_) => "An unexpected internal error occurred.".to_string(),
        }
    }
}

fn log_error(error: &FaceError) {
    match error {
        FaceError::DimensionMismatch(e)
        | FaceError::DegenerateVector(e)
        | FaceError::StorageUnavailable(e) => error!("{}: {:?}", error, e),
        FaceError::UnreadableImage(e) => warn!("Rejected upload: {}", e),
        FaceError::ModelUnavailable(e) => error!("{}: {:?}", error, e),
        FaceError::ModelTimeout(after) => error!("Face model timed out after {:?}", after),
        FaceError::Internal(e) => error!("Internal error: {:?}", e),
        _ => warn!("Rejected request: {}", error),
    }
}

impl IntoResponse for FaceError {
    fn into_response(self) -> Response {
        log_error(&self);

        let body = Json(json!({ "error": self.public_message(), "code": self.code() }));
        (self.status(), body).into_response()
    }
}

impl From<IndexError> for FaceError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch { .. } => Self::DimensionMismatch(err),
            IndexError::DegenerateVector => Self::DegenerateVector(err),
            IndexError::InvalidThreshold(value) => Self::InvalidParameter {
                name: "threshold",
                value: value.to_string(),
            },
            IndexError::StorageUnavailable(_) | IndexError::Timeout { .. } => {
                Self::StorageUnavailable(err)
            }
            IndexError::InvalidCollectionName(_) | IndexError::CorruptRecord { .. } => {
                Self::Internal(eyre::Report::new(err))
            }
        }
    }
}

impl From<ExtractionError> for FaceError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnreadableImage(_) => Self::UnreadableImage(err),
            ExtractionError::ModelUnavailable(_)
            | ExtractionError::Request(_)
            | ExtractionError::InvalidResponse(_)
            | ExtractionError::InvalidUrl(_) => Self::ModelUnavailable(err),
            ExtractionError::Join(_) => Self::Internal(eyre::Report::new(err)),
        }
    }
}

impl From<tokio::task::JoinError> for FaceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(eyre::Report::new(err))
    }
}

impl From<std::io::Error> for FaceError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(eyre::Report::new(err))
    }
}
