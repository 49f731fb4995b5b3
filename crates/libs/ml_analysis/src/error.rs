use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("image could not be decoded: {0}")]
    UnreadableImage(#[from] image::ImageError),

    #[error("face model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("face model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("face model returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid face model url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("image preparation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
