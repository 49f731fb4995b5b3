use crate::ExtractionError;
use async_trait::async_trait;
use common_types::FaceDetection;
use serde::Serialize;

/// What the loaded model can currently do, as reported on `/health`.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub model_available: bool,
    pub gpu_available: bool,
}

/// Boundary to the face detection and embedding model.
///
/// One instance is loaded per process and shared by all requests, so calls must not
/// mutate shared model state. Output order is the detection order and is stable for
/// repeated calls on the same bytes.
#[async_trait]
pub trait FaceExtractor: Send + Sync {
    /// Locates faces without computing embeddings. `embedding` is empty in the result.
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError>;

    /// Locates faces and computes one embedding per face.
    async fn extract(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError>;

    /// Probes the model. Never fails; an unreachable model reports itself unavailable.
    async fn capabilities(&self) -> ModelCapabilities;
}
