use crate::api::face::error::FaceError;
use crate::api::face::interfaces::{
    CapabilityFlags, DeleteEventResponse, DetectResponse, DetectedFace, ExtractParams,
    ExtractResponse, HealthReport, HealthStatus, IndexedFace, SearchParams, SearchResponse,
};
use color_eyre::eyre;
use common_types::{FaceDetection, FaceMetadata, IndexStats, VectorRecord};
use face_index::EmbeddingIndex;
use ml_analysis::{ExtractionError, FaceExtractor, ModelCapabilities};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

pub const SERVICE_NAME: &str = "face-recognition";

/// Query policy for search: only the first face in model output order is used, any
/// further faces in the query image are ignored.
#[must_use]
pub fn first_face_only(faces: Vec<FaceDetection>) -> Option<FaceDetection> {
    faces.into_iter().next()
}

/// Turns the model output for one photo into index records. The position of a face in
/// `faces` becomes its `face_index` and thereby its id.
pub fn build_records(
    params: ExtractParams,
    faces: &[FaceDetection],
) -> Result<Vec<VectorRecord>, FaceError> {
    faces
        .iter()
        .enumerate()
        .map(|(i, face)| -> Result<VectorRecord, FaceError> {
            let face_index = u32::try_from(i).map_err(eyre::Report::new)?;
            Ok(VectorRecord::new(
                face.embedding.clone(),
                FaceMetadata {
                    photo_id: params.photo_id,
                    event_id: params.event_id,
                    face_index,
                    bbox: face.bbox,
                    confidence: face.confidence,
                },
            ))
        })
        .collect()
}

/// Routes face requests onto the model and the embedding index.
///
/// Holds no per-request state; one instance is shared by all handlers.
#[derive(Clone)]
pub struct FaceService {
    index: EmbeddingIndex,
    extractor: Arc<dyn FaceExtractor>,
    model_timeout: Duration,
}

impl FaceService {
    #[must_use]
    pub fn new(
        index: EmbeddingIndex,
        extractor: Arc<dyn FaceExtractor>,
        model_timeout: Duration,
    ) -> Self {
        Self {
            index,
            extractor,
            model_timeout,
        }
    }

    #[must_use]
    pub const fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    async fn run_model(
        &self,
        call: impl Future<Output = Result<Vec<FaceDetection>, ExtractionError>>,
    ) -> Result<Vec<FaceDetection>, FaceError> {
        match timeout(self.model_timeout, call).await {
            Ok(faces) => Ok(faces?),
            Err(_) => Err(FaceError::ModelTimeout(self.model_timeout)),
        }
    }

    #[instrument(skip_all, fields(bytes = image.len()), err(Debug))]
    pub async fn detect_faces(&self, image: &[u8]) -> Result<DetectResponse, FaceError> {
        let faces = self.run_model(self.extractor.detect(image)).await?;
        let faces: Vec<DetectedFace> = faces.into_iter().map(DetectedFace::from).collect();
        Ok(DetectResponse {
            face_count: faces.len(),
            faces,
        })
    }

    /// Extracts every face of a photo and makes them the photo's complete face set in
    /// the index. Nothing is written unless every face could be stored.
    #[instrument(
        skip(self, image),
        fields(bytes = image.len()),
        err(Debug)
    )]
    pub async fn index_photo(
        &self,
        params: ExtractParams,
        image: &[u8],
    ) -> Result<ExtractResponse, FaceError> {
        let faces = self.run_model(self.extractor.extract(image)).await?;
        let records = build_records(params, &faces)?;
        let removed = self.index.replace_photo(params.photo_id, &records).await?;

        info!(
            "Indexed {} faces of photo {} in event {} ({} stale removed)",
            records.len(),
            params.photo_id,
            params.event_id,
            removed
        );

        let embeddings: Vec<IndexedFace> = records
            .into_iter()
            .map(|record| IndexedFace {
                vector_id: record.id,
                face_index: record.metadata.face_index,
                bbox: record.metadata.bbox,
                confidence: record.metadata.confidence,
            })
            .collect();
        Ok(ExtractResponse {
            face_count: embeddings.len(),
            embeddings,
        })
    }

    #[instrument(skip(self, image), fields(bytes = image.len()), err(Debug))]
    pub async fn search_faces(
        &self,
        params: SearchParams,
        image: &[u8],
    ) -> Result<SearchResponse, FaceError> {
        let faces = self.run_model(self.extractor.extract(image)).await?;
        let detected = faces.len();
        let query = first_face_only(faces).ok_or(FaceError::NoFaceDetected)?;
        if detected > 1 {
            debug!("Query image has {} faces, searching with the first", detected);
        }

        let matches = self
            .index
            .search(&query.embedding, params.event_id, params.limit, params.threshold)
            .await?;
        Ok(SearchResponse {
            total_matches: matches.len(),
            matches,
        })
    }

    #[instrument(skip(self), err(Debug))]
    pub async fn delete_event(&self, event_id: i64) -> Result<DeleteEventResponse, FaceError> {
        let deleted_count = self.index.delete_by_event(event_id).await?;
        info!("Deleted {} faces of event {}", deleted_count, event_id);
        Ok(DeleteEventResponse {
            message: format!("Deleted {deleted_count} face embeddings for event {event_id}"),
            deleted_count,
        })
    }

    pub async fn stats(&self) -> Result<IndexStats, FaceError> {
        Ok(self.index.stats().await?)
    }

    /// Probes the model and the index. Never fails; an unavailable dependency turns the
    /// report degraded.
    pub async fn health(&self) -> HealthReport {
        let (model, index) = tokio::join!(
            timeout(self.model_timeout, self.extractor.capabilities()),
            self.index.stats()
        );
        let model = model.unwrap_or_else(|_| {
            warn!("Face model health probe timed out");
            ModelCapabilities::default()
        });
        let index_available = match index {
            Ok(_) => true,
            Err(e) => {
                warn!("Face index health probe failed: {}", e);
                false
            }
        };

        let capability_flags = CapabilityFlags {
            model_available: model.model_available,
            gpu_available: model.gpu_available,
            index_available,
        };
        let status = if capability_flags.model_available && capability_flags.index_available {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        HealthReport {
            status,
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capability_flags,
        }
    }
}
