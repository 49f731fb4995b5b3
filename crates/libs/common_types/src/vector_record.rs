use crate::BoundingBox;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Builds the deterministic identifier of a face: `photo_<photo_id>_face_<face_index>`.
#[must_use]
pub fn vector_id(photo_id: i64, face_index: u32) -> String {
    format!("photo_{photo_id}_face_{face_index}")
}

/// Metadata stored next to every embedding.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct FaceMetadata {
    pub photo_id: i64,
    /// Tenant scope. Search and delete filter on exact equality of this field.
    pub event_id: i64,
    /// 0-based position of the face in the extractor's output for the source image.
    pub face_index: u32,
    #[schema(value_type = Vec<f32>)]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// The unit of storage in the embedding index.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: FaceMetadata,
}

impl VectorRecord {
    /// Creates a record whose id is derived from the metadata's photo id and face index.
    #[must_use]
    pub fn new(vector: Vec<f32>, metadata: FaceMetadata) -> Self {
        Self {
            id: vector_id(metadata.photo_id, metadata.face_index),
            vector,
            metadata,
        }
    }

    #[must_use]
    pub const fn event_id(&self) -> i64 {
        self.metadata.event_id
    }

    #[must_use]
    pub const fn photo_id(&self) -> i64 {
        self.metadata.photo_id
    }
}

/// A ranked search hit. Serialized flat: `vector_id`, `similarity` and the metadata fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct SearchMatch {
    pub vector_id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
    #[serde(flatten)]
    pub metadata: FaceMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct IndexStats {
    pub record_count: u64,
}
