use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Face location in image pixel coordinates, serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// A box is well formed when its corners are ordered (`x1 < x2`, `y1 < y2`).
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

/// One face found in one image by the extraction model.
///
/// Detections are transient: only the embedding and the derived metadata are persisted,
/// as a [`crate::VectorRecord`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct FaceDetection {
    /// Raw embedding as produced by the model, not normalized.
    /// Empty when the detection came from a detect-only call.
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[schema(value_type = Vec<f32>)]
    pub bbox: BoundingBox,
    /// Detection score in `[0, 1]`.
    pub confidence: f32,
    /// Facial keypoints, absent when the model does not estimate them.
    #[serde(default)]
    #[schema(value_type = Option<Vec<Vec<f32>>>)]
    pub landmarks: Option<Vec<[f32; 2]>>,
}
