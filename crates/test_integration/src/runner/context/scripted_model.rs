use async_trait::async_trait;
use common_types::{BoundingBox, FaceDetection};
use ml_analysis::{ExtractionError, FaceExtractor, ModelCapabilities, prepare_image};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Stand-in for the face model. Images are decoded for real; the faces reported for an
/// image are whatever was scripted for its exact bytes (none otherwise).
#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<HashMap<Vec<u8>, Vec<FaceDetection>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn script(&self, image: &[u8], embeddings: &[Vec<f32>]) {
        let faces = embeddings
            .iter()
            .enumerate()
            .map(|(i, embedding)| FaceDetection {
                embedding: embedding.clone(),
                bbox: BoundingBox::new(i as f32 * 20.0, 5.0, i as f32 * 20.0 + 15.0, 25.0),
                confidence: 0.95,
                landmarks: Some(vec![[3.0, 4.0], [9.0, 4.0]]),
            })
            .collect();
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(image.to_vec(), faces);
    }

    /// Number of detect or extract calls that reached the model.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn faces_for(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        prepare_image(image)?;
        Ok(self
            .scripts
            .lock()
            .expect("scripts lock")
            .get(image)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl FaceExtractor for ScriptedModel {
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError> {
        let mut faces = self.faces_for(image)?;
        for face in &mut faces {
            face.embedding.clear();
        }
        Ok(faces)
    }

    async fn extract(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError> {
        self.faces_for(image)
    }

    async fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities {
            model_available: true,
            gpu_available: false,
        }
    }
}
