use crate::{ExtractionError, FaceExtractor, ModelCapabilities, prepare_image};
use async_trait::async_trait;
use common_types::{BoundingBox, FaceDetection};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct ModelFace {
    bbox: [f32; 4],
    confidence: f32,
    #[serde(default)]
    landmarks: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    faces: Vec<ModelFace>,
}

#[derive(Debug, Deserialize)]
struct ModelHealth {
    #[serde(default)]
    gpu_available: bool,
}

/// Face model served by an external inference service.
///
/// Uploads are decoded locally first, so unreadable images fail without a network call.
/// `POST {url}/v1/faces?embeddings=<bool>` takes a JPEG body and answers
/// `{"faces": [{bbox, confidence, landmarks?, embedding?}]}`; `GET {url}/health` answers
/// `{"gpu_available": bool}`.
#[derive(Clone)]
pub struct RemoteFaceModel {
    http_client: Client,
    base_url: Url,
}

impl RemoteFaceModel {
    pub fn new(http_client: Client, base_url: &str) -> Result<Self, ExtractionError> {
        let mut base_url: Url = base_url.parse()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Creates the client and probes the model once. An unreachable model is logged but
    /// does not fail startup; `/health` reports it as degraded.
    pub async fn connect(http_client: Client, base_url: &str) -> Result<Self, ExtractionError> {
        let model = Self::new(http_client, base_url)?;
        let capabilities = model.capabilities().await;
        if capabilities.model_available {
            info!(
                "Face model at {} ready (gpu available: {})",
                model.base_url, capabilities.gpu_available
            );
        } else {
            warn!("Face model at {} is not reachable yet", model.base_url);
        }
        Ok(model)
    }

    async fn request_faces(
        &self,
        image: &[u8],
        with_embeddings: bool,
    ) -> Result<Vec<FaceDetection>, ExtractionError> {
        let bytes = image.to_vec();
        let prepared = tokio::task::spawn_blocking(move || prepare_image(&bytes)).await??;
        debug!(
            "Prepared {}x{} image ({} bytes)",
            prepared.width,
            prepared.height,
            prepared.jpeg.len()
        );

        let mut url = self.base_url.join("v1/faces")?;
        url.query_pairs_mut()
            .append_pair("embeddings", if with_embeddings { "true" } else { "false" });

        let response = self
            .http_client
            .post(url.clone())
            .header(CONTENT_TYPE, "image/jpeg")
            .body(prepared.jpeg)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::ModelUnavailable(format!(
                "{url} returned {status}: {error_text}"
            )));
        }

        let body: ModelResponse = response.json().await?;
        body.faces
            .into_iter()
            .enumerate()
            .map(|(i, face)| {
                let embedding = match (with_embeddings, face.embedding) {
                    (true, Some(embedding)) if !embedding.is_empty() => embedding,
                    (true, _) => {
                        return Err(ExtractionError::InvalidResponse(format!(
                            "face {i} has no embedding"
                        )));
                    }
                    (false, _) => Vec::new(),
                };
                let bbox = BoundingBox::from(face.bbox);
                if !bbox.is_well_formed() {
                    return Err(ExtractionError::InvalidResponse(format!(
                        "face {i} has malformed bbox {:?}",
                        face.bbox
                    )));
                }
                if !(0.0..=1.0).contains(&face.confidence) {
                    return Err(ExtractionError::InvalidResponse(format!(
                        "face {i} has confidence {} outside [0, 1]",
                        face.confidence
                    )));
                }
                Ok(FaceDetection {
                    embedding,
                    bbox,
                    confidence: face.confidence,
                    landmarks: face.landmarks,
                })
            })
            .collect()
    }
}

#[async_trait]
impl FaceExtractor for RemoteFaceModel {
    #[instrument(skip_all, fields(bytes = image.len()))]
    async fn detect(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError> {
        let faces = self.request_faces(image, false).await?;
        info!("Detected {} faces", faces.len());
        Ok(faces)
    }

    #[instrument(skip_all, fields(bytes = image.len()))]
    async fn extract(&self, image: &[u8]) -> Result<Vec<FaceDetection>, ExtractionError> {
        let faces = self.request_faces(image, true).await?;
        info!("Extracted {} face embeddings", faces.len());
        Ok(faces)
    }

    async fn capabilities(&self) -> ModelCapabilities {
        let Ok(url) = self.base_url.join("health") else {
            return ModelCapabilities::default();
        };
        let response = self
            .http_client
            .get(url)
            .timeout(HEALTH_PROBE_TIMEOUT)
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => {
                let gpu_available = response
                    .json::<ModelHealth>()
                    .await
                    .map(|h| h.gpu_available)
                    .unwrap_or_default();
                ModelCapabilities {
                    model_available: true,
                    gpu_available,
                }
            }
            Ok(response) => {
                warn!("Face model health probe returned {}", response.status());
                ModelCapabilities::default()
            }
            Err(e) => {
                warn!("Face model health probe failed: {}", e);
                ModelCapabilities::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use color_eyre::Result;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::io::Cursor;
    use tokio::net::TcpListener;

    async fn faces(
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        body: axum::body::Bytes,
    ) -> Json<Value> {
        assert_eq!(headers[CONTENT_TYPE], "image/jpeg");
        assert_eq!(image::guess_format(&body).ok(), Some(ImageFormat::Jpeg));
        let with_embeddings = query.get("embeddings").map(String::as_str) == Some("true");
        let embedding = with_embeddings.then(|| vec![0.5, 0.5, 0.0]);
        Json(json!({
            "faces": [
                {"bbox": [1, 2, 30, 40], "confidence": 0.99, "landmarks": [[5, 6], [7, 8]], "embedding": embedding},
                {"bbox": [50, 60, 70, 80], "confidence": 0.7, "embedding": embedding},
            ]
        }))
    }

    async fn serve_fake_model() -> Result<String> {
        let app = Router::new()
            .route("/model/v1/faces", post(faces))
            .route("/model/health", get(|| async { Json(json!({"gpu_available": true})) }))
            .route(
                "/inverted/v1/faces",
                post(|| async { Json(json!({"faces": [{"bbox": [30, 2, 1, 40], "confidence": 0.9}]})) }),
            )
            .route(
                "/overconfident/v1/faces",
                post(|| async { Json(json!({"faces": [{"bbox": [1, 2, 30, 40], "confidence": 1.5}]})) }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(format!("http://{addr}"))
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([10, 20, 30])))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn extracts_faces_in_model_order() -> Result<()> {
        let base = serve_fake_model().await?;
        let model = RemoteFaceModel::connect(Client::new(), &format!("{base}/model")).await?;

        let faces = model.extract(&png_bytes()).await?;

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].bbox, BoundingBox::new(1.0, 2.0, 30.0, 40.0));
        assert_eq!(faces[0].embedding, vec![0.5, 0.5, 0.0]);
        assert_eq!(faces[0].landmarks, Some(vec![[5.0, 6.0], [7.0, 8.0]]));
        assert_eq!(faces[1].landmarks, None);
        Ok(())
    }

    #[tokio::test]
    async fn detect_skips_embeddings() -> Result<()> {
        let base = serve_fake_model().await?;
        let model = RemoteFaceModel::new(Client::new(), &format!("{base}/model"))?;

        let faces = model.detect(&png_bytes()).await?;

        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|f| f.embedding.is_empty()));
        assert!((faces[1].confidence - 0.7).abs() < f32::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn reports_capabilities() -> Result<()> {
        let base = serve_fake_model().await?;
        let model = RemoteFaceModel::new(Client::new(), &format!("{base}/model"))?;
        assert_eq!(
            model.capabilities().await,
            ModelCapabilities {
                model_available: true,
                gpu_available: true
            }
        );

        // nothing listens on the discard port
        let offline = RemoteFaceModel::new(Client::new(), "http://127.0.0.1:9")?;
        assert_eq!(offline.capabilities().await, ModelCapabilities::default());
        Ok(())
    }

    #[tokio::test]
    async fn rejects_malformed_detections() -> Result<()> {
        let base = serve_fake_model().await?;
        for path in ["inverted", "overconfident"] {
            let model = RemoteFaceModel::new(Client::new(), &format!("{base}/{path}"))?;
            assert!(
                matches!(
                    model.detect(&png_bytes()).await,
                    Err(ExtractionError::InvalidResponse(_))
                ),
                "{path} detections were accepted"
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_image_fails_before_any_request() -> Result<()> {
        let offline = RemoteFaceModel::new(Client::new(), "http://127.0.0.1:9")?;
        assert!(matches!(
            offline.extract(b"GIF89a but not really").await,
            Err(ExtractionError::UnreadableImage(_))
        ));
        Ok(())
    }
}
