use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use common_services::api::face::error::FaceError;
use std::collections::HashMap;
use tracing::debug;
use utoipa::ToSchema;

pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct FileField {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully read multipart face request: the `file` part plus the plain text fields.
#[derive(Debug, Default)]
pub struct FaceForm {
    file: Option<FileField>,
    fields: HashMap<String, String>,
}

fn unreadable_form(e: &MultipartError) -> FaceError {
    FaceError::InvalidFile(e.body_text())
}

impl FaceForm {
    /// Reads every part. A request that is not `multipart/form-data`, or exceeds the body
    /// limit, is an invalid file.
    pub async fn read(
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Self, FaceError> {
        let mut multipart = multipart.map_err(|e| FaceError::InvalidFile(e.body_text()))?;
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| unreadable_form(&e))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == FILE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| unreadable_form(&e))?;
                debug!("Received {:?} ({} bytes)", file_name, bytes.len());
                form.file = Some(FileField { file_name, bytes });
            } else {
                let value = field.text().await.map_err(|e| unreadable_form(&e))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn file(&self) -> Result<&FileField, FaceError> {
        self.file.as_ref().ok_or(FaceError::MissingFile)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct DetectForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ExtractForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    photo_id: i64,
    event_id: i64,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct SearchForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    event_id: i64,
    /// Defaults to `search.default_limit`, capped at `search.max_limit`.
    limit: Option<usize>,
    /// Inclusive similarity floor, defaults to `search.default_threshold`.
    threshold: Option<f32>,
}
