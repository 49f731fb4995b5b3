use crate::api::face::error::FaceError;
use app_state::ApiSettings;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

/// An uploaded image spooled to `api.upload_folder`.
///
/// The file is removed when the value is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct UploadedImage {
    file: NamedTempFile,
}

impl UploadedImage {
    /// Checks the file name and payload, then writes the payload to a scoped temp file.
    pub async fn store(
        settings: &ApiSettings,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Self, FaceError> {
        if !settings.is_allowed_image(file_name) {
            return Err(FaceError::InvalidFile(format!(
                "{file_name:?} is not one of the allowed image types ({})",
                settings.allowed_extensions.join(", ")
            )));
        }
        if bytes.is_empty() {
            return Err(FaceError::InvalidFile(format!("{file_name:?} is empty")));
        }

        let extension = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file = Builder::new()
            .prefix("face_")
            .suffix(&format!(".{extension}"))
            .tempfile_in(&settings.upload_folder)?;
        tokio::fs::write(file.path(), bytes).await?;
        debug!("Spooled {} bytes to {}", bytes.len(), file.path().display());

        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn read(&self) -> Result<Vec<u8>, FaceError> {
        Ok(tokio::fs::read(self.file.path()).await?)
    }
}
