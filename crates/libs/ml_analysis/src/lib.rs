#![deny(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

mod error;
mod extractor;
mod remote_model;
mod utils;

pub use error::ExtractionError;
pub use extractor::{FaceExtractor, ModelCapabilities};
pub use remote_model::RemoteFaceModel;
pub use utils::{PreparedImage, prepare_image};
