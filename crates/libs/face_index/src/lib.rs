#![deny(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

pub mod backend;
mod error;
mod index;
pub mod scorer;

pub use backend::{MemoryBackend, PgVectorBackend, VectorBackend};
pub use error::IndexError;
pub use index::{EmbeddingIndex, IndexConfig};
