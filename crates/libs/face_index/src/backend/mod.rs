mod memory;
mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgVectorBackend;

use crate::IndexError;
use async_trait::async_trait;
use common_types::{IndexStats, VectorRecord};

/// Storage engine behind the [`crate::EmbeddingIndex`].
///
/// Filters are always exact equality on `event_id` or `photo_id`. Implementations must be
/// safe to share between concurrent requests, and every write must be atomic: a reader sees
/// a record either entirely before or entirely after an upsert.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Short name for logs and health output.
    fn name(&self) -> &'static str;

    /// Creates the collection with the given dimensionality and cosine distance if it does
    /// not exist yet.
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), IndexError>;

    /// Inserts or fully replaces every record, all or nothing.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), IndexError>;

    /// Atomically upserts `records` and removes every other record of `photo_id`.
    /// Returns how many stale records were removed.
    async fn replace_photo(&self, photo_id: i64, records: &[VectorRecord])
    -> Result<u64, IndexError>;

    /// Returns candidate records of `event_id` for a cosine search.
    ///
    /// Backends may pre-rank and pre-filter natively but must not drop a record that
    /// scores at or above `score_threshold` while returning one that scores lower. The
    /// index re-scores the candidates, so the returned order is irrelevant.
    async fn search(
        &self,
        query: &[f32],
        event_id: i64,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorRecord>, IndexError>;

    async fn delete_by_event(&self, event_id: i64) -> Result<u64, IndexError>;

    async fn delete_by_photo(&self, photo_id: i64) -> Result<u64, IndexError>;

    async fn stats(&self) -> Result<IndexStats, IndexError>;

    /// Releases connections. The backend is not used afterwards.
    async fn close(&self);
}
