use crate::backend::VectorBackend;
use crate::{IndexError, scorer};
use common_types::{IndexStats, SearchMatch, VectorRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Length every stored and queried vector must have.
    pub dimensions: usize,
    /// Upper bound for a single backend call, provisioning included.
    pub operation_timeout: Duration,
}

struct Inner {
    backend: Arc<dyn VectorBackend>,
    config: IndexConfig,
    provisioned: OnceCell<()>,
}

/// Tenant-scoped face embedding index.
///
/// Cheap to clone; all clones share one backend. The collection is provisioned lazily
/// before the first operation. Failures are never retried here.
#[derive(Clone)]
pub struct EmbeddingIndex {
    inner: Arc<Inner>,
}

impl EmbeddingIndex {
    #[must_use]
    pub fn new(backend: Arc<dyn VectorBackend>, config: IndexConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                provisioned: OnceCell::new(),
            }),
        }
    }

    /// Checks length and norm of a vector before it reaches storage.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), IndexError> {
        let expected = self.inner.config.dimensions;
        if vector.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        let norm = scorer::l2_norm(vector);
        if norm == 0.0 || !norm.is_finite() {
            return Err(IndexError::DegenerateVector);
        }
        Ok(())
    }

    async fn provision(&self) -> Result<(), IndexError> {
        self.inner
            .provisioned
            .get_or_try_init(|| async {
                info!(
                    "Provisioning {} collection with {} dimensions",
                    self.inner.backend.name(),
                    self.inner.config.dimensions
                );
                self.inner
                    .backend
                    .ensure_collection(self.inner.config.dimensions)
                    .await
            })
            .await?;
        Ok(())
    }

    /// Runs `operation` after provisioning, bounded by the configured timeout.
    async fn bounded<T, F>(&self, name: &'static str, operation: F) -> Result<T, IndexError>
    where
        F: Future<Output = Result<T, IndexError>>,
    {
        let after = self.inner.config.operation_timeout;
        let run = async {
            self.provision().await?;
            operation.await
        };
        match timeout(after, run).await {
            Ok(result) => result,
            Err(_) => Err(IndexError::Timeout {
                operation: name,
                after,
            }),
        }
    }

    /// Inserts a record or fully replaces the record with the same id.
    #[instrument(skip(self, record), fields(id = %record.id), err(Debug))]
    pub async fn upsert(&self, record: &VectorRecord) -> Result<(), IndexError> {
        self.upsert_batch(std::slice::from_ref(record)).await
    }

    /// Upserts several records atomically. Nothing is written if any record is invalid.
    pub async fn upsert_batch(&self, records: &[VectorRecord]) -> Result<(), IndexError> {
        for record in records {
            self.validate_vector(&record.vector)?;
        }
        if records.is_empty() {
            return Ok(());
        }
        self.bounded("upsert", self.inner.backend.upsert(records))
            .await
    }

    /// Makes `records` the complete face set of `photo_id`: upserts them and removes the
    /// photo's other records in one atomic step. Returns the number of stale records removed.
    #[instrument(skip(self, records), fields(faces = records.len()), err(Debug))]
    pub async fn replace_photo(
        &self,
        photo_id: i64,
        records: &[VectorRecord],
    ) -> Result<u64, IndexError> {
        for record in records {
            self.validate_vector(&record.vector)?;
            if record.photo_id() != photo_id {
                return Err(IndexError::CorruptRecord {
                    id: record.id.clone(),
                    reason: format!("record does not belong to photo {photo_id}"),
                });
            }
        }
        let removed = self
            .bounded(
                "replace_photo",
                self.inner.backend.replace_photo(photo_id, records),
            )
            .await?;
        if removed > 0 {
            info!("Removed {} stale faces of photo {}", removed, photo_id);
        }
        Ok(removed)
    }

    /// Cosine search within one event.
    ///
    /// Returns at most `limit` matches with similarity `>= score_threshold`, ordered by
    /// descending similarity and then ascending id. An unknown event yields no matches.
    #[instrument(skip(self, query), err(Debug))]
    pub async fn search(
        &self,
        query: &[f32],
        event_id: i64,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchMatch>, IndexError> {
        if !score_threshold.is_finite() {
            return Err(IndexError::InvalidThreshold(score_threshold));
        }
        self.validate_vector(query)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let normalized = scorer::l2_normalize(query)?;
        let mut candidates = self
            .bounded(
                "search",
                self.inner
                    .backend
                    .search(&normalized, event_id, limit, score_threshold),
            )
            .await?;

        let before = candidates.len();
        candidates.retain(|record| record.event_id() == event_id);
        if candidates.len() != before {
            warn!(
                "Backend {} returned {} records outside event {}",
                self.inner.backend.name(),
                before - candidates.len(),
                event_id
            );
        }

        let matches = scorer::rank(query, &candidates, limit, score_threshold)?;
        debug!(
            "{} of {} candidates matched in event {}",
            matches.len(),
            candidates.len(),
            event_id
        );
        Ok(matches)
    }

    /// Removes every record of an event. Deleting an empty event reports 0.
    #[instrument(skip(self), err(Debug))]
    pub async fn delete_by_event(&self, event_id: i64) -> Result<u64, IndexError> {
        self.bounded(
            "delete_by_event",
            self.inner.backend.delete_by_event(event_id),
        )
        .await
    }

    #[instrument(skip(self), err(Debug))]
    pub async fn delete_by_photo(&self, photo_id: i64) -> Result<u64, IndexError> {
        self.bounded(
            "delete_by_photo",
            self.inner.backend.delete_by_photo(photo_id),
        )
        .await
    }

    pub async fn stats(&self) -> Result<IndexStats, IndexError> {
        self.bounded("stats", self.inner.backend.stats()).await
    }

    /// Releases the storage connection. Called once at process shutdown.
    pub async fn shutdown(&self) {
        info!("Closing {} backend", self.inner.backend.name());
        self.inner.backend.close().await;
    }
}
