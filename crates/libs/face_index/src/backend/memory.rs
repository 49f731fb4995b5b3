use crate::IndexError;
use crate::backend::VectorBackend;
use async_trait::async_trait;
use common_types::{IndexStats, VectorRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-process backend. The lock is only taken inside synchronous sections.
#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, VectorRecord>>,
    dimensions: AtomicUsize,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimensionality the collection was provisioned with, if any.
    #[must_use]
    pub fn provisioned_dimensions(&self) -> Option<usize> {
        match self.dimensions.load(Ordering::Acquire) {
            0 => None,
            dims => Some(dims),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.read().get(id).cloned()
    }

    fn delete_where(&self, predicate: impl Fn(&VectorRecord) -> bool) -> u64 {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| !predicate(record));
        (before - records.len()) as u64
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<(), IndexError> {
        match self
            .dimensions
            .compare_exchange(0, dimensions, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(existing) if existing == dimensions => Ok(()),
            Err(existing) => Err(IndexError::DimensionMismatch {
                expected: dimensions,
                actual: existing,
            }),
        }
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), IndexError> {
        let mut stored = self.records.write();
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn replace_photo(
        &self,
        photo_id: i64,
        records: &[VectorRecord],
    ) -> Result<u64, IndexError> {
        let mut stored = self.records.write();
        let before = stored.len();
        stored.retain(|id, record| {
            record.photo_id() != photo_id || records.iter().any(|r| &r.id == id)
        });
        let removed = (before - stored.len()) as u64;
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(removed)
    }

    async fn search(
        &self,
        _query: &[f32],
        event_id: i64,
        _limit: usize,
        _score_threshold: f32,
    ) -> Result<Vec<VectorRecord>, IndexError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| record.event_id() == event_id)
            .cloned()
            .collect())
    }

    async fn delete_by_event(&self, event_id: i64) -> Result<u64, IndexError> {
        Ok(self.delete_where(|record| record.event_id() == event_id))
    }

    async fn delete_by_photo(&self, photo_id: i64) -> Result<u64, IndexError> {
        Ok(self.delete_where(|record| record.photo_id() == photo_id))
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        Ok(IndexStats {
            record_count: self.records.read().len() as u64,
        })
    }

    async fn close(&self) {}
}
