use crate::IndexError;
use crate::backend::VectorBackend;
use async_trait::async_trait;
use common_types::{BoundingBox, FaceMetadata, IndexStats, VectorRecord};
use pgvector::Vector;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};

/// Extra rows fetched past `limit`, so rounding differences between pgvector's `<=>`
/// and the scorer cannot push a tied record out of the candidate set.
const CANDIDATE_MARGIN: usize = 16;

/// Subtracted from the threshold in SQL for the same reason; the index re-applies the
/// exact bound.
const THRESHOLD_SLACK: f64 = 1e-4;

#[derive(Debug, FromRow)]
struct FaceRow {
    id: String,
    photo_id: i64,
    event_id: i64,
    face_index: i64,
    bbox: Vec<f32>,
    confidence: f32,
    embedding: Vector,
}

impl TryFrom<FaceRow> for VectorRecord {
    type Error = IndexError;

    fn try_from(row: FaceRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: &str| IndexError::CorruptRecord {
            id: row.id.clone(),
            reason: reason.to_owned(),
        };
        let bbox: [f32; 4] = row
            .bbox
            .as_slice()
            .try_into()
            .map_err(|_| corrupt("bbox must have four values"))?;
        let face_index =
            u32::try_from(row.face_index).map_err(|_| corrupt("face_index out of range"))?;

        Ok(Self {
            vector: row.embedding.to_vec(),
            metadata: FaceMetadata {
                photo_id: row.photo_id,
                event_id: row.event_id,
                face_index,
                bbox: BoundingBox::from(bbox),
                confidence: row.confidence,
            },
            id: row.id,
        })
    }
}

/// SQL with the collection's table name baked in.
struct Statements {
    upsert: String,
    delete_stale: String,
    search: String,
    delete_by_event: String,
    delete_by_photo: String,
    count: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            upsert: format!(
                r"
                INSERT INTO {table} (id, photo_id, event_id, face_index, bbox, confidence, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE SET
                    photo_id = EXCLUDED.photo_id,
                    event_id = EXCLUDED.event_id,
                    face_index = EXCLUDED.face_index,
                    bbox = EXCLUDED.bbox,
                    confidence = EXCLUDED.confidence,
                    embedding = EXCLUDED.embedding
                "
            ),
            delete_stale: format!("DELETE FROM {table} WHERE photo_id = $1 AND NOT (id = ANY($2))"),
            search: format!(
                r"
                SELECT id, photo_id, event_id, face_index, bbox, confidence, embedding
                FROM {table}
                WHERE event_id = $1
                  AND 1 - (embedding <=> $2) >= $3
                ORDER BY embedding <=> $2, id
                LIMIT $4
                "
            ),
            delete_by_event: format!("DELETE FROM {table} WHERE event_id = $1"),
            delete_by_photo: format!("DELETE FROM {table} WHERE photo_id = $1"),
            count: format!("SELECT count(*) FROM {table}"),
        }
    }
}

/// PostgreSQL + pgvector backend. One table per collection, cosine distance.
pub struct PgVectorBackend {
    pool: PgPool,
    table: String,
    statements: Statements,
}

impl PgVectorBackend {
    /// Creates the backend. Nothing is sent to the database until the first operation.
    ///
    /// # Errors
    ///
    /// `InvalidCollectionName` unless the name is a lowercase SQL identifier.
    pub fn new(pool: PgPool, collection: &str) -> Result<Self, IndexError> {
        let valid = collection
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && collection
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid || collection.len() > 48 {
            return Err(IndexError::InvalidCollectionName(collection.to_owned()));
        }
        Ok(Self {
            pool,
            table: collection.to_owned(),
            statements: Statements::new(collection),
        })
    }

    async fn upsert_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        records: &[VectorRecord],
    ) -> Result<(), IndexError> {
        for record in records {
            let bbox: [f32; 4] = record.metadata.bbox.into();
            sqlx::query(&self.statements.upsert)
                .bind(&record.id)
                .bind(record.metadata.photo_id)
                .bind(record.metadata.event_id)
                .bind(i64::from(record.metadata.face_index))
                .bind(bbox.to_vec())
                .bind(record.metadata.confidence)
                .bind(Vector::from(record.vector.clone()))
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorBackend for PgVectorBackend {
    fn name(&self) -> &'static str {
        "pgvector"
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<(), IndexError> {
        let table = &self.table;
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                photo_id BIGINT NOT NULL,
                event_id BIGINT NOT NULL,
                face_index BIGINT NOT NULL,
                bbox REAL[] NOT NULL,
                confidence REAL NOT NULL,
                embedding vector({dimensions}) NOT NULL
            )
            "
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_event_id_idx ON {table} (event_id)"
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_photo_id_idx ON {table} (photo_id)"
        ))
        .execute(&self.pool)
        .await?;

        // For the vector type the column's typmod is its dimensionality.
        let existing: i32 = sqlx::query_scalar(
            r"
            SELECT atttypmod FROM pg_attribute
            WHERE attrelid = to_regclass($1) AND attname = 'embedding'
            ",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        if usize::try_from(existing).ok() != Some(dimensions) {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                actual: usize::try_from(existing).unwrap_or_default(),
            });
        }

        info!("Collection {} ready with {} dimensions", table, dimensions);
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await?;
        self.upsert_in(&mut tx, records).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_photo(
        &self,
        photo_id: i64,
        records: &[VectorRecord],
    ) -> Result<u64, IndexError> {
        let keep: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(&self.statements.delete_stale)
            .bind(photo_id)
            .bind(&keep)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        self.upsert_in(&mut tx, records).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn search(
        &self,
        query: &[f32],
        event_id: i64,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<VectorRecord>, IndexError> {
        let candidate_limit = i64::try_from(limit.saturating_add(CANDIDATE_MARGIN)).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, FaceRow>(&self.statements.search)
            .bind(event_id)
            .bind(Vector::from(query.to_vec()))
            .bind(f64::from(score_threshold) - THRESHOLD_SLACK)
            .bind(candidate_limit)
            .fetch_all(&self.pool)
            .await?;
        debug!("pgvector returned {} candidates for event {}", rows.len(), event_id);
        rows.into_iter().map(VectorRecord::try_from).collect()
    }

    async fn delete_by_event(&self, event_id: i64) -> Result<u64, IndexError> {
        let result = sqlx::query(&self.statements.delete_by_event)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_photo(&self, photo_id: i64) -> Result<u64, IndexError> {
        let result = sqlx::query(&self.statements.delete_by_photo)
            .bind(photo_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        let count: i64 = sqlx::query_scalar(&self.statements.count)
            .fetch_one(&self.pool)
            .await?;
        Ok(IndexStats {
            record_count: u64::try_from(count).unwrap_or_default(),
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
