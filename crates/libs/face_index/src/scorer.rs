//! Cosine similarity and the ranking order used by search.
//!
//! Vectors are L2-normalized at comparison time, never at storage time. Every score the
//! index returns is produced by [`rank`], so a search result always equals a fresh
//! [`cosine_similarity`] between the query and the stored vector.

use crate::IndexError;
use common_types::{SearchMatch, VectorRecord};
use std::cmp::Ordering;

/// Euclidean norm of a vector.
#[must_use]
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Divides a vector by its Euclidean norm.
///
/// # Errors
///
/// Returns `DegenerateVector` when the norm is zero or not finite.
pub fn l2_normalize(vector: &[f32]) -> Result<Vec<f32>, IndexError> {
    let norm = l2_norm(vector);
    if norm == 0.0 || !norm.is_finite() {
        return Err(IndexError::DegenerateVector);
    }
    Ok(vector.iter().map(|x| x / norm).collect())
}

/// Dot product of two normalized vectors, clamped to `[-1, 1]` to absorb rounding.
fn normalized_dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| x * y)
        .sum::<f32>()
        .clamp(-1.0, 1.0)
}

/// Cosine similarity of two embeddings of equal length.
///
/// # Errors
///
/// `DimensionMismatch` if the lengths differ, `DegenerateVector` if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, IndexError> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(normalized_dot(&l2_normalize(a)?, &l2_normalize(b)?))
}

/// Result order: descending similarity, then ascending vector id.
#[must_use]
pub fn compare_matches(a: &SearchMatch, b: &SearchMatch) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.vector_id.cmp(&b.vector_id))
}

/// Scores `candidates` against `query`, drops everything strictly below `score_threshold`,
/// sorts with [`compare_matches`] and keeps at most `limit` matches.
pub fn rank<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = &'a VectorRecord>,
    limit: usize,
    score_threshold: f32,
) -> Result<Vec<SearchMatch>, IndexError> {
    let query = l2_normalize(query)?;
    let mut matches = Vec::new();
    for record in candidates {
        if record.vector.len() != query.len() {
            return Err(IndexError::DimensionMismatch {
                expected: query.len(),
                actual: record.vector.len(),
            });
        }
        let similarity = normalized_dot(&query, &l2_normalize(&record.vector)?);
        if similarity < score_threshold {
            continue;
        }
        matches.push(SearchMatch {
            vector_id: record.id.clone(),
            similarity,
            metadata: record.metadata.clone(),
        });
    }
    matches.sort_by(compare_matches);
    matches.truncate(limit);
    Ok(matches)
}
