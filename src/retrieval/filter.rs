//! Reduction of raw neighbor batches into one ranked result set.
//!
//! The steps run in a fixed order: merge and dedupe, threshold, sort,
//! truncate. Truncation must come after dedup and thresholding or both the
//! reported removed count and the top-k semantics would drift.

use crate::error::RetrievalError;
use crate::models::{ResultBatch, ResultRecord, ResultSet};

/// Merge batches into a single deduplicated set.
///
/// A batch whose parallel sequences disagree on length is logged and
/// dropped whole; remaining batches still merge. Duplicate ids collapse to
/// the lowest-distance occurrence and count toward `deduped_count`, never
/// `removed_count`.
pub fn merge_and_dedupe(batches: &[ResultBatch]) -> ResultSet {
    let mut set = ResultSet::new();

    for batch in batches {
        if let Err(e) = batch.check_aligned() {
            tracing::warn!("dropping batch for term {:?}: {e}", batch.query_term);
            continue;
        }
        for i in 0..batch.len() {
            let mut record = ResultRecord::from_meta(
                batch.ids[i].clone(),
                batch.metadatas[i].clone(),
                batch.distances[i],
            );
            if let Some(term) = &batch.query_term {
                record.matched_keywords.push(term.clone());
            }
            set.insert(record);
        }
    }

    set
}

/// Drop every record with distance above `threshold`, counting the drops.
/// Applying the same threshold twice is a no-op on the count.
pub fn apply_distance_threshold(set: &mut ResultSet, threshold: f32) {
    let before = set.len();
    set.retain(|r| r.distance <= threshold);
    set.removed_count += before - set.len();
}

/// Ascending distance order, stable on exact ties.
pub fn sort_by_relevance(set: &mut ResultSet) {
    set.sort_by_distance();
}

/// Keep the first `limit` records post-sort, counting the drops.
pub fn truncate(set: &mut ResultSet, limit: usize) -> Result<(), RetrievalError> {
    if limit < 1 {
        return Err(RetrievalError::InvalidQueryBudget(format!(
            "truncation limit must be at least 1, got {limit}"
        )));
    }
    set.removed_count += set.truncate(limit);
    Ok(())
}

/// The full reduction: merge, threshold, sort, truncate.
///
/// Empty input yields an empty set with zero counts; a threshold that
/// excludes everything is a valid, reportable empty result, not an error.
pub fn reduce(
    batches: &[ResultBatch],
    threshold: f32,
    limit: usize,
) -> Result<ResultSet, RetrievalError> {
    if limit < 1 {
        return Err(RetrievalError::InvalidQueryBudget(format!(
            "result limit must be at least 1, got {limit}"
        )));
    }
    if !(threshold >= 0.0) {
        return Err(RetrievalError::InvalidQueryBudget(format!(
            "distance threshold must be non-negative, got {threshold}"
        )));
    }

    let mut set = merge_and_dedupe(batches);
    apply_distance_threshold(&mut set, threshold);
    sort_by_relevance(&mut set);
    truncate(&mut set, limit)?;
    Ok(set)
}
