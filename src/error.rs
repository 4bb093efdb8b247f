use thiserror::Error;

/// Errors surfaced by the retrieval pipeline.
///
/// Validation failures are rejected before any external call is made.
/// Failures of the embedding or chat capabilities all collapse into
/// `RetrievalUnavailable` so callers do not special-case providers.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// A result batch's parallel sequences disagree on length. The batch
    /// is dropped from the merge rather than truncated or misaligned.
    #[error(
        "malformed result batch: {ids} ids, {documents} documents, \
         {distances} distances, {metadatas} metadatas"
    )]
    MalformedBatch {
        ids: usize,
        documents: usize,
        distances: usize,
        metadatas: usize,
    },

    #[error("invalid query budget: {0}")]
    InvalidQueryBudget(String),

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(anyhow::Error),
}

impl RetrievalError {
    /// True for errors the caller caused, as opposed to capability outages.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RetrievalError::MalformedBatch { .. } | RetrievalError::InvalidQueryBudget(_)
        )
    }
}
