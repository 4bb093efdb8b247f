//! The end-to-end retrieval turn: embed keywords, query the index once per
//! keyword, reduce the batches, render the survivors, and record them in
//! the session's export table.

use chrono::Utc;

use crate::config::LlmConfig;
use crate::error::RetrievalError;
use crate::format::{append_to_export, render_result_set};
use crate::llm::embeddings::{embed_batch, EmbedPurpose};
use crate::models::PipelineOutcome;
use crate::retrieval::filter;
use crate::session::ExportTable;
use crate::store::vector::VectorStore;

/// Run one retrieval turn.
///
/// Input constraints are checked before any external call: `keywords`
/// non-empty, `result_budget >= 1`, `distance_threshold >= 0`. A failure
/// of the embedding capability surfaces as `RetrievalUnavailable` and
/// leaves the export table untouched; rows are appended only once the
/// whole turn has succeeded.
#[allow(clippy::too_many_arguments)]
pub async fn execute(
    client: &reqwest::Client,
    llm: &LlmConfig,
    store: &VectorStore,
    export_table: &mut ExportTable,
    keywords: &[String],
    result_budget: usize,
    distance_threshold: f32,
    user_query_text: &str,
) -> Result<PipelineOutcome, RetrievalError> {
    if keywords.is_empty() {
        return Err(RetrievalError::InvalidQueryBudget(
            "at least one keyword is required".to_string(),
        ));
    }
    if result_budget < 1 {
        return Err(RetrievalError::InvalidQueryBudget(format!(
            "result budget must be at least 1, got {result_budget}"
        )));
    }
    if !(distance_threshold >= 0.0) {
        return Err(RetrievalError::InvalidQueryBudget(format!(
            "distance threshold must be non-negative, got {distance_threshold}"
        )));
    }

    tracing::info!(
        "retrieval turn: {} keyword(s) for query {:?}, budget {}, threshold {}",
        keywords.len(),
        user_query_text,
        result_budget,
        distance_threshold
    );

    let embeddings = embed_batch(client, llm, keywords, EmbedPurpose::Query)
        .await
        .map_err(RetrievalError::RetrievalUnavailable)?;
    if embeddings.len() != keywords.len() {
        return Err(RetrievalError::RetrievalUnavailable(anyhow::anyhow!(
            "expected {} embeddings, got {}",
            keywords.len(),
            embeddings.len()
        )));
    }

    // Fetch headroom per keyword so threshold filtering can still fill the
    // budget.
    let fetch_k = result_budget * 2;
    let batches: Vec<_> = keywords
        .iter()
        .zip(&embeddings)
        .map(|(keyword, embedding)| {
            let mut batch = store.query(embedding, fetch_k);
            batch.query_term = Some(keyword.clone());
            batch
        })
        .collect();

    let set = filter::reduce(&batches, distance_threshold, result_budget)?;
    tracing::info!(
        "reduced to {} record(s); removed {}, deduped {}",
        set.len(),
        set.removed_count,
        set.deduped_count
    );

    let now = Utc::now();
    let display_text = render_result_set(&set, now);
    append_to_export(export_table, &set, now);

    Ok(PipelineOutcome {
        display_text,
        removed_count: set.removed_count,
        deduped_count: set.deduped_count,
        is_empty: set.is_empty(),
        matched_keywords: keywords.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::session::ExportTable;
    use crate::store::vector::VectorStore;

    // Validation must reject before any network call, so a client pointed
    // at nothing and an empty store are safe here.
    fn fixtures() -> (reqwest::Client, LlmConfig, VectorStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        (reqwest::Client::new(), LlmConfig::default(), store, dir)
    }

    #[tokio::test]
    async fn test_rejects_empty_keywords() {
        let (client, llm, store, _dir) = fixtures();
        let mut table = ExportTable::default();
        let err = execute(&client, &llm, &store, &mut table, &[], 5, 1.0, "query")
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_zero_budget() {
        let (client, llm, store, _dir) = fixtures();
        let mut table = ExportTable::default();
        let keywords = vec!["prisons".to_string()];
        let err = execute(&client, &llm, &store, &mut table, &keywords, 0, 1.0, "query")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQueryBudget(_)));
    }

    #[tokio::test]
    async fn test_rejects_negative_threshold() {
        let (client, llm, store, _dir) = fixtures();
        let mut table = ExportTable::default();
        let keywords = vec!["prisons".to_string()];
        let err = execute(&client, &llm, &store, &mut table, &keywords, 5, -1.0, "query")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidQueryBudget(_)));
    }

    #[tokio::test]
    async fn test_embedding_outage_leaves_export_table_untouched() {
        let (client, mut llm, store, _dir) = fixtures();
        // Nothing listens here; the embed call fails fast.
        llm.base_url = "http://127.0.0.1:1".to_string();
        let mut table = ExportTable::default();
        let keywords = vec!["prisons".to_string()];
        let err = execute(&client, &llm, &store, &mut table, &keywords, 5, 1.0, "query")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::RetrievalUnavailable(_)));
        assert!(table.is_empty());
    }
}
