//! Integration tests for the retrieval flow.
//!
//! These exercise the store → filter → format → export path end to end
//! with hand-made embeddings, without requiring a running LLM.

use chrono::{TimeZone, Utc};

use repo_chat::format::{append_to_export, render_result_set};
use repo_chat::models::DocumentMeta;
use repo_chat::retrieval::filter;
use repo_chat::session::Session;
use repo_chat::store::vector::{StoredDocument, VectorStore};

/// A small corpus of repository metadata documents with 3-dimensional
/// embeddings laid out so each axis stands for a topic.
fn sample_corpus() -> Vec<StoredDocument> {
    let doc = |id: &str, org: &str, desc: &str, lang: &str, embedding: Vec<f32>| StoredDocument {
        id: id.to_string(),
        document: format!("Name: {id}, Description: {desc}"),
        embedding,
        meta: DocumentMeta {
            organization: Some(org.to_string()),
            repository: Some(id.to_string()),
            url: Some(format!("https://example.org/{org}/{id}")),
            description: Some(desc.to_string()),
            is_private: Some(false),
            is_archived: Some(false),
            language: Some(lang.to_string()),
            updated_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()),
            ai_summary: Some(format!("Summary of {id}.")),
        },
    };

    vec![
        doc(
            "sentencing-data",
            "justice-org",
            "Sentencing statistics pipeline",
            "Python",
            vec![1.0, 0.0, 0.0],
        ),
        doc(
            "prison-dashboard",
            "justice-org",
            "Dashboard for prison population",
            "R",
            vec![0.9, 0.3, 0.0],
        ),
        doc(
            "ml-classifier",
            "data-org",
            "Machine learning text classifier",
            "Rust",
            vec![0.0, 1.0, 0.0],
        ),
        doc(
            "web-styles",
            "platform-org",
            "Shared CSS assets",
            "CSS",
            vec![0.0, 0.0, 1.0],
        ),
    ]
}

fn seeded_store(dir: &std::path::Path) -> VectorStore {
    let store = VectorStore::open_or_create(dir).unwrap();
    store.add_documents(sample_corpus()).unwrap();
    store
}

#[test]
fn full_retrieval_turn_without_llm() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());

    // Two keyword vectors: one near the justice topic, one near ML.
    let keyword_vectors = vec![
        ("sentencing".to_string(), vec![1.0f32, 0.1, 0.0]),
        ("machine learning".to_string(), vec![0.1f32, 1.0, 0.0]),
    ];

    let batches: Vec<_> = keyword_vectors
        .iter()
        .map(|(term, vector)| {
            let mut batch = store.query(vector, 4);
            batch.query_term = Some(term.clone());
            batch
        })
        .collect();

    let set = filter::reduce(&batches, 0.5, 3).unwrap();
    assert!(!set.is_empty());
    assert!(set.len() <= 3);

    // Ascending distance order throughout
    let distances: Vec<f32> = set.records().iter().map(|r| r.distance).collect();
    let mut sorted = distances.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(distances, sorted);

    // The nearest record to the sentencing keyword survives with its term
    let top = set.get("sentencing-data").unwrap();
    assert!(top.matched_keywords.contains(&"sentencing".to_string()));

    // The off-topic CSS repo is filtered out by the threshold
    assert!(set.get("web-styles").is_none());

    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    let text = render_result_set(&set, now);
    assert!(text.contains("Repo Name: sentencing-data"));
    assert!(text.contains("(9 days ago)."));
    assert!(text.contains("AI Summary: Summary of sentencing-data."));
}

#[test]
fn dedup_across_keyword_batches_keeps_lowest_distance() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());

    // Two nearby query vectors both surface the same documents.
    let a = store.query(&[1.0, 0.0, 0.0], 4);
    let b = store.query(&[0.95, 0.05, 0.0], 4);
    let total = a.len() + b.len();

    let set = filter::reduce(&[a, b], 2.0, 10).unwrap();
    assert_eq!(set.len(), 4);
    assert_eq!(set.deduped_count, total - 4);
    // Dedup collapses are not threshold removals
    assert_eq!(set.removed_count, 0);
}

#[test]
fn export_table_accumulates_across_turns_and_resets() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let mut session = Session::new();
    let now = Utc::now();

    for _ in 0..2 {
        let batch = store.query(&[1.0, 0.0, 0.0], 4);
        let set = filter::reduce(&[batch], 0.5, 2).unwrap();
        assert_eq!(set.len(), 2);
        append_to_export(&mut session.export_table, &set, now);
    }
    assert_eq!(session.export_table.len(), 4);

    let tsv = session.export_table.to_tsv();
    assert_eq!(tsv.lines().count(), 5); // header + 4 rows
    assert!(tsv.lines().nth(1).unwrap().contains("justice-org"));

    session.reset();
    assert_eq!(session.export_table.len(), 0);
    assert_eq!(session.export_table.to_tsv().lines().count(), 1);
}

#[test]
fn tight_threshold_yields_reportable_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());

    let batch = store.query(&[0.5, 0.5, 0.5], 4);
    let candidates = batch.len();
    let set = filter::reduce(&[batch], 0.0001, 5).unwrap();
    assert!(set.is_empty());
    assert_eq!(set.removed_count, candidates);
}

#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let name = {
        let store = seeded_store(dir.path());
        store.collection_name().to_string()
    };

    let reopened = VectorStore::open_or_create(dir.path()).unwrap();
    assert_eq!(reopened.collection_name(), name);
    assert_eq!(reopened.entry_count(), 4);
    assert!(reopened.vintage().is_some());
}
