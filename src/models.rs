use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Typed metadata stored alongside each document in the vector store.
///
/// Every field is optional: ingestion from the hosting API can leave gaps,
/// and the formatter degrades each gap to an explicit "unknown" marker
/// rather than branching on ad hoc key presence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub organization: Option<String>,
    pub repository: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub is_archived: Option<bool>,
    pub language: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Narrative summary generated at ingest time.
    pub ai_summary: Option<String>,
}

/// One retrieved document, normalized from a batch position.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    /// Unique per document within a data vintage; the deduplication key.
    pub id: String,
    pub organization: Option<String>,
    pub repository: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub is_archived: Option<bool>,
    pub language: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub ai_summary: Option<String>,
    /// Cosine dissimilarity against the query vector; lower is closer.
    pub distance: f32,
    /// The query terms that surfaced this hit.
    pub matched_keywords: Vec<String>,
}

impl ResultRecord {
    pub fn from_meta(id: String, meta: DocumentMeta, distance: f32) -> Self {
        Self {
            id,
            organization: meta.organization,
            repository: meta.repository,
            url: meta.url,
            description: meta.description,
            is_private: meta.is_private,
            is_archived: meta.is_archived,
            language: meta.language,
            updated_at: meta.updated_at,
            ai_summary: meta.ai_summary,
            distance,
            matched_keywords: Vec::new(),
        }
    }
}

/// Raw output of one nearest-neighbor query: four positionally-aligned
/// sequences. Alignment is checked before any record is constructed; a
/// mismatch invalidates the whole batch.
#[derive(Debug, Clone, Default)]
pub struct ResultBatch {
    /// The keyword whose embedding produced this batch, when known.
    pub query_term: Option<String>,
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub distances: Vec<f32>,
    pub metadatas: Vec<DocumentMeta>,
}

impl ResultBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check that the four parallel sequences have equal length.
    pub fn check_aligned(&self) -> Result<(), crate::error::RetrievalError> {
        let (ids, docs, dists, metas) = (
            self.ids.len(),
            self.documents.len(),
            self.distances.len(),
            self.metadatas.len(),
        );
        if ids == docs && ids == dists && ids == metas {
            Ok(())
        } else {
            Err(crate::error::RetrievalError::MalformedBatch {
                ids,
                documents: docs,
                distances: dists,
                metadatas: metas,
            })
        }
    }
}

/// The working and final output of one retrieval turn: records keyed by id,
/// iterated in ascending-distance order once sorted.
///
/// `removed_count` tracks threshold and truncation drops only; duplicate
/// collapses are tracked separately in `deduped_count` so the two are never
/// conflated in what is reported to the user.
#[derive(Debug, Default)]
pub struct ResultSet {
    records: Vec<ResultRecord>,
    by_id: HashMap<String, usize>,
    pub removed_count: usize,
    pub deduped_count: usize,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&ResultRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// Insert a record, collapsing duplicates by id. The lowest-distance
    /// occurrence wins; on an exact tie the first-seen occurrence is kept,
    /// preserving its position. Matched keywords from both occurrences are
    /// merged either way.
    pub fn insert(&mut self, record: ResultRecord) {
        match self.by_id.get(&record.id) {
            Some(&pos) => {
                let existing = &mut self.records[pos];
                let new_terms: Vec<String> = record
                    .matched_keywords
                    .iter()
                    .filter(|k| !existing.matched_keywords.contains(k))
                    .cloned()
                    .collect();
                if record.distance < existing.distance {
                    let mut keywords = existing.matched_keywords.clone();
                    keywords.extend(new_terms);
                    *existing = record;
                    existing.matched_keywords = keywords;
                } else {
                    existing.matched_keywords.extend(new_terms);
                }
                self.deduped_count += 1;
            }
            None => {
                self.by_id.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Keep only records matching the predicate. Removal is by value, not
    /// by positional index, so there is no index-shift hazard.
    pub fn retain<F: FnMut(&ResultRecord) -> bool>(&mut self, f: F) {
        self.records.retain(f);
        self.rebuild_index();
    }

    /// Stable sort by ascending distance; insertion order breaks exact ties.
    pub fn sort_by_distance(&mut self) {
        self.records.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.rebuild_index();
    }

    /// Drop everything past `limit`, returning how many were dropped.
    pub fn truncate(&mut self, limit: usize) -> usize {
        let dropped = self.records.len().saturating_sub(limit);
        self.records.truncate(limit);
        self.rebuild_index();
        dropped
    }

    fn rebuild_index(&mut self) {
        self.by_id = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}

/// What the pipeline hands back to the conversational layer.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// Per-record blocks joined with the fixed separator, ready to render.
    pub display_text: String,
    /// Records excluded by thresholding or truncation this turn.
    pub removed_count: usize,
    /// Duplicate occurrences collapsed during the merge this turn.
    pub deduped_count: usize,
    pub is_empty: bool,
    pub matched_keywords: Vec<String>,
}

/// A single chat turn (system, user or assistant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted on the first turn; the server mints a session.
    pub session_id: Option<Uuid>,
    /// Override the configured result budget for this turn.
    pub result_budget: Option<usize>,
    /// Override the configured distance threshold for this turn.
    pub distance_threshold: Option<f32>,
}

/// Chat response body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub reply: String,
    /// True when retrieval ran but every candidate was filtered out.
    pub results_empty: bool,
    pub removed_count: usize,
    pub matched_keywords: Vec<String>,
}
