use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::{DocumentMeta, ResultBatch};

/// Filename prefix for persisted collections. The ingest timestamp follows
/// the prefix, with colons replaced by underscores so names stay
/// filesystem-safe: `repos-2025-01-17T09_30_00.123456.json`.
const COLLECTION_PREFIX: &str = "repos-";

/// A stored document: the embedded text blob, its vector, and typed metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    pub meta: DocumentMeta,
}

/// In-memory vector store with disk persistence and cosine distance search.
///
/// Each ingest run writes a new collection file named after its timestamp;
/// the store serves the newest collection found on disk, and that
/// timestamp is the data vintage reported to users.
pub struct VectorStore {
    entries: RwLock<Vec<StoredDocument>>,
    collection_name: String,
    persist_path: PathBuf,
}

impl VectorStore {
    /// Open the most recent collection under `vector_dir`, or start an
    /// empty one named for the current time.
    pub fn open_or_create(vector_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(vector_dir)?;

        let latest = latest_collection_file(vector_dir)?;
        let (collection_name, persist_path, entries) = match latest {
            Some(path) => {
                let data = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read collection {}", path.display()))?;
                let entries: Vec<StoredDocument> = serde_json::from_str(&data)
                    .with_context(|| format!("failed to parse collection {}", path.display()))?;
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(COLLECTION_PREFIX)
                    .to_string();
                (name, path, entries)
            }
            None => {
                let name = new_collection_name();
                let path = vector_dir.join(format!("{name}.json"));
                (name, path, Vec::new())
            }
        };

        tracing::info!(
            "serving collection {} ({} documents)",
            collection_name,
            entries.len()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            collection_name,
            persist_path,
        })
    }

    /// Add documents and persist the collection.
    pub fn add_documents(&self, docs: Vec<StoredDocument>) -> Result<()> {
        let mut entries = self.entries.write();
        entries.extend(docs);

        let data = serde_json::to_string(&*entries)?;
        std::fs::write(&self.persist_path, data)?;
        Ok(())
    }

    /// Nearest-neighbor query: the `k` stored documents closest to
    /// `query_embedding` by cosine distance, nearest first. Returns fewer
    /// than `k` when the collection holds fewer documents.
    pub fn query(&self, query_embedding: &[f32], k: usize) -> ResultBatch {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &StoredDocument)> = entries
            .iter()
            .map(|e| (cosine_distance(query_embedding, &e.embedding), e))
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut batch = ResultBatch::default();
        for (distance, doc) in scored {
            batch.ids.push(doc.id.clone());
            batch.documents.push(doc.document.clone());
            batch.distances.push(distance);
            batch.metadatas.push(doc.meta.clone());
        }
        batch
    }

    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Human-readable data vintage parsed from the collection name.
    pub fn vintage(&self) -> Option<String> {
        vintage_from_collection_name(&self.collection_name)
    }
}

/// Parse the ingest timestamp out of a collection name and render it as
/// `Friday, 17 January, 2025 at 09:30`.
pub fn vintage_from_collection_name(name: &str) -> Option<String> {
    let stamp = name.strip_prefix(COLLECTION_PREFIX)?.replace('_', ":");
    let parsed = NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(parsed.format("%A, %d %B, %Y at %H:%M").to_string())
}

fn new_collection_name() -> String {
    let stamp = Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H_%M_%S%.6f")
        .to_string();
    format!("{COLLECTION_PREFIX}{stamp}")
}

/// Newest collection file in the directory. Timestamps are zero-padded, so
/// the lexicographically greatest filename is the most recent ingest.
fn latest_collection_file(vector_dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(vector_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "json")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(COLLECTION_PREFIX))
        })
        .collect();
    candidates.sort();
    Ok(candidates.pop())
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        // Incomparable vectors rank last
        return 1.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        1.0
    } else {
        1.0 - dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            document: format!("document {id}"),
            embedding,
            meta: DocumentMeta {
                repository: Some(id.to_string()),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_cosine_distance_identical_vectors() {
        let d = cosine_distance(&[1.0, 0.0], &[1.0, 0.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_orthogonal_vectors() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_mismatched_lengths() {
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_query_returns_nearest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        store
            .add_documents(vec![
                doc("far", vec![0.0, 1.0]),
                doc("near", vec![1.0, 0.05]),
                doc("exact", vec![1.0, 0.0]),
            ])
            .unwrap();

        let batch = store.query(&[1.0, 0.0], 2);
        assert_eq!(batch.ids, vec!["exact", "near"]);
        assert!(batch.distances[0] <= batch.distances[1]);
        batch.check_aligned().unwrap();
    }

    #[test]
    fn test_query_fewer_than_k() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        store.add_documents(vec![doc("only", vec![1.0, 0.0])]).unwrap();

        let batch = store.query(&[1.0, 0.0], 10);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_query_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open_or_create(dir.path()).unwrap();
        assert!(store.query(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_reopen_serves_latest_collection() {
        let dir = tempfile::tempdir().unwrap();
        let older = dir.path().join("repos-2024-01-01T00_00_00.000000.json");
        let newer = dir.path().join("repos-2025-06-15T12_00_00.000000.json");
        std::fs::write(
            &older,
            serde_json::to_string(&vec![doc("old", vec![1.0])]).unwrap(),
        )
        .unwrap();
        std::fs::write(
            &newer,
            serde_json::to_string(&vec![doc("new", vec![1.0])]).unwrap(),
        )
        .unwrap();

        let store = VectorStore::open_or_create(dir.path()).unwrap();
        assert_eq!(store.collection_name(), "repos-2025-06-15T12_00_00.000000");
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.query(&[1.0], 1).ids, vec!["new"]);
    }

    #[test]
    fn test_vintage_from_collection_name() {
        let vintage = vintage_from_collection_name("repos-2025-01-17T09_30_00.123456").unwrap();
        assert_eq!(vintage, "Friday, 17 January, 2025 at 09:30");
    }

    #[test]
    fn test_vintage_rejects_unparseable_name() {
        assert!(vintage_from_collection_name("not-a-collection").is_none());
        assert!(vintage_from_collection_name("repos-garbage").is_none());
    }
}
