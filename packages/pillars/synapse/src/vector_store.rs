use std::collections::HashMap;

use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};

pub const EMBEDDING_DIM: usize = 384;
pub type Embedding = [f32; EMBEDDING_DIM];

pub const KNOWLEDGE_BASE: &str = "knowledge_base";
pub const DOCUMENTS: &str = "documents";
pub const POLICIES: &str = "policies";
pub const SOPS: &str = "sops";

const COLLECTIONS: [&str; 4] = [KNOWLEDGE_BASE, DOCUMENTS, POLICIES, SOPS];

/// Produces a stable embedding for a piece of text. Swappable behind this
/// trait so a real model can replace [`DeterministicEncoder`] without
/// touching [`VectorStore`].
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Embedding;
}

/// A SHA-256-seeded PRNG embedding: stable across repeated calls for the
/// same text within one process, without depending on a live model
/// (spec.md §4.2, "configurable but stable").
pub struct DeterministicEncoder;

impl Embedder for DeterministicEncoder {
    fn embed(&self, text: &str) -> Embedding {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        let mut rng = StdRng::from_seed(seed);
        std::array::from_fn(|_| rng.random::<f32>() * 2.0 - 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub text: String,
    pub embedding: Embedding,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: Entry,
    pub similarity: f32,
}

fn cosine_similarity(a: &Embedding, b: &Embedding) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Four fixed collections (`knowledge_base`, `documents`, `policies`,
/// `sops`), each holding `(id, embedding, text, metadata)` entries behind a
/// `parking_lot::RwLock`. Grounded in the teacher's
/// `state_snapshot`/`ConnectorRegistry` locking idiom, generalized to a
/// per-collection store of embedded entries.
pub struct VectorStore<E: Embedder = DeterministicEncoder> {
    embedder: E,
    collections: HashMap<&'static str, RwLock<Vec<Entry>>>,
}

impl VectorStore<DeterministicEncoder> {
    pub fn new() -> Self {
        Self::with_embedder(DeterministicEncoder)
    }
}

impl Default for VectorStore<DeterministicEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Embedder> VectorStore<E> {
    pub fn with_embedder(embedder: E) -> Self {
        let collections = COLLECTIONS.iter().map(|c| (*c, RwLock::new(Vec::new()))).collect();
        Self { embedder, collections }
    }

    /// Adds `text` to `collection`, id'd by the hex SHA-256 of
    /// `collection:text` so re-adding identical content is idempotent.
    pub fn add(&self, collection: &str, text: &str, metadata: HashMap<String, serde_json::Value>) -> Option<String> {
        let store = self.collections.get(collection)?;
        let id = hex::encode(Sha256::digest(format!("{collection}:{text}").as_bytes()));
        let embedding = self.embedder.embed(text);
        let mut entries = store.write();
        if !entries.iter().any(|e| e.id == id) {
            entries.push(Entry { id: id.clone(), text: text.to_string(), embedding, metadata });
        }
        Some(id)
    }

    /// Cosine-similarity search within `collection`, filtered by
    /// `threshold`, sorted descending, truncated to `n`.
    pub fn query(&self, collection: &str, query_text: &str, threshold: f32, n: usize) -> Vec<ScoredEntry> {
        let Some(store) = self.collections.get(collection) else { return Vec::new() };
        let query_embedding = self.embedder.embed(query_text);
        let mut scored: Vec<ScoredEntry> = store
            .read()
            .iter()
            .map(|entry| ScoredEntry {
                entry: entry.clone(),
                similarity: cosine_similarity(&entry.embedding, &query_embedding),
            })
            .filter(|s| s.similarity >= threshold)
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n);
        scored
    }

    /// Fans out three `query` calls — `knowledge_base` filtered by
    /// `metadata.category == case_type`, `policies`, and `sops` — returning
    /// results keyed by collection name (spec.md §4.2).
    pub fn decision_support(&self, context: &str, case_type: &str, n: usize) -> HashMap<&'static str, Vec<ScoredEntry>> {
        let mut results = HashMap::new();

        let kb_hits: Vec<ScoredEntry> = self
            .query(KNOWLEDGE_BASE, context, 0.0, n * 4)
            .into_iter()
            .filter(|s| {
                s.entry
                    .metadata
                    .get("category")
                    .and_then(|v| v.as_str())
                    .map(|c| c == case_type)
                    .unwrap_or(false)
            })
            .take(n)
            .collect();
        results.insert(KNOWLEDGE_BASE, kb_hits);
        results.insert(POLICIES, self.query(POLICIES, context, 0.0, n));
        results.insert(SOPS, self.query(SOPS, context, 0.0, n));
        results
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|s| s.read().len()).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_stable_for_same_text() {
        let encoder = DeterministicEncoder;
        assert_eq!(encoder.embed("hello"), encoder.embed("hello"));
    }

    #[test]
    fn embedding_differs_for_different_text() {
        let encoder = DeterministicEncoder;
        assert_ne!(encoder.embed("hello"), encoder.embed("world"));
    }

    #[test]
    fn add_is_idempotent_for_identical_content() {
        let store = VectorStore::new();
        let id1 = store.add(DOCUMENTS, "same text", HashMap::new()).unwrap();
        let id2 = store.add(DOCUMENTS, "same text", HashMap::new()).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(DOCUMENTS), 1);
    }

    #[test]
    fn query_filters_by_threshold_and_truncates() {
        let store = VectorStore::new();
        for i in 0..5 {
            store.add(DOCUMENTS, &format!("document number {i}"), HashMap::new());
        }
        let results = store.query(DOCUMENTS, "document number 0", -1.0, 2);
        assert!(results.len() <= 2);
    }

    #[test]
    fn decision_support_filters_knowledge_base_by_category() {
        let store = VectorStore::new();
        let mut meta = HashMap::new();
        meta.insert("category".to_string(), serde_json::json!("insurance_claim"));
        store.add(KNOWLEDGE_BASE, "insurance policy guidance", meta);

        let mut other_meta = HashMap::new();
        other_meta.insert("category".to_string(), serde_json::json!("bank_dispute"));
        store.add(KNOWLEDGE_BASE, "banking regulations", other_meta);

        let results = store.decision_support("policy guidance", "insurance_claim", 5);
        let kb = &results[KNOWLEDGE_BASE];
        assert!(kb.iter().all(|s| s.entry.metadata.get("category").and_then(|v| v.as_str()) == Some("insurance_claim")));
    }
}
