//! Vector knowledge base and the decision support agent that queries it.
//!
//! `vector_store` implements spec.md §4.2 (embedding store, cosine
//! similarity, the four fixed collections); `decision_support` implements
//! §4.7 (suggested actions, templated response, checklist, knowledge
//! retrieval).

mod decision_support;
mod vector_store;

pub use decision_support::{load_templates, DecisionSupportAgent};
pub use vector_store::{
    DeterministicEncoder, Embedder, Entry, ScoredEntry, VectorStore, DOCUMENTS, EMBEDDING_DIM,
    KNOWLEDGE_BASE, POLICIES, SOPS,
};
