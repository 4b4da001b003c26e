//! Audit hash chain (spec.md §4.10).
//!
//! An append-only sequence of `AuditEntry` records linked by
//! `current_hash = SHA-256(canonical_json(fields ∪ {previous_hash}))`. The
//! chain tail is protected by a single mutex so that read-tail / compute /
//! write-tail happens atomically with respect to the `previous_hash` a
//! given entry was built from (spec.md §5).

mod ledger;

pub use ledger::{retention_deadline_for, AuditChain, DataClass};
