//! Compliance agent (PII detection/redaction) and hash-chained audit
//! ledger (spec.md §4.8, §4.10).

pub mod audit;
mod compliance;
mod pii;

pub use compliance::ComplianceAgent;
pub use pii::{redact_text, PiiPattern, PII_PATTERNS};
