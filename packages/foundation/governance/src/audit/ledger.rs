use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::json;
use sha2::{Digest, Sha256};

use agentkern_types::{AgentSummary, AuditEntry};

/// Data classes named in spec.md §4.10, each with its own retention floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    AuditLogs,
    CaseData,
    PiiData,
}

/// Computes the retention deadline for a data class, anchored at `from`.
/// Literal day counts: `audit_logs` 365, `case_data` 2555 (7y), `pii_data` 90.
pub fn retention_deadline_for(class: DataClass, from: DateTime<Utc>) -> DateTime<Utc> {
    let days = match class {
        DataClass::AuditLogs => 365,
        DataClass::CaseData => 2555,
        DataClass::PiiData => 90,
    };
    from + Duration::days(days)
}

/// An append-only hash chain of `AuditEntry` records. One `AuditChain`
/// instance is scoped to one logical ledger (in this workspace, the
/// process); `append` is the only mutator and is guarded by a single mutex
/// covering read-tail / compute-hash / write-tail as one atomic step,
/// matching "Audit chain tail pointer: protected by a mutex" (spec.md §5).
pub struct AuditChain {
    tail: Mutex<Option<String>>,
    entries: Mutex<Vec<AuditEntry>>,
}

impl Default for AuditChain {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditChain {
    pub fn new() -> Self {
        Self {
            tail: Mutex::new(None),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Canonical JSON over the hash-chained fields, sorted keys, no
    /// extraneous whitespace. `serde_json::Map` iterates in sorted key
    /// order by default (the `preserve_order` feature, which would switch
    /// to insertion order, is not enabled anywhere in this workspace), so
    /// `to_string` alone satisfies the "sorted keys" requirement.
    fn canonical_json(
        case_id: &str,
        timestamp: DateTime<Utc>,
        audit_id: &str,
        pii_detected: bool,
        pii_types: &[String],
        agent_summaries: &[AgentSummary],
        previous_hash: &str,
    ) -> String {
        let summaries: Vec<_> = agent_summaries
            .iter()
            .map(|s| {
                json!({
                    "agent_name": s.agent_name,
                    "confidence": s.confidence,
                    "processing_time_ms": s.processing_time_ms,
                })
            })
            .collect();
        let value = json!({
            "case_id": case_id,
            "timestamp": timestamp.to_rfc3339(),
            "audit_id": audit_id,
            "pii_detected": pii_detected,
            "pii_types": pii_types,
            "agent_summaries": summaries,
            "previous_hash": previous_hash,
        });
        serde_json::to_string(&value).expect("canonical audit json never fails to serialize")
    }

    fn hash(material: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Appends a new entry to the chain, computing `current_hash` from the
    /// canonical JSON of the given fields plus whatever `previous_hash` the
    /// chain's tail currently holds (empty string for the genesis entry).
    pub fn append(
        &self,
        audit_id: String,
        timestamp: DateTime<Utc>,
        case_id: String,
        agent_summaries: Vec<AgentSummary>,
        pii_detected: bool,
        pii_types: Vec<String>,
        data_class: DataClass,
    ) -> AuditEntry {
        let mut tail = self.tail.lock();
        let previous_hash = tail.clone().unwrap_or_default();
        let material = Self::canonical_json(
            &case_id,
            timestamp,
            &audit_id,
            pii_detected,
            &pii_types,
            &agent_summaries,
            &previous_hash,
        );
        let current_hash = Self::hash(&material);
        let entry = AuditEntry {
            audit_id,
            timestamp,
            case_id,
            agent_summaries,
            pii_detected,
            pii_types,
            previous_hash,
            current_hash: current_hash.clone(),
            retention_deadline: retention_deadline_for(data_class, timestamp),
        };
        *tail = Some(current_hash);
        self.entries.lock().push(entry.clone());
        entry
    }

    /// Recomputes `current_hash` for `entry` from its own fields and
    /// compares; used by readers to verify the chain (spec.md §6, "Audit
    /// chain").
    pub fn verify(entry: &AuditEntry) -> bool {
        let material = Self::canonical_json(
            &entry.case_id,
            entry.timestamp,
            &entry.audit_id,
            entry.pii_detected,
            &entry.pii_types,
            &entry.agent_summaries,
            &entry.previous_hash,
        );
        Self::hash(&material) == entry.current_hash
    }

    /// Verifies that every consecutive pair in a slice of entries links
    /// correctly: `next.previous_hash == prev.current_hash`.
    pub fn verify_chain(entries: &[AuditEntry]) -> bool {
        entries.iter().all(Self::verify)
            && entries
                .windows(2)
                .all(|w| w[1].previous_hash == w[0].current_hash)
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn tail_hash(&self) -> Option<String> {
        self.tail.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries() -> Vec<AgentSummary> {
        vec![AgentSummary {
            agent_name: "ClassifierAgent".to_string(),
            confidence: 0.9,
            processing_time_ms: 5,
        }]
    }

    #[test]
    fn genesis_entry_has_empty_previous_hash() {
        let chain = AuditChain::new();
        let entry = chain.append(
            "a1".to_string(),
            Utc::now(),
            "case-1".to_string(),
            summaries(),
            false,
            vec![],
            DataClass::AuditLogs,
        );
        assert_eq!(entry.previous_hash, "");
        assert_eq!(entry.current_hash.len(), 64);
    }

    #[test]
    fn consecutive_entries_link() {
        let chain = AuditChain::new();
        let e1 = chain.append(
            "a1".to_string(),
            Utc::now(),
            "case-1".to_string(),
            summaries(),
            false,
            vec![],
            DataClass::AuditLogs,
        );
        let e2 = chain.append(
            "a2".to_string(),
            Utc::now(),
            "case-2".to_string(),
            summaries(),
            true,
            vec!["ssn".to_string()],
            DataClass::AuditLogs,
        );
        assert_eq!(e2.previous_hash, e1.current_hash);
        assert!(AuditChain::verify_chain(&[e1, e2]));
    }

    #[test]
    fn tampered_entry_fails_verification() {
        let chain = AuditChain::new();
        let mut entry = chain.append(
            "a1".to_string(),
            Utc::now(),
            "case-1".to_string(),
            summaries(),
            false,
            vec![],
            DataClass::AuditLogs,
        );
        entry.case_id = "tampered".to_string();
        assert!(!AuditChain::verify(&entry));
    }
}
