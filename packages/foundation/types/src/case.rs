use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of case submitted for triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    InsuranceClaim,
    HealthcarePriorAuth,
    BankDispute,
    LegalIntake,
    FraudReview,
}

impl CaseType {
    pub const ALL: [CaseType; 5] = [
        CaseType::InsuranceClaim,
        CaseType::HealthcarePriorAuth,
        CaseType::BankDispute,
        CaseType::LegalIntake,
        CaseType::FraudReview,
    ];
}

/// Caller-declared urgency. Declaration order doubles as tie-break order
/// when the classifier's rule-based path needs a deterministic winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [Urgency::Low, Urgency::Medium, Urgency::High, Urgency::Critical];
}

/// Risk tier assigned by the risk scorer.
///
/// `Extreme` is part of the enum because a case may arrive already carrying
/// it (e.g. re-submitted after upstream enrichment); the risk scorer itself
/// never produces `Extreme` on its own — its `score_to_level` function has
/// arms only for `High`/`Medium`/`Low` (see `agentkern-arbiter::risk_scorer`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

/// An open-ended metadata value. Only the `String` variant participates in
/// text concatenation, PII redaction, and keyword scanning; the rest are
/// carried through unchanged (mirrors the Python `isinstance(value, str)`
/// guards scattered through `classifier.py`/`risk_scorer.py`/`compliance.py`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// An opaque attachment descriptor. The core never inspects attachment
/// bytes; only `Case::has_attachments` feeds the risk scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub filename: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// A case submitted for triage.
///
/// Per spec.md §3, `title` and `description` are required to be non-empty
/// after trim at the HTTP boundary; the core itself tolerates missing
/// fields by surfacing them in `ClassificationResult::missing_fields`
/// rather than rejecting the case outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, MetadataValue>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    /// Caller-supplied hint; the classifier never trusts it blindly but the
    /// end-to-end scenarios in spec.md §8 submit it directly.
    #[serde(default)]
    pub case_type_hint: Option<CaseType>,
    #[serde(default)]
    pub urgency_hint: Option<Urgency>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl Case {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// All free text concatenated and lowercased: title, description, and
    /// every string metadata value, in sorted-key order for determinism
    /// (`HashMap` iteration order is not stable). Mirrors
    /// `ClassifierAgent._extract_text` in the original source.
    pub fn text_corpus(&self) -> String {
        let mut keys: Vec<&String> = self.metadata.keys().collect();
        keys.sort();
        let mut parts = Vec::with_capacity(2 + keys.len());
        if !self.title.is_empty() {
            parts.push(self.title.clone());
        }
        if !self.description.is_empty() {
            parts.push(self.description.clone());
        }
        for k in keys {
            if let Some(s) = self.metadata.get(k).and_then(MetadataValue::as_str) {
                parts.push(format!("{k}: {s}"));
            }
        }
        parts.join(" ").to_lowercase()
    }
}
