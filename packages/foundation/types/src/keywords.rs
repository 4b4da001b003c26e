//! Literal keyword sets from spec.md's GLOSSARY. Centralized here because
//! both the classifier (case-type/urgency keywords) and the risk
//! scorer/router (fraud/urgency/complexity/financial indicator buckets)
//! need the same literal lists, and a spec literal should have exactly one
//! home rather than being re-typed per crate.

use crate::case::{CaseType, Urgency};

pub fn case_type_keywords(case_type: CaseType) -> &'static [&'static str] {
    match case_type {
        CaseType::InsuranceClaim => &[
            "claim", "insurance", "policy", "coverage", "premium", "deductible", "medical",
            "dental", "vision", "accident", "disability",
        ],
        CaseType::HealthcarePriorAuth => &[
            "prior authorization",
            "pre-authorization",
            "medical necessity",
            "treatment plan",
            "prescription",
            "medication",
            "procedure",
        ],
        CaseType::BankDispute => &[
            "dispute",
            "chargeback",
            "fraudulent",
            "unauthorized",
            "bank",
            "credit card",
            "debit",
            "transaction",
            "refund",
        ],
        CaseType::LegalIntake => &[
            "legal",
            "attorney",
            "lawyer",
            "lawsuit",
            "litigation",
            "contract",
            "breach",
            "damages",
            "settlement",
            "court",
        ],
        CaseType::FraudReview => &[
            "fraud",
            "suspicious",
            "investigation",
            "identity theft",
            "forgery",
            "counterfeit",
            "embezzlement",
            "money laundering",
        ],
    }
}

pub fn urgency_keywords(urgency: Urgency) -> &'static [&'static str] {
    match urgency {
        Urgency::Critical => &[
            "emergency",
            "urgent",
            "immediate",
            "critical",
            "life-threatening",
            "severe",
            "acute",
            "trauma",
            "cardiac",
            "stroke",
        ],
        Urgency::High => &[
            "high priority",
            "important",
            "time-sensitive",
            "deadline",
            "escalation",
            "complaint",
            "dispute",
        ],
        Urgency::Medium => &["standard", "routine", "normal", "regular", "scheduled"],
        Urgency::Low => &["low priority", "non-urgent", "routine", "maintenance", "inquiry"],
    }
}

/// GLOSSARY — "Fraud indicators".
pub const FRAUD_INDICATORS: &[&str] = &[
    "suspicious",
    "unusual",
    "unexpected",
    "anomaly",
    "irregular",
    "duplicate",
    "multiple claims",
    "recent policy",
    "high amount",
];

/// GLOSSARY — "Urgency indicators" (distinct from the classifier's own
/// per-urgency-level keyword sets above; this flat bucket feeds the risk
/// scorer's pattern-count features).
pub const URGENCY_INDICATORS: &[&str] = &[
    "emergency",
    "urgent",
    "immediate",
    "critical",
    "time-sensitive",
    "deadline",
    "escalation",
    "complaint",
];

/// GLOSSARY — "Complexity indicators".
pub const COMPLEXITY_INDICATORS: &[&str] = &[
    "complex",
    "complicated",
    "multiple parties",
    "legal",
    "litigation",
    "dispute",
    "appeal",
    "review",
    "investigation",
];

/// GLOSSARY — "Financial indicators".
pub const FINANCIAL_INDICATORS: &[&str] = &[
    "high value",
    "large amount",
    "expensive",
    "costly",
    "premium",
    "deductible",
    "coverage",
    "policy limit",
];

pub fn count_matches(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}
