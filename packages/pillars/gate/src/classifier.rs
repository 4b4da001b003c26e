use std::collections::HashSet;
use std::time::Instant;

use agentkern_types::{keywords, Case, CaseType, ClassificationResult, Config, Urgency};
use async_trait::async_trait;

/// Capability probe for an LLM-backed classifier. Absent unless a caller
/// injects one via [`ClassifierAgent::with_llm`] — mirrors
/// `settings.openai_api_key` / `settings.anthropic_api_key` being unset in
/// the original, which short-circuits `_classify_with_llm` to `None`.
#[async_trait]
pub trait LlmClassifier: Send + Sync {
    async fn classify(&self, text: &str, case: &Case) -> Option<RawClassification>;
}

/// Capability probe for a trained case-type/urgency model. Absent unless
/// injected via [`ClassifierAgent::with_model`].
pub trait ClassifierModel: Send + Sync {
    fn classify(&self, text: &str) -> Option<RawClassification>;
}

/// An un-timed classification candidate, before processing-time bookkeeping
/// and missing-field derivation are attached.
#[derive(Debug, Clone)]
pub struct RawClassification {
    pub case_type: CaseType,
    pub urgency: Urgency,
    pub confidence: f64,
    pub reasoning: String,
}

/// Classifies a case by type and urgency with a three-step hybrid cascade:
/// an optional LLM pass, an optional ML pass, and a rule-based keyword
/// fallback that always succeeds. Grounded in
/// `backend/agents/classifier.py::ClassifierAgent`.
pub struct ClassifierAgent {
    confidence_threshold: f64,
    llm: Option<Box<dyn LlmClassifier>>,
    model: Option<Box<dyn ClassifierModel>>,
}

impl ClassifierAgent {
    pub fn new(config: &Config) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            llm: None,
            model: None,
        }
    }

    pub fn with_llm(mut self, llm: Box<dyn LlmClassifier>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_model(mut self, model: Box<dyn ClassifierModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub async fn classify(&self, case: &Case) -> agentkern_types::AgentResult<ClassificationResult> {
        let start = Instant::now();
        let text = case.text_corpus();

        let outcome = self.classify_inner(case, &text).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => agentkern_types::AgentResult::new(
                "ClassifierAgent",
                result.confidence,
                result,
                reasoning_of(),
                elapsed,
            ),
            Err(reason) => agentkern_types::AgentResult::soft_failure(
                "ClassifierAgent",
                ClassificationResult {
                    case_type: CaseType::InsuranceClaim,
                    urgency: Urgency::Medium,
                    confidence: 0.5,
                    reasoning: format!("Classification failed: {reason}"),
                    missing_fields: vec!["classification_error".to_string()],
                },
                format!("Classification failed: {reason}"),
                elapsed,
                reason,
            ),
        }
    }

    async fn classify_inner(&self, case: &Case, text: &str) -> Result<ClassificationResult, String> {
        let llm_result = match &self.llm {
            Some(llm) => llm.classify(text, case).await,
            None => None,
        };

        if let Some(ref llm) = llm_result {
            if llm.confidence >= self.confidence_threshold {
                return Ok(finish(llm.clone(), case));
            }
        }

        let ml_result = self.model.as_ref().and_then(|m| m.classify(text));
        let fallback = ml_result
            .unwrap_or_else(|| classify_with_rules(text, case.case_type_hint, case.urgency_hint));

        let combined = combine(llm_result, fallback);
        Ok(finish(combined, case))
    }
}

fn reasoning_of() -> &'static str {
    "classification complete"
}

/// A caller-supplied hint nudges, but never overrides outright, the
/// keyword tally for its own candidate — enough to win a near-tie against
/// weak textual evidence, not enough to beat a type/level with clearly
/// stronger keyword support. Mirrors the "never trusts it blindly" rule
/// on `Case::case_type_hint`/`Case::urgency_hint`.
const HINT_BONUS: usize = 2;

/// Rule-based keyword matching. Always produces a result — the terminal
/// step of the cascade. Ties break on enum declaration order via `ALL`.
fn classify_with_rules(
    text: &str,
    case_type_hint: Option<CaseType>,
    urgency_hint: Option<Urgency>,
) -> RawClassification {
    let mut best_case_type = CaseType::ALL[0];
    let mut best_case_score = 0usize;
    for case_type in CaseType::ALL {
        let mut score = keywords::count_matches(text, keywords::case_type_keywords(case_type));
        if case_type_hint == Some(case_type) {
            score += HINT_BONUS;
        }
        if score > best_case_score {
            best_case_score = score;
            best_case_type = case_type;
        }
    }
    let case_type_confidence = (best_case_score as f64 / 3.0).min(0.8);

    let mut best_urgency = Urgency::ALL[0];
    let mut best_urgency_score = 0usize;
    for urgency in Urgency::ALL {
        let mut score = keywords::count_matches(text, keywords::urgency_keywords(urgency));
        if urgency_hint == Some(urgency) {
            score += HINT_BONUS;
        }
        if score > best_urgency_score {
            best_urgency_score = score;
            best_urgency = urgency;
        }
    }
    let urgency_confidence = (best_urgency_score as f64 / 3.0).min(0.8);

    RawClassification {
        case_type: best_case_type,
        urgency: best_urgency,
        confidence: (case_type_confidence + urgency_confidence) / 2.0,
        reasoning: format!(
            "Rule-based classification (case_type: {case_type_confidence:.2}, urgency: {urgency_confidence:.2})"
        ),
    }
}

/// Combines an optional LLM candidate with the ML/rule-based fallback.
/// `±0.1` confidence gap picks the clear winner outright; otherwise the two
/// are averaged (spec.md §4.4, "Combination rule").
fn combine(llm: Option<RawClassification>, fallback: RawClassification) -> RawClassification {
    let Some(llm) = llm else { return fallback };

    if llm.confidence > fallback.confidence + 0.1 {
        return llm;
    }
    if fallback.confidence > llm.confidence + 0.1 {
        return fallback;
    }

    let higher_confidence_wins = llm.confidence > fallback.confidence;
    RawClassification {
        case_type: if higher_confidence_wins { llm.case_type } else { fallback.case_type },
        urgency: if higher_confidence_wins { llm.urgency } else { fallback.urgency },
        confidence: (llm.confidence + fallback.confidence) / 2.0,
        reasoning: format!(
            "Combined: LLM ({:.2}) + fallback ({:.2})",
            llm.confidence, fallback.confidence
        ),
    }
}

fn finish(raw: RawClassification, case: &Case) -> ClassificationResult {
    ClassificationResult {
        case_type: raw.case_type,
        urgency: raw.urgency,
        confidence: raw.confidence,
        reasoning: raw.reasoning,
        missing_fields: identify_missing_fields(case, raw.case_type),
    }
}

fn identify_missing_fields(case: &Case, case_type: CaseType) -> Vec<String> {
    let mut missing = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |field: &str, missing: &mut Vec<String>, seen: &mut HashSet<String>| {
        if seen.insert(field.to_string()) {
            missing.push(field.to_string());
        }
    };

    if case.title.trim().is_empty() {
        push("title", &mut missing, &mut seen);
    }
    if case.description.trim().is_empty() {
        push("description", &mut missing, &mut seen);
    }

    match case_type {
        CaseType::InsuranceClaim => {
            if case.amount.is_none() {
                push("claim_amount", &mut missing, &mut seen);
            }
            if case.customer_id.is_none() {
                push("customer_id", &mut missing, &mut seen);
            }
        }
        CaseType::HealthcarePriorAuth => {
            if case.customer_id.is_none() {
                push("patient_id", &mut missing, &mut seen);
            }
            if !case.metadata.contains_key("provider") {
                push("provider_information", &mut missing, &mut seen);
            }
        }
        _ => {}
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_types::Config;
    use std::collections::HashMap;

    fn base_case() -> Case {
        Case {
            id: "case-1".to_string(),
            title: "Disputed credit card transaction".to_string(),
            description: "Customer reports an unauthorized debit transaction on their account."
                .to_string(),
            customer_id: Some("cust-1".to_string()),
            amount: Some(245.00),
            metadata: HashMap::new(),
            attachments: vec![],
            case_type_hint: None,
            urgency_hint: None,
            submitted_at: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        }
    }

    #[tokio::test]
    async fn rule_based_path_classifies_bank_dispute() {
        let agent = ClassifierAgent::new(&Config::default());
        let result = agent.classify(&base_case()).await;
        assert_eq!(result.result.case_type, CaseType::BankDispute);
        assert!(!result.is_soft_failure());
    }

    #[tokio::test]
    async fn missing_fields_reported_for_empty_case() {
        let mut case = base_case();
        case.title.clear();
        case.description.clear();
        case.customer_id = None;
        case.amount = None;

        let agent = ClassifierAgent::new(&Config::default());
        let result = agent.classify(&case).await;
        assert!(result.result.missing_fields.contains(&"title".to_string()));
        assert!(result.result.missing_fields.contains(&"description".to_string()));
    }

    struct StubLlm(RawClassification);

    #[async_trait]
    impl LlmClassifier for StubLlm {
        async fn classify(&self, _text: &str, _case: &Case) -> Option<RawClassification> {
            Some(self.0.clone())
        }
    }

    #[tokio::test]
    async fn confident_llm_result_short_circuits_fallback() {
        let agent = ClassifierAgent::new(&Config::default()).with_llm(Box::new(StubLlm(
            RawClassification {
                case_type: CaseType::LegalIntake,
                urgency: Urgency::High,
                confidence: 0.95,
                reasoning: "LLM classification".to_string(),
            },
        )));

        let result = agent.classify(&base_case()).await;
        assert_eq!(result.result.case_type, CaseType::LegalIntake);
        assert_eq!(result.result.urgency, Urgency::High);
    }

    #[test]
    fn combine_picks_clear_winner_outright() {
        let llm = RawClassification {
            case_type: CaseType::LegalIntake,
            urgency: Urgency::High,
            confidence: 0.9,
            reasoning: String::new(),
        };
        let fallback = RawClassification {
            case_type: CaseType::BankDispute,
            urgency: Urgency::Medium,
            confidence: 0.5,
            reasoning: String::new(),
        };
        let combined = combine(Some(llm), fallback);
        assert_eq!(combined.case_type, CaseType::LegalIntake);
    }

    #[tokio::test]
    async fn case_type_hint_breaks_a_near_tie_in_keyword_evidence() {
        let mut case = base_case();
        case.title = "Suspicious duplicate claim".to_string();
        case.description = "Multiple claims submitted within 48 hours on a brand-new policy".to_string();
        case.case_type_hint = Some(CaseType::FraudReview);

        let agent = ClassifierAgent::new(&Config::default());
        let result = agent.classify(&case).await;
        assert_eq!(result.result.case_type, CaseType::FraudReview);
    }

    #[tokio::test]
    async fn case_type_hint_does_not_override_strong_textual_evidence() {
        let mut case = base_case();
        case.case_type_hint = Some(CaseType::LegalIntake);

        let agent = ClassifierAgent::new(&Config::default());
        let result = agent.classify(&case).await;
        assert_eq!(result.result.case_type, CaseType::BankDispute);
    }
}
