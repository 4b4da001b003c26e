use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Deserialize;

use agentkern_infra::Cache;
use agentkern_types::{
    AgentResult, Case, CaseType, ClassificationResult, DecisionSupportResult, RiskLevel,
    RiskScoreResult, RoutingResult,
};

/// TTL for the cached `knowledge_sources` lookup keyed by `(case_type,
/// context)` (spec.md §2, "Cache ... consulted opportunistically ... inside
/// Decision Support").
const KNOWLEDGE_CACHE_TTL: Duration = Duration::from_secs(300);

use crate::vector_store::{Embedder, VectorStore, KNOWLEDGE_BASE, POLICIES, SOPS};

/// One template file's body, as loaded from `templates/<name>.json`.
/// Mirrors `DecisionSupportAgent._load_templates` in the original source —
/// small JSON files of the shape `{"body": "..."}"`.
#[derive(Debug, Clone, Deserialize)]
struct TemplateFile {
    body: String,
}

/// Picks the template file stem for a `(case_type, risk_level)` pair.
/// `None` means "no template matches, use the fallback string" (spec.md
/// §4.7). Only the case types the original source shipped templates for
/// (insurance, healthcare, bank, legal) have one; fraud_review always
/// falls back, matching the original's `templates` dict having no
/// `fraud_*` entries.
fn template_name_for(case_type: CaseType, risk_level: RiskLevel) -> Option<&'static str> {
    let high = matches!(risk_level, RiskLevel::High | RiskLevel::Extreme);
    match case_type {
        CaseType::InsuranceClaim => Some(if high { "insurance_denial" } else { "insurance_approval" }),
        CaseType::HealthcarePriorAuth => Some(if high { "healthcare_denial" } else { "healthcare_approval" }),
        CaseType::BankDispute => Some(if high { "bank_debit" } else { "bank_credit" }),
        CaseType::LegalIntake => Some("legal_consultation"),
        CaseType::FraudReview => None,
    }
}

const FALLBACK_TEMPLATE: &str =
    "Your {case_type} case ({case_id}) has been received and is under review. \
We will follow up with {customer_name} regarding the ${amount} amount shortly.";

/// Static per-`(case_type, risk_level)` base action table (spec.md §4.7),
/// supplemented with urgency/team/risk-level additions. Carried over
/// verbatim from `backend/agents/decision_support.py`'s literal
/// `action_patterns` dict, which has no `fraud_review` key — fraud_review
/// cases get an empty base-actions list there (`.get(case_type, {})` on a
/// dict with no such key), reproduced here as `FraudReview => vec![]`
/// rather than inventing text the original never produces. `Extreme`
/// shares the `High` arm; the original has no tier above `high_risk`.
fn base_actions(case_type: CaseType, risk_level: RiskLevel) -> Vec<&'static str> {
    use CaseType::*;
    use RiskLevel::*;
    match (case_type, risk_level) {
        (InsuranceClaim, Low) => {
            vec!["Process standard approval", "Send confirmation letter", "Update customer records", "Close case"]
        }
        (InsuranceClaim, Medium) => {
            vec!["Review claim details", "Request supporting documents", "Verify policy coverage", "Calculate settlement amount"]
        }
        (InsuranceClaim, High) | (InsuranceClaim, Extreme) => {
            vec!["Request additional documentation", "Schedule fraud investigation", "Notify compliance team", "Set up monitoring alerts"]
        }
        (HealthcarePriorAuth, Low) => {
            vec!["Approve treatment", "Send approval letter", "Update authorization system", "Notify provider"]
        }
        (HealthcarePriorAuth, Medium) => {
            vec!["Review treatment plan", "Verify medical necessity", "Check coverage criteria", "Make determination"]
        }
        (HealthcarePriorAuth, High) | (HealthcarePriorAuth, Extreme) => {
            vec!["Request medical records", "Consult with medical director", "Schedule peer review", "Notify provider of decision"]
        }
        (BankDispute, Low) => {
            vec!["Process chargeback", "Send dispute letter", "Update customer account", "Monitor for resolution"]
        }
        (BankDispute, Medium) => {
            vec!["Review transaction history", "Contact customer for details", "Investigate merchant", "Make provisional credit decision"]
        }
        (BankDispute, High) | (BankDispute, Extreme) => {
            vec!["Freeze account activity", "Initiate fraud investigation", "Contact law enforcement", "Notify compliance officer"]
        }
        (LegalIntake, Low) => {
            vec!["Schedule standard consultation", "Send welcome packet", "Create client file", "Assign paralegal"]
        }
        (LegalIntake, Medium) => {
            vec!["Review case details", "Schedule consultation", "Prepare initial assessment", "Assign case number"]
        }
        (LegalIntake, High) | (LegalIntake, Extreme) => {
            vec!["Schedule urgent consultation", "Prepare legal documents", "Notify senior attorney", "Set up case management"]
        }
        (FraudReview, _) => vec![],
    }
}

fn urgency_additions(urgency: agentkern_types::Urgency) -> Vec<&'static str> {
    use agentkern_types::Urgency::*;
    match urgency {
        Critical => vec!["Notify on-call supervisor", "Respond within 1 hour"],
        High => vec!["Prioritize in queue"],
        _ => vec![],
    }
}

fn team_additions(team: &str) -> Vec<&'static str> {
    match team {
        "Fraud-Review" => vec!["Notify fraud investigations unit"],
        "Specialist" => vec!["Route to specialist team for domain review"],
        "Escalation" => vec!["Notify escalation desk", "Log for leadership visibility"],
        _ => vec![],
    }
}

fn risk_additions(risk_level: RiskLevel) -> Vec<&'static str> {
    match risk_level {
        RiskLevel::High | RiskLevel::Extreme => {
            vec!["Document risk rationale", "Enable enhanced monitoring"]
        }
        _ => vec![],
    }
}

/// Deduplicates preserving first occurrence (spec.md §4.7).
fn dedup_preserve_order(items: Vec<&'static str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|i| seen.insert(*i))
        .map(str::to_string)
        .collect()
}

fn base_checklist() -> Vec<&'static str> {
    vec!["Confirm case identity", "Record decision rationale"]
}

fn case_type_checklist(case_type: CaseType) -> Vec<&'static str> {
    use CaseType::*;
    match case_type {
        InsuranceClaim => vec!["Confirm policy number", "Confirm claim amount"],
        HealthcarePriorAuth => vec!["Confirm patient identity", "Confirm provider NPI"],
        BankDispute => vec!["Confirm account number", "Confirm transaction ID"],
        LegalIntake => vec!["Confirm client engagement letter"],
        FraudReview => vec!["Confirm prior case history"],
    }
}

fn risk_checklist(risk_level: RiskLevel) -> Vec<&'static str> {
    match risk_level {
        RiskLevel::High | RiskLevel::Extreme => vec!["Obtain second reviewer sign-off"],
        _ => vec![],
    }
}

fn substitute(template: &str, case: &Case, case_type: CaseType, risk_level: RiskLevel) -> String {
    let customer_name = case.customer_id.clone().unwrap_or_else(|| "Customer".to_string());
    let amount = case.amount.map(|a| format!("{a:.2}")).unwrap_or_else(|| "0.00".to_string());
    template
        .replace("{customer_name}", &customer_name)
        .replace("{case_id}", &case.id)
        .replace("{amount}", &amount)
        .replace("{case_type}", &format!("{case_type:?}"))
        .replace("{risk_level}", &format!("{risk_level:?}"))
}

/// Decision support agent: suggested actions, a templated response, a
/// checklist, and knowledge-base retrieval. Grounded in
/// `backend/agents/decision_support.py::DecisionSupportAgent`.
pub struct DecisionSupportAgent<'a, E: Embedder> {
    store: &'a VectorStore<E>,
    templates: HashMap<String, String>,
    cache: Option<&'a Cache>,
}

/// Loads `*.json` template files from `templates_dir` into memory. A
/// missing or unreadable directory returns an empty map, which degrades
/// every lookup to "use the fallback string" (mirrors the Python
/// `try/except: self.templates = {}`).
pub fn load_templates(templates_dir: impl AsRef<Path>) -> HashMap<String, String> {
    let mut templates = HashMap::new();
    if let Ok(entries) = std::fs::read_dir(templates_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let Ok(body) = std::fs::read_to_string(&path) else { continue };
            match serde_json::from_str::<TemplateFile>(&body) {
                Ok(parsed) => {
                    templates.insert(stem.to_string(), parsed.body);
                }
                Err(reason) => {
                    tracing::warn!(template = stem, %reason, "skipping malformed template file");
                }
            }
        }
    }
    templates
}

impl<'a, E: Embedder> DecisionSupportAgent<'a, E> {
    /// Reads and parses `templates_dir` itself; convenient for tests and
    /// one-off callers. Orchestrators that construct a fresh agent per
    /// triage call should load templates once with [`load_templates`] and
    /// use [`Self::with_templates`] instead, to avoid re-reading the
    /// directory on every run.
    pub fn new(store: &'a VectorStore<E>, templates_dir: impl AsRef<Path>) -> Self {
        Self::with_templates(store, load_templates(templates_dir))
    }

    pub fn with_templates(store: &'a VectorStore<E>, templates: HashMap<String, String>) -> Self {
        Self { store, templates, cache: None }
    }

    pub fn without_templates(store: &'a VectorStore<E>) -> Self {
        Self { store, templates: HashMap::new(), cache: None }
    }

    /// Opportunistically caches the knowledge-source retrieval: a miss is
    /// never an error, just a live query (spec.md §2, §4.1).
    pub fn with_cache(mut self, cache: &'a Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn support(
        &self,
        case: &Case,
        classification: &ClassificationResult,
        risk: &RiskScoreResult,
        routing: &RoutingResult,
    ) -> AgentResult<DecisionSupportResult> {
        let start = Instant::now();
        let outcome = self.support_inner(case, classification, risk, routing);
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((result, confidence)) => {
                let reasoning = result.reasoning.clone();
                AgentResult::new("DecisionSupportAgent", confidence, result, reasoning, elapsed)
            }
            Err(reason) => AgentResult::soft_failure(
                "DecisionSupportAgent",
                DecisionSupportResult {
                    suggested_actions: vec!["Review case manually".to_string()],
                    template_response: FALLBACK_TEMPLATE.to_string(),
                    checklist: vec!["Confirm case identity".to_string()],
                    knowledge_sources: vec![],
                    confidence: 0.5,
                    reasoning: format!("Decision support failed: {reason}"),
                },
                format!("Decision support failed: {reason}"),
                elapsed,
                reason,
            ),
        }
    }

    fn support_inner(
        &self,
        case: &Case,
        classification: &ClassificationResult,
        risk: &RiskScoreResult,
        routing: &RoutingResult,
    ) -> Result<(DecisionSupportResult, f64), String> {
        let case_type = classification.case_type;
        let risk_level = risk.risk_level;

        let mut actions = base_actions(case_type, risk_level);
        actions.extend(urgency_additions(classification.urgency));
        actions.extend(team_additions(&routing.recommended_team));
        actions.extend(risk_additions(risk_level));
        let suggested_actions = dedup_preserve_order(actions);

        let template_response = match template_name_for(case_type, risk_level).and_then(|n| self.templates.get(n)) {
            Some(body) => substitute(body, case, case_type, risk_level),
            None => substitute(FALLBACK_TEMPLATE, case, case_type, risk_level),
        };

        let mut checklist: Vec<String> = base_checklist().into_iter().map(str::to_string).collect();
        for field in &classification.missing_fields {
            checklist.push(format!("Resolve missing field: {field}"));
        }
        checklist.extend(case_type_checklist(case_type).into_iter().map(str::to_string));
        checklist.extend(risk_checklist(risk_level).into_iter().map(str::to_string));

        let context = format!("{} {}", case.title, case.description);
        let case_type_str = serde_json::to_value(case_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let cache_key = format!("decision_support:knowledge_sources:{case_type_str}:{context}");
        let knowledge_sources = match self.cache.and_then(|c| c.get_json::<Vec<String>>(&cache_key)) {
            Some(cached) => cached,
            None => {
                let retrieved = self.store.decision_support(&context, &case_type_str, 3);
                let mut sources = Vec::new();
                for collection in [KNOWLEDGE_BASE, POLICIES, SOPS] {
                    if let Some(hits) = retrieved.get(collection) {
                        sources.extend(hits.iter().map(|h| format!("{collection}:{}", h.entry.id)));
                    }
                }
                if let Some(cache) = self.cache {
                    let _ = cache.set_json(&cache_key, &sources, Some(KNOWLEDGE_CACHE_TTL));
                }
                sources
            }
        };

        let confidence =
            (0.4 * classification.confidence + 0.4 * risk.confidence + 0.2 * routing.confidence).clamp(0.0, 1.0);

        let reasoning = format!(
            "{} action(s) suggested, {} knowledge source(s) retrieved",
            suggested_actions.len(),
            knowledge_sources.len()
        );

        Ok((
            DecisionSupportResult {
                suggested_actions,
                template_response,
                checklist,
                knowledge_sources,
                confidence,
                reasoning: reasoning.clone(),
            },
            confidence,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_types::{RiskLevel, Urgency};
    use std::collections::HashMap as StdHashMap;

    fn case() -> Case {
        Case {
            id: "case-1".to_string(),
            title: "Minor fender bender".to_string(),
            description: "Low-speed collision, small dent".to_string(),
            customer_id: Some("C-100".to_string()),
            amount: Some(800.0),
            metadata: StdHashMap::new(),
            attachments: vec![],
            case_type_hint: None,
            urgency_hint: None,
            submitted_at: chrono::Utc::now(),
        }
    }

    fn classification() -> ClassificationResult {
        ClassificationResult {
            case_type: CaseType::InsuranceClaim,
            urgency: Urgency::Low,
            confidence: 0.9,
            reasoning: String::new(),
            missing_fields: vec![],
        }
    }

    fn risk() -> RiskScoreResult {
        RiskScoreResult {
            risk_score: 0.1,
            risk_level: RiskLevel::Low,
            confidence: 0.8,
            rationale: String::new(),
            top_features: vec![],
            risk_factors: vec![],
        }
    }

    fn routing() -> RoutingResult {
        RoutingResult {
            recommended_team: "Tier-2".to_string(),
            sla_target_hours: 72,
            escalation_flag: false,
            confidence: 0.9,
            reasoning: String::new(),
            policy_applied: "standard_processing".to_string(),
            alternative_routes: vec![],
        }
    }

    #[tokio::test]
    async fn produces_deduplicated_actions_and_fallback_template() {
        let store = VectorStore::new();
        let agent = DecisionSupportAgent::without_templates(&store);
        let result = agent.support(&case(), &classification(), &risk(), &routing()).await;
        assert!(!result.result.suggested_actions.is_empty());
        assert!(result.result.template_response.contains("case-1"));
        assert!(!result.is_soft_failure());
    }

    #[tokio::test]
    async fn confidence_is_weighted_average() {
        let store = VectorStore::new();
        let agent = DecisionSupportAgent::without_templates(&store);
        let result = agent.support(&case(), &classification(), &risk(), &routing()).await;
        let expected = 0.4 * 0.9 + 0.4 * 0.8 + 0.2 * 0.9;
        assert!((result.result.confidence - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_fields_expand_checklist() {
        let store = VectorStore::new();
        let agent = DecisionSupportAgent::without_templates(&store);
        let mut classification = classification();
        classification.missing_fields = vec!["customer_id".to_string()];
        let result = agent.support(&case(), &classification, &risk(), &routing()).await;
        assert!(result.result.checklist.iter().any(|c| c.contains("customer_id")));
    }
}
