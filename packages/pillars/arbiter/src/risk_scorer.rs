use std::time::Instant;

use agentkern_types::{
    keywords, Case, CaseType, ClassificationResult, Config, Direction, FeatureContribution,
    RiskLevel, RiskScoreResult, Urgency,
};

/// Capability probe for a trained risk-scoring model producing a
/// probability plus signed per-feature contributions. Absent unless
/// injected via [`RiskScorerAgent::with_model`].
pub trait RiskModel: Send + Sync {
    fn score(&self, features: &Features) -> Option<MlScore>;
}

pub struct MlScore {
    pub risk_score: f64,
    pub top_features: Vec<FeatureContribution>,
}

/// Flat feature vector extracted from a case and its classification,
/// mirroring `RiskScorerAgent._extract_features` in the original source.
#[derive(Debug, Clone)]
pub struct Features {
    pub text_length: usize,
    pub word_count: usize,
    pub case_type: CaseType,
    pub urgency: Urgency,
    pub amount: f64,
    pub has_amount: bool,
    pub has_customer_id: bool,
    pub metadata_count: usize,
    pub has_attachments: bool,
    pub fraud_indicators: usize,
    pub urgency_indicators: usize,
    pub complexity_indicators: usize,
    pub financial_indicators: usize,
    pub missing_fields_count: usize,
}

fn extract_features(case: &Case, classification: &ClassificationResult) -> Features {
    let text = case.text_corpus();
    Features {
        text_length: text.len(),
        word_count: text.split_whitespace().count(),
        case_type: classification.case_type,
        urgency: classification.urgency,
        amount: case.amount.unwrap_or(0.0),
        has_amount: case.amount.is_some(),
        has_customer_id: case.customer_id.is_some(),
        metadata_count: case.metadata.len(),
        has_attachments: case.has_attachments(),
        fraud_indicators: keywords::count_matches(&text, keywords::FRAUD_INDICATORS),
        urgency_indicators: keywords::count_matches(&text, keywords::URGENCY_INDICATORS),
        complexity_indicators: keywords::count_matches(&text, keywords::COMPLEXITY_INDICATORS),
        financial_indicators: keywords::count_matches(&text, keywords::FINANCIAL_INDICATORS),
        missing_fields_count: classification.missing_fields.len(),
    }
}

/// Scores case risk with an optional ML pass combined with additive
/// rule-based scoring. Grounded in `backend/agents/risk_scorer.py::RiskScorerAgent`.
pub struct RiskScorerAgent {
    risk_threshold_high: f64,
    risk_threshold_medium: f64,
    model: Option<Box<dyn RiskModel>>,
}

impl RiskScorerAgent {
    pub fn new(config: &Config) -> Self {
        Self {
            risk_threshold_high: config.risk_threshold_high,
            risk_threshold_medium: config.risk_threshold_medium,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Box<dyn RiskModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub async fn score(
        &self,
        case: &Case,
        classification: &ClassificationResult,
    ) -> agentkern_types::AgentResult<RiskScoreResult> {
        let start = Instant::now();
        let outcome = self.score_inner(case, classification);
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((result, confidence)) => {
                agentkern_types::AgentResult::new("RiskScorerAgent", confidence, result.clone(), result.rationale, elapsed)
            }
            Err(reason) => agentkern_types::AgentResult::soft_failure(
                "RiskScorerAgent",
                RiskScoreResult {
                    risk_score: 0.5,
                    risk_level: RiskLevel::Medium,
                    confidence: 0.5,
                    rationale: format!("Risk scoring failed: {reason}"),
                    top_features: vec![],
                    risk_factors: vec!["scoring_error".to_string()],
                },
                format!("Risk scoring failed: {reason}"),
                elapsed,
                reason,
            ),
        }
    }

    fn score_inner(
        &self,
        case: &Case,
        classification: &ClassificationResult,
    ) -> Result<(RiskScoreResult, f64), String> {
        let features = extract_features(case, classification);
        let (rule_score, risk_factors) = score_with_rules(case, classification, &features);

        let (risk_score, confidence, top_features, rationale) = match self.model.as_ref().and_then(|m| m.score(&features)) {
            Some(ml) => {
                let combined = 0.7 * ml.risk_score + 0.3 * rule_score;
                (combined, 0.9, ml.top_features, "Combined ML (0.7) + rule-based (0.3) risk scoring".to_string())
            }
            None => (rule_score, 0.7, vec![], "Rule-based risk scoring".to_string()),
        };

        let risk_level = score_to_level(risk_score, self.risk_threshold_high, self.risk_threshold_medium);

        Ok((
            RiskScoreResult {
                risk_score: risk_score.clamp(0.0, 1.0),
                risk_level,
                confidence,
                rationale,
                top_features,
                risk_factors,
            },
            confidence,
        ))
    }
}

/// Additive rule scoring, capped at 1.0 (spec.md §4.5).
fn score_with_rules(case: &Case, classification: &ClassificationResult, features: &Features) -> (f64, Vec<String>) {
    let mut score = 0.0f64;
    let mut factors = Vec::new();

    match classification.case_type {
        CaseType::FraudReview => {
            score += 0.4;
            factors.push("fraud_review_case".to_string());
        }
        CaseType::LegalIntake => {
            score += 0.3;
            factors.push("legal_case".to_string());
        }
        CaseType::BankDispute => {
            score += 0.25;
            factors.push("bank_dispute".to_string());
        }
        _ => {}
    }

    match classification.urgency {
        Urgency::Critical => {
            score += 0.3;
            factors.push("critical_urgency".to_string());
        }
        Urgency::High => {
            score += 0.2;
            factors.push("high_urgency".to_string());
        }
        _ => {}
    }

    if features.has_amount {
        if features.amount > 10_000.0 {
            score += 0.2;
            factors.push("high_amount".to_string());
        } else if features.amount > 5_000.0 {
            score += 0.1;
            factors.push("medium_amount".to_string());
        }
    }

    if features.missing_fields_count > 3 {
        score += 0.15;
        factors.push("many_missing_fields".to_string());
    } else if features.missing_fields_count >= 1 {
        score += 0.05;
        factors.push("missing_fields".to_string());
    }

    if features.fraud_indicators > 0 {
        score += 0.2;
        factors.push("fraud_indicators".to_string());
    }
    if features.complexity_indicators > 0 {
        score += 0.1;
        factors.push("complexity_indicators".to_string());
    }

    let _ = case;
    (score.min(1.0), factors)
}

/// Incapable of returning `Extreme` by construction — only `High`/`Medium`/
/// `Low` arms exist (resolves the Open Question on `RiskLevel::Extreme`).
fn score_to_level(score: f64, threshold_high: f64, threshold_medium: f64) -> RiskLevel {
    if score >= threshold_high {
        RiskLevel::High
    } else if score >= threshold_medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[allow(dead_code)]
fn direction_of(value: f64) -> Direction {
    if value >= 0.0 {
        Direction::Positive
    } else {
        Direction::Negative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn case(amount: Option<f64>) -> Case {
        Case {
            id: "case-1".to_string(),
            title: "Suspicious duplicate claim".to_string(),
            description: "Suspicious activity detected on a recent policy.".to_string(),
            customer_id: Some("cust-1".to_string()),
            amount,
            metadata: HashMap::new(),
            attachments: vec![],
            case_type_hint: None,
            urgency_hint: None,
            submitted_at: chrono::Utc::now(),
        }
    }

    fn classification(case_type: CaseType, urgency: Urgency) -> ClassificationResult {
        ClassificationResult {
            case_type,
            urgency,
            confidence: 0.8,
            reasoning: String::new(),
            missing_fields: vec![],
        }
    }

    #[tokio::test]
    async fn fraud_review_with_high_amount_scores_high() {
        let agent = RiskScorerAgent::new(&Config::default());
        let result = agent
            .score(&case(Some(15_000.0)), &classification(CaseType::FraudReview, Urgency::Critical))
            .await;
        assert_eq!(result.result.risk_level, RiskLevel::High);
        assert!(result.result.risk_factors.contains(&"fraud_review_case".to_string()));
    }

    #[tokio::test]
    async fn low_risk_case_scores_low() {
        let agent = RiskScorerAgent::new(&Config::default());
        let result = agent
            .score(&case(None), &classification(CaseType::InsuranceClaim, Urgency::Low))
            .await;
        assert_eq!(result.result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn score_to_level_never_produces_extreme() {
        for score in [0.0, 0.3, 0.5, 0.7, 0.9, 1.0] {
            assert_ne!(score_to_level(score, 0.7, 0.4), RiskLevel::Extreme);
        }
    }
}
