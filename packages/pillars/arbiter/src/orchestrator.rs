use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use agentkern_gate::{ClassifierAgent, PolicyEvaluatorClient};
use agentkern_governance::audit::AuditChain;
use agentkern_governance::ComplianceAgent;
use agentkern_infra::Cache;
use agentkern_nexus::{catalogue, RouterAgent};
use agentkern_synapse::{load_templates, DecisionSupportAgent, DeterministicEncoder, VectorStore};
use agentkern_treasury::TeamLedger;
use agentkern_types::{AgentResult, AgentSummary, Case, Config, FinalDecision};

use crate::circuit_breaker::CircuitBreaker;
use crate::error::TriageError;
use crate::risk_scorer::RiskScorerAgent;

/// Relative weight of each agent's confidence in `overall_confidence`
/// (spec.md §4.9). A step whose `AgentResult` is absent contributes zero
/// weight — structurally this workspace never omits a step (every agent
/// collapses to a soft-failure default rather than being skipped), so in
/// practice all five weights are always present; this constant documents
/// the rule rather than a runtime branch.
const WEIGHT_CLASSIFIER: f64 = 0.25;
const WEIGHT_RISK: f64 = 0.25;
const WEIGHT_ROUTER: f64 = 0.20;
const WEIGHT_DECISION_SUPPORT: f64 = 0.15;
const WEIGHT_COMPLIANCE: f64 = 0.15;

/// Releases one unit of team capacity on drop unless [`Self::commit`] was
/// called first. Backs the "resources acquired via `acquire_team(team)`
/// must be released on all paths" rule (spec.md §5): if any step after
/// routing hard-fails or the run is cancelled, the slot goes back; a run
/// that reaches the end keeps the slot (the case is now assigned to that
/// team for the rest of its lifecycle, which is outside this core).
struct TeamAcquisition<'a> {
    ledger: &'a TeamLedger,
    team: Option<String>,
}

impl<'a> TeamAcquisition<'a> {
    fn acquire(ledger: &'a TeamLedger, team: &str) -> Self {
        match ledger.acquire(team) {
            Ok(()) => Self { ledger, team: Some(team.to_string()) },
            Err(reason) => {
                tracing::debug!(team, %reason, "team at capacity, routing decision stands without a reserved slot");
                Self { ledger, team: None }
            }
        }
    }

    fn commit(mut self) {
        self.team = None;
    }
}

impl Drop for TeamAcquisition<'_> {
    fn drop(&mut self) {
        if let Some(team) = self.team.take() {
            let _ = self.ledger.release(&team);
        }
    }
}

/// Sequences the five triage agents, with retries, per-call timeouts, and
/// a circuit breaker, then assembles a [`FinalDecision`] and an audit
/// entry. Grounded in `backend/core/orchestrator.py::AgentOrchestrator`
/// (the strictly sequential variant, per spec.md §9's Open Question
/// resolution — not the parallel Decision-Support/Compliance variant also
/// present in the source).
pub struct Orchestrator {
    config: Config,
    classifier: ClassifierAgent,
    risk_scorer: RiskScorerAgent,
    ledger: TeamLedger,
    policy_client: Option<PolicyEvaluatorClient>,
    vector_store: VectorStore<DeterministicEncoder>,
    templates: std::collections::HashMap<String, String>,
    audit_chain: AuditChain,
    cache: Cache,
    circuit_breaker: CircuitBreaker,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let policy_client = Some(PolicyEvaluatorClient::new(config.policy_evaluator_url.clone()));
        let circuit_breaker = CircuitBreaker::new(
            config.circuit_breaker_threshold,
            config.circuit_breaker_timeout(),
        );
        Self {
            classifier: ClassifierAgent::new(&config),
            risk_scorer: RiskScorerAgent::new(&config),
            ledger: TeamLedger::new(catalogue::default_teams()),
            policy_client,
            vector_store: VectorStore::new(),
            templates: std::collections::HashMap::new(),
            audit_chain: AuditChain::new(),
            cache: Cache::new(),
            circuit_breaker,
            config,
        }
    }

    /// Loads decision-support templates from `dir` once, at construction,
    /// rather than on every triage call (spec.md §4.7's "loaded once at
    /// `DecisionSupportAgent::new`", generalized to the orchestrator's own
    /// lifetime since a fresh agent struct is built per call).
    pub fn with_templates_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        self.templates = load_templates(dir);
        self
    }

    pub fn without_policy_evaluator(mut self) -> Self {
        self.policy_client = None;
        self
    }

    /// The evaluator client this orchestrator routes through, if any —
    /// exposed so a caller can push hot-reloaded policy bodies
    /// (`PolicyDirectoryWatcher`) up to the same evaluator the router
    /// consults.
    pub fn policy_client(&self) -> Option<&PolicyEvaluatorClient> {
        self.policy_client.as_ref()
    }

    pub fn team_ledger(&self) -> &TeamLedger {
        &self.ledger
    }

    pub fn vector_store(&self) -> &VectorStore<DeterministicEncoder> {
        &self.vector_store
    }

    pub fn audit_chain(&self) -> &AuditChain {
        &self.audit_chain
    }

    pub fn circuit_breaker_state(&self) -> crate::circuit_breaker::CircuitState {
        self.circuit_breaker.state()
    }

    /// Runs one triage without a caller-supplied cancellation deadline.
    pub async fn run_triage(&self, case: &Case) -> Result<FinalDecision, TriageError> {
        self.run_triage_cancellable(case, &CancellationToken::new()).await
    }

    /// Runs one triage, cancelling cooperatively at the next retry/step
    /// boundary (and inside the policy evaluator call) if `cancel` fires
    /// mid-run (spec.md §4.9, §5). Partial results are always discarded on
    /// cancellation — never a partial `FinalDecision`.
    pub async fn run_triage_cancellable(
        &self,
        case: &Case,
        cancel: &CancellationToken,
    ) -> Result<FinalDecision, TriageError> {
        if !self.circuit_breaker.allow() {
            return Err(TriageError::CircuitOpen);
        }

        match self.run_pipeline(case, cancel).await {
            Ok(decision) => {
                self.circuit_breaker.record_success();
                Ok(decision)
            }
            Err(TriageError::InputError(reason)) => {
                // Input errors are the caller's fault, not the agent
                // pipeline's — they don't count against the breaker.
                Err(TriageError::InputError(reason))
            }
            Err(err) => {
                self.circuit_breaker.record_failure();
                Err(err)
            }
        }
    }

    async fn run_pipeline(
        &self,
        case: &Case,
        cancel: &CancellationToken,
    ) -> Result<FinalDecision, TriageError> {
        validate_case(case)?;

        let classification = self
            .run_step("ClassifierAgent", cancel, || self.classifier.classify(case))
            .await?;

        if cancel.is_cancelled() {
            return Err(TriageError::Cancelled);
        }
        let risk = self
            .run_step("RiskScorerAgent", cancel, || {
                self.risk_scorer.score(case, &classification.result)
            })
            .await?;

        if cancel.is_cancelled() {
            return Err(TriageError::Cancelled);
        }
        let router = RouterAgent::new(&self.ledger);
        let router = match &self.policy_client {
            Some(client) => router.with_policy_client(client),
            None => router,
        };
        let routing = self
            .run_step("RouterAgent", cancel, || {
                router.route_cancellable(case, &classification.result, &risk.result, Some(cancel))
            })
            .await?;

        // Reserve the assigned team's capacity; released automatically
        // unless the run reaches the end successfully (see `TeamAcquisition`).
        let acquisition = TeamAcquisition::acquire(&self.ledger, &routing.result.recommended_team);

        if cancel.is_cancelled() {
            return Err(TriageError::Cancelled);
        }
        let decision_support_agent = DecisionSupportAgent::with_templates(&self.vector_store, self.templates.clone())
            .with_cache(&self.cache);
        let decision_support = self
            .run_step("DecisionSupportAgent", cancel, || {
                decision_support_agent.support(case, &classification.result, &risk.result, &routing.result)
            })
            .await?;

        if cancel.is_cancelled() {
            return Err(TriageError::Cancelled);
        }
        let prior_summaries = vec![
            summary_of(&classification),
            summary_of(&risk),
            summary_of(&routing),
            summary_of(&decision_support),
        ];
        let compliance_agent = ComplianceAgent::new(&self.audit_chain);
        let compliance = self
            .run_step("ComplianceAgent", cancel, || async {
                compliance_agent.analyze(case, classification.result.case_type, &prior_summaries, &self.config)
            })
            .await?;

        acquisition.commit();

        let agent_summaries = vec![
            summary_of(&classification),
            summary_of(&risk),
            summary_of(&routing),
            summary_of(&decision_support),
            summary_of(&compliance),
        ];

        let overall_confidence = WEIGHT_CLASSIFIER * classification.confidence
            + WEIGHT_RISK * risk.confidence
            + WEIGHT_ROUTER * routing.confidence
            + WEIGHT_DECISION_SUPPORT * decision_support.confidence
            + WEIGHT_COMPLIANCE * compliance.confidence;
        let overall_confidence = overall_confidence.clamp(0.0, 1.0);

        Ok(FinalDecision {
            case_id: case.id.clone(),
            case_type: classification.result.case_type,
            urgency: classification.result.urgency,
            risk_score: risk.result.risk_score,
            risk_level: risk.result.risk_level,
            recommended_team: routing.result.recommended_team.clone(),
            sla_target_hours: routing.result.sla_target_hours,
            escalation_flag: routing.result.escalation_flag,
            suggested_actions: decision_support.result.suggested_actions.clone(),
            template_response: decision_support.result.template_response.clone(),
            pii_detected: compliance.result.pii_detected,
            overall_confidence,
            audit_id: compliance.result.audit_id.clone(),
            agent_summaries,
            decided_at: Utc::now(),
        })
    }

    /// Wraps one agent step with a per-call timeout and exponential
    /// backoff between attempts (spec.md §4.9): `max_retries` retries
    /// after an initial attempt, with `2^attempt` seconds between tries —
    /// 1, 2, 4 seconds for the defaults, cumulatively 7s, matching the
    /// testable property in spec.md §8. A soft-failure `AgentResult` (the
    /// agent's own internal collapse-to-default) still counts as success
    /// here — only a timeout, or a soft-failure marker mentioning
    /// "circuit_breaker", is treated as hard-failure-eligible, and the
    /// latter is never retried (spec.md §7, "Errors containing
    /// 'circuit_breaker' are not retried").
    async fn run_step<T, F, Fut>(
        &self,
        step_name: &str,
        cancel: &CancellationToken,
        mut make_future: F,
    ) -> Result<AgentResult<T>, TriageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AgentResult<T>>,
    {
        let total_tries = self.config.max_retries + 1;
        for attempt in 0..total_tries {
            if cancel.is_cancelled() {
                return Err(TriageError::Cancelled);
            }

            let attempt_result = tokio::select! {
                result = tokio::time::timeout(self.config.timeout(), make_future()) => result,
                _ = cancel.cancelled() => return Err(TriageError::Cancelled),
            };

            match attempt_result {
                Ok(result) => {
                    if let Some(ref error) = result.error {
                        if error.contains("circuit_breaker") {
                            return Err(TriageError::AgentHardFailure(step_name.to_string(), error.clone()));
                        }
                    }
                    return Ok(result);
                }
                Err(_elapsed) => {
                    tracing::warn!(step = step_name, attempt, "agent step timed out");
                    if attempt + 1 < total_tries {
                        let backoff = Duration::from_secs(2u64.pow(attempt));
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            _ = cancel.cancelled() => return Err(TriageError::Cancelled),
                        }
                    }
                }
            }
        }

        Err(TriageError::AgentHardFailure(
            step_name.to_string(),
            format!("exceeded {total_tries} attempts on timeout"),
        ))
    }
}

fn summary_of<T>(result: &AgentResult<T>) -> AgentSummary {
    AgentSummary {
        agent_name: result.agent_name.clone(),
        confidence: result.confidence,
        processing_time_ms: result.processing_time_ms,
    }
}

/// Input validation at the triage boundary (spec.md §3): `title` and
/// `description` must be non-empty after trim. The core otherwise
/// tolerates missing fields by surfacing them in `missing_fields`, so this
/// is the one check the orchestrator itself enforces before running any
/// agent.
fn validate_case(case: &Case) -> Result<(), TriageError> {
    if case.title.trim().is_empty() {
        return Err(TriageError::InputError("title must not be empty".to_string()));
    }
    if case.description.trim().is_empty() {
        return Err(TriageError::InputError("description must not be empty".to_string()));
    }
    Ok(())
}
