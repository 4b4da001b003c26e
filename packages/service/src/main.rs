//! AgentKern case-triage service.
//!
//! Exposes the orchestrator over HTTP: `POST /v1/triage` runs one case
//! through the full agent pipeline, `GET /health` reports liveness, the
//! current circuit breaker state, and how many policies are loaded. On
//! startup a background task polls `policies_dir` and pushes hot-reloaded
//! policy bodies to the evaluator. This binary is a thin translation layer —
//! all triage logic lives in `agentkern_arbiter::Orchestrator`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use agentkern_arbiter::{CircuitState, Orchestrator, TriageError};
use agentkern_gate::PolicyDirectoryWatcher;
use agentkern_types::{AttachmentRef, Case, CaseType, Config, FinalDecision, MetadataValue, Urgency};

struct AppState {
    orchestrator: Orchestrator,
    policy_watcher: Arc<PolicyDirectoryWatcher>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    circuit_breaker: &'static str,
    loaded_policies: usize,
}

#[derive(Debug, Deserialize)]
struct TriageRequest {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    metadata: HashMap<String, MetadataValue>,
    #[serde(default)]
    attachments: Vec<AttachmentRef>,
    #[serde(default)]
    case_type_hint: Option<CaseType>,
    #[serde(default)]
    urgency_hint: Option<Urgency>,
}

#[derive(Debug, Serialize)]
struct TriageErrorBody {
    error: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let templates_dir = std::env::var("DECISION_TEMPLATES_DIR").unwrap_or_else(|_| "./demos/templates".to_string());
    let policy_watcher = Arc::new(PolicyDirectoryWatcher::new(config.policies_dir.clone()));
    let orchestrator = Orchestrator::new(config).with_templates_dir(templates_dir);

    spawn_policy_watcher(Arc::clone(&policy_watcher), orchestrator.policy_client().cloned());

    let state = Arc::new(AppState { orchestrator, policy_watcher });

    let app = Router::new()
        .route("/health", get(health))
        .route("/v1/triage", post(triage))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");

    tracing::info!(%addr, "agentkern-service listening");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// On startup, watches `config.policies_dir` and hot-reloads changed policy
/// files every `PolicyDirectoryWatcher::POLL_INTERVAL` (spec.md §4.3). Each
/// reloaded file is pushed to the external evaluator via `load` so the
/// evaluator's policy set tracks the directory; a push failure just leaves
/// the evaluator on its previous version until the next successful poll.
fn spawn_policy_watcher(watcher: Arc<PolicyDirectoryWatcher>, policy_client: Option<agentkern_gate::PolicyEvaluatorClient>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PolicyDirectoryWatcher::POLL_INTERVAL);
        loop {
            interval.tick().await;
            for name in watcher.poll_once() {
                let Some(body) = watcher.get(&name) else { continue };
                if let Some(client) = &policy_client {
                    if let Err(err) = client.load(&name, &body).await {
                        tracing::warn!(policy = %name, %err, "failed to push reloaded policy to evaluator");
                        continue;
                    }
                }
                tracing::info!(policy = %name, "reloaded policy");
            }
        }
    });
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let circuit_breaker = match state.orchestrator.circuit_breaker_state() {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    };
    Json(HealthResponse {
        status: "healthy",
        circuit_breaker,
        loaded_policies: state.policy_watcher.loaded_names().len(),
    })
}

async fn triage(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TriageRequest>,
) -> Result<Json<FinalDecision>, (StatusCode, Json<TriageErrorBody>)> {
    let case = Case {
        id: req.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: req.title,
        description: req.description,
        customer_id: req.customer_id,
        amount: req.amount,
        metadata: req.metadata,
        attachments: req.attachments,
        case_type_hint: req.case_type_hint,
        urgency_hint: req.urgency_hint,
        submitted_at: chrono::Utc::now(),
    };

    state
        .orchestrator
        .run_triage(&case)
        .await
        .map(Json)
        .map_err(|err| {
            let status = match err {
                TriageError::InputError(_) => StatusCode::BAD_REQUEST,
                TriageError::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
                TriageError::AgentHardFailure(_, _)
                | TriageError::AuditIntegrityError(_)
                | TriageError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(TriageErrorBody { error: err.to_string() }))
        })
}
