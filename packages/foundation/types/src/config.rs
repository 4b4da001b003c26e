use std::env;
use std::time::Duration;

/// Environment-driven configuration (spec.md §6). Every pillar crate takes
/// a `&Config` (or an `Arc<Config>`) rather than reaching into process-wide
/// globals — the Design Notes call this out explicitly: "global singletons
/// become explicit configuration passed into the orchestrator."
///
/// Mirrors the shape of the original `backend/core/config.py::Settings`
/// (a `pydantic-settings` model), translated to a plain struct with
/// `std::env::var` lookups plus documented defaults, since this workspace
/// has no dependency on a settings-management crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub risk_threshold_high: f64,
    pub risk_threshold_medium: f64,
    pub confidence_threshold: f64,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout_seconds: u64,
    pub rate_limit_per_minute: u32,
    pub pii_detection_enabled: bool,
    pub audit_log_retention_days: i64,
    pub policies_dir: String,
    pub vector_store_dir: String,
    pub policy_evaluator_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk_threshold_high: 0.7,
            risk_threshold_medium: 0.4,
            confidence_threshold: 0.8,
            max_retries: 3,
            timeout_seconds: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout_seconds: 60,
            rate_limit_per_minute: 60,
            pii_detection_enabled: true,
            audit_log_retention_days: 365,
            policies_dir: "./policies".to_string(),
            vector_store_dir: "./data/vector_store".to_string(),
            policy_evaluator_url: "http://localhost:8181".to_string(),
        }
    }
}

impl Config {
    /// Loads overrides from the process environment on top of the
    /// documented defaults. A malformed value for a key is logged and the
    /// default is kept — configuration parsing never panics the process.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        Self::env_f64("risk_threshold_high", &mut self.risk_threshold_high);
        Self::env_f64("risk_threshold_medium", &mut self.risk_threshold_medium);
        Self::env_f64("confidence_threshold", &mut self.confidence_threshold);
        Self::env_u32("max_retries", &mut self.max_retries);
        Self::env_u64("timeout_seconds", &mut self.timeout_seconds);
        Self::env_u32("circuit_breaker_threshold", &mut self.circuit_breaker_threshold);
        Self::env_u64(
            "circuit_breaker_timeout",
            &mut self.circuit_breaker_timeout_seconds,
        );
        Self::env_u32("rate_limit_per_minute", &mut self.rate_limit_per_minute);
        Self::env_bool("pii_detection_enabled", &mut self.pii_detection_enabled);
        Self::env_i64("audit_log_retention_days", &mut self.audit_log_retention_days);
        if let Ok(v) = env::var("policies_dir") {
            self.policies_dir = v;
        }
        if let Ok(v) = env::var("vector_store_dir") {
            self.vector_store_dir = v;
        }
        if let Ok(v) = env::var("policy_evaluator_url") {
            self.policy_evaluator_url = v;
        }
    }

    fn env_f64(key: &str, slot: &mut f64) {
        if let Ok(v) = env::var(key) {
            if let Ok(parsed) = v.parse() {
                *slot = parsed;
            } else {
                tracing::warn!(key, value = %v, "ignoring malformed float config override");
            }
        }
    }

    fn env_u32(key: &str, slot: &mut u32) {
        if let Ok(v) = env::var(key) {
            if let Ok(parsed) = v.parse() {
                *slot = parsed;
            } else {
                tracing::warn!(key, value = %v, "ignoring malformed integer config override");
            }
        }
    }

    fn env_u64(key: &str, slot: &mut u64) {
        if let Ok(v) = env::var(key) {
            if let Ok(parsed) = v.parse() {
                *slot = parsed;
            } else {
                tracing::warn!(key, value = %v, "ignoring malformed integer config override");
            }
        }
    }

    fn env_i64(key: &str, slot: &mut i64) {
        if let Ok(v) = env::var(key) {
            if let Ok(parsed) = v.parse() {
                *slot = parsed;
            } else {
                tracing::warn!(key, value = %v, "ignoring malformed integer config override");
            }
        }
    }

    fn env_bool(key: &str, slot: &mut bool) {
        if let Ok(v) = env::var(key) {
            match v.to_lowercase().as_str() {
                "1" | "true" | "yes" => *slot = true,
                "0" | "false" | "no" => *slot = false,
                _ => tracing::warn!(key, value = %v, "ignoring malformed boolean config override"),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn circuit_breaker_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_timeout_seconds)
    }
}
