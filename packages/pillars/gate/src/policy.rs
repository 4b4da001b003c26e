use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

const EVALUATOR_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy evaluator request failed: {0}")]
    Request(String),
    #[error("policy evaluator call timed out")]
    Timeout,
    #[error("policy evaluator returned an error payload: {0}")]
    Evaluator(String),
    #[error("triage run was cancelled while awaiting the policy evaluator")]
    Cancelled,
}

/// The evaluator's response to a successful `evaluate` call.
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub result: Value,
}

/// Thin HTTP client over the external policy evaluator (spec.md §4.3, §6).
/// Every call carries a 5-second timeout; callers treat any `PolicyError`
/// as soft — fall through to built-in rules, never an orchestrator hard
/// failure (§7, "Evaluator unreachable").
#[derive(Clone)]
pub struct PolicyEvaluatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl PolicyEvaluatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EVALUATOR_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout is always constructible");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// `POST /v1/data/{policy_path}` with body `{input, data}`.
    pub async fn evaluate(
        &self,
        policy_path: &str,
        input: Value,
        data: Option<Value>,
    ) -> Result<PolicyDecision, PolicyError> {
        let url = format!("{}/v1/data/{}", self.base_url, policy_path.trim_start_matches('/'));
        let body = serde_json::json!({ "input": input, "data": data });
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PolicyError::Timeout
                } else {
                    PolicyError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(PolicyError::Evaluator(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PolicyError::Request(e.to_string()))?;
        if let Some(err) = payload.get("error") {
            return Err(PolicyError::Evaluator(err.to_string()));
        }
        Ok(PolicyDecision {
            result: payload.get("result").cloned().unwrap_or(Value::Null),
        })
    }

    /// Same as [`evaluate`](Self::evaluate) but races the call against
    /// `cancel` — cancellation propagates cooperatively "inside the policy
    /// evaluator call" (spec.md §5). A cancellation mid-flight is reported
    /// as [`PolicyError::Cancelled`], which callers treat the same as any
    /// other evaluator-unreachable outcome: fall through to built-in rules.
    pub async fn evaluate_cancellable(
        &self,
        policy_path: &str,
        input: Value,
        data: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<PolicyDecision, PolicyError> {
        tokio::select! {
            result = self.evaluate(policy_path, input, data) => result,
            _ = cancel.cancelled() => Err(PolicyError::Cancelled),
        }
    }

    pub async fn load(&self, name: &str, body: &str) -> Result<(), PolicyError> {
        let url = format!("{}/v1/policies/{}", self.base_url, name);
        let response = self
            .http
            .put(&url)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| PolicyError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PolicyError::Evaluator(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), PolicyError> {
        let url = format!("{}/v1/policies/{}", self.base_url, name);
        let response = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(|e| PolicyError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PolicyError::Evaluator(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>, PolicyError> {
        let url = format!("{}/v1/policies", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PolicyError::Request(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| PolicyError::Request(e.to_string()))
    }

    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        matches!(self.http.get(&url).send().await, Ok(r) if r.status().is_success())
    }
}

struct LoadedPolicy {
    body: String,
    modified: SystemTime,
}

/// Polls `policies_dir` for mtime changes every 2 seconds and hot-reloads
/// the changed files into an in-memory registry. A failed parse (missing
/// `package` declaration) leaves the previously loaded body intact
/// (spec.md §4.3, "errors in reloading do not remove the previously
/// loaded version").
pub struct PolicyDirectoryWatcher {
    dir: PathBuf,
    loaded: RwLock<HashMap<String, LoadedPolicy>>,
}

impl PolicyDirectoryWatcher {
    pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    fn validate(body: &str) -> Result<(), String> {
        if body.contains("package ") {
            Ok(())
        } else {
            Err("policy body is missing a package declaration".to_string())
        }
    }

    /// Scans the directory once, loading new or mtime-changed files.
    /// Returns the names actually (re)loaded this pass.
    pub fn poll_once(&self) -> Vec<String> {
        let mut reloaded = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return reloaded,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = file_stem(&path) else { continue };
            let modified = entry.metadata().and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH);

            let needs_reload = {
                let loaded = self.loaded.read();
                match loaded.get(&name) {
                    Some(existing) => existing.modified != modified,
                    None => true,
                }
            };
            if !needs_reload {
                continue;
            }

            let Ok(body) = std::fs::read_to_string(&path) else { continue };
            if let Err(reason) = Self::validate(&body) {
                tracing::warn!(policy = %name, reason, "keeping previously loaded policy version");
                continue;
            }
            self.loaded.write().insert(name.clone(), LoadedPolicy { body, modified });
            reloaded.push(name);
        }
        reloaded
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.loaded.read().get(name).map(|p| p.body.clone())
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.loaded.read().keys().cloned().collect()
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_package_declaration() {
        assert!(PolicyDirectoryWatcher::validate("package triage.routing\n\nallow = true").is_ok());
        assert!(PolicyDirectoryWatcher::validate("allow = true").is_err());
    }

    #[test]
    fn reload_keeps_prior_version_on_bad_parse() {
        let dir = std::env::temp_dir().join(format!("agentkern-policy-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("routing.rego");
        std::fs::write(&file, "package triage.routing\nallow = true").unwrap();

        let watcher = PolicyDirectoryWatcher::new(&dir);
        let reloaded = watcher.poll_once();
        assert_eq!(reloaded, vec!["routing".to_string()]);
        assert!(watcher.get("routing").unwrap().contains("allow = true"));

        std::fs::write(&file, "not a valid policy").unwrap();
        watcher.poll_once();
        assert!(watcher.get("routing").unwrap().contains("allow = true"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
