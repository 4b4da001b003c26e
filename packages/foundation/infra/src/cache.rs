use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::InfraError;

const MAX_KEY_BYTES: usize = 512;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Stats snapshot returned by `Cache::stats`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Keyed byte/JSON cache with wall-clock TTL, used as an accelerator
/// everywhere in the core — a miss is never an error (spec.md §4.1).
///
/// Backed by a single `parking_lot::RwLock<HashMap<...>>`, the same
/// concurrency idiom `ConnectorRegistry` and `CostTracker` use elsewhere in
/// this workspace; no external cache/broker dependency (Redis is one
/// deployment's implementation choice per spec.md §6, not a contract this
/// crate depends on).
pub struct Cache {
    entries: RwLock<HashMap<String, Entry>>,
    hits: parking_lot::Mutex<u64>,
    misses: parking_lot::Mutex<u64>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: parking_lot::Mutex::new(0),
            misses: parking_lot::Mutex::new(0),
        }
    }

    fn check_key(key: &str) -> Result<(), InfraError> {
        if key.len() > MAX_KEY_BYTES {
            return Err(InfraError::KeyTooLong(key.to_string()));
        }
        Ok(())
    }

    pub fn set(&self, key: &str, value: impl Into<Vec<u8>>, ttl: Option<Duration>) -> Result<(), InfraError> {
        Self::check_key(key)?;
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.into(),
                expires_at,
            },
        );
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let found = {
            let entries = self.entries.read();
            entries.get(key).filter(|e| !e.is_expired(now)).map(|e| e.value.clone())
        };
        if found.is_some() {
            *self.hits.lock() += 1;
        } else {
            *self.misses.lock() += 1;
            // Opportunistically drop an expired entry so the table doesn't
            // grow unbounded with stale TTLs.
            self.entries.write().remove(key);
        }
        found
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<(), InfraError> {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        self.set(key, bytes, ttl)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Deletes every key containing `pattern` as a substring. The contract
    /// (§4.1) only requires pattern-based bulk clearing, not glob/regex
    /// semantics.
    pub fn clear(&self, pattern: &str) -> usize {
        let mut entries = self.entries.write();
        let to_remove: Vec<String> = entries
            .keys()
            .filter(|k| k.contains(pattern))
            .cloned()
            .collect();
        for k in &to_remove {
            entries.remove(k);
        }
        to_remove.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().len(),
            hits: *self.hits.lock(),
            misses: *self.misses.lock(),
        }
    }

    /// Single-writer guard: the first caller within `ttl` for a given key
    /// sees `true` (acquired); subsequent callers see `false` until the
    /// guard expires. Used by at-least-once queue consumers to make
    /// `enqueue`/process idempotent (§4.1).
    pub fn idempotency(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(key) {
            if !existing.is_expired(now) {
                return false;
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Vec::new(),
                expires_at: Some(now + ttl),
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_is_not_an_error() {
        let cache = Cache::new();
        assert_eq!(cache.get("absent"), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = Cache::new();
        cache.set("k", b"v".to_vec(), None).unwrap();
        assert_eq!(cache.get("k"), Some(b"v".to_vec()));
    }

    #[test]
    fn ttl_expires() {
        let cache = Cache::new();
        cache.set("k", b"v".to_vec(), Some(Duration::from_millis(1))).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn idempotency_guard_admits_one_writer() {
        let cache = Cache::new();
        assert!(cache.idempotency("job-1", Duration::from_secs(60)));
        assert!(!cache.idempotency("job-1", Duration::from_secs(60)));
    }

    #[test]
    fn clear_removes_matching_keys() {
        let cache = Cache::new();
        cache.set("user:1", b"a".to_vec(), None).unwrap();
        cache.set("user:2", b"b".to_vec(), None).unwrap();
        cache.set("team:1", b"c".to_vec(), None).unwrap();
        let removed = cache.clear("user:");
        assert_eq!(removed, 2);
        assert_eq!(cache.get("team:1"), Some(b"c".to_vec()));
    }
}
