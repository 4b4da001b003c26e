use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window rate limiter (spec.md §4.1). The window for a key starts at
/// the first permitted call for that key and resets exactly at window
/// expiry; `allow` returns `false` only once the count has reached `limit`
/// within the current window. Monotonic per key within a window — callers
/// never observe the count decrease mid-window.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, key: &str, limit: u32, window_seconds: u64) -> bool {
        let now = Instant::now();
        let window_len = Duration::from_secs(window_seconds);
        let mut windows = self.windows.lock();
        match windows.get_mut(key) {
            Some(w) if now.duration_since(w.started_at) < window_len => {
                if w.count >= limit {
                    false
                } else {
                    w.count += 1;
                    true
                }
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        started_at: now,
                        count: 1,
                    },
                );
                limit > 0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let rl = RateLimiter::new();
        for _ in 0..3 {
            assert!(rl.allow("k", 3, 60));
        }
        assert!(!rl.allow("k", 3, 60));
    }

    #[test]
    fn zero_limit_always_rejects() {
        let rl = RateLimiter::new();
        assert!(!rl.allow("k", 0, 60));
    }

    #[test]
    fn window_resets_after_expiry() {
        let rl = RateLimiter::new();
        assert!(rl.allow("k", 1, 0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(rl.allow("k", 1, 0));
    }

    #[test]
    fn distinct_keys_have_independent_windows() {
        let rl = RateLimiter::new();
        assert!(rl.allow("a", 1, 60));
        assert!(rl.allow("b", 1, 60));
        assert!(!rl.allow("a", 1, 60));
    }
}
