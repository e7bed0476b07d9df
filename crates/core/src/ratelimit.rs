//! Fixed-window request rate limiting.
//!
//! The limiter owns a pluggable [`CounterStore`] so single-instance
//! deployments can use the in-memory store while multi-instance ones can
//! swap in an external backing without touching call sites. It is passed
//! explicitly through application state, never held as a global.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Requests allowed per window when no route rule matches.
pub const DEFAULT_LIMIT: u32 = 60;

/// Per-route-prefix request limits.
///
/// Cards pages are cheap but enumerable (30/min stops naive scrapers);
/// images are fetched in batches on scroll and get a wider budget.
pub const ROUTE_LIMITS: &[(&str, u32)] = &[
    ("/api/v1/cards", 30),
    ("/api/v1/images", 200),
];

/// One client's counter within the current window.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Backing store for window counters.
///
/// `hit` increments the counter for `key`, starting a fresh window when the
/// previous one expired, and returns the count within the current window.
pub trait CounterStore: Send + Sync {
    fn hit(&self, key: &str, window: Duration, now: Instant) -> u32;

    /// Drop expired entries so the store does not grow unbounded.
    fn prune(&self, now: Instant);
}

/// Process-local counter store for single-instance deployments.
#[derive(Default)]
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn hit(&self, key: &str, window: Duration, now: Instant) -> u32 {
        let mut entries = self.entries.lock().expect("counter store poisoned");
        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if now > e.reset_at {
                    e.count = 1;
                    e.reset_at = now + window;
                } else {
                    e.count += 1;
                }
            })
            .or_insert(WindowEntry {
                count: 1,
                reset_at: now + window,
            });
        entry.count
    }

    fn prune(&self, now: Instant) {
        let mut entries = self.entries.lock().expect("counter store poisoned");
        entries.retain(|_, e| now <= e.reset_at);
    }
}

/// Fixed-window rate limiter keyed by `client|route-bucket`.
pub struct RateLimiter<S: CounterStore> {
    store: S,
    window: Duration,
    last_prune: Mutex<Instant>,
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            window: WINDOW,
            last_prune: Mutex::new(Instant::now()),
        }
    }

    /// Whether a request from `client` to `path` is within its limit.
    pub fn check(&self, client: &str, path: &str) -> bool {
        self.check_at(client, path, Instant::now())
    }

    fn check_at(&self, client: &str, path: &str, now: Instant) -> bool {
        self.maybe_prune(now);

        // Bucket on the first three path segments (e.g. /api/v1/cards) so
        // sub-routes share one counter.
        let bucket: String = path.split('/').take(4).collect::<Vec<_>>().join("/");
        let key = format!("{client}|{bucket}");

        let count = self.store.hit(&key, self.window, now);
        count <= limit_for(path)
    }

    /// Prune at most once per window.
    fn maybe_prune(&self, now: Instant) {
        let mut last = self.last_prune.lock().expect("prune clock poisoned");
        if now.duration_since(*last) < self.window {
            return;
        }
        *last = now;
        drop(last);
        self.store.prune(now);
    }
}

/// Resolve the request limit for a path from the route rules.
fn limit_for(path: &str) -> u32 {
    for (prefix, limit) in ROUTE_LIMITS {
        if path.starts_with(prefix) {
            return *limit;
        }
    }
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter<InMemoryCounterStore> {
        RateLimiter::new(InMemoryCounterStore::new())
    }

    #[test]
    fn allows_up_to_the_route_limit() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..30 {
            assert!(rl.check_at("1.2.3.4", "/api/v1/cards", now));
        }
        assert!(!rl.check_at("1.2.3.4", "/api/v1/cards", now));
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..30 {
            rl.check_at("1.2.3.4", "/api/v1/cards", now);
        }
        assert!(!rl.check_at("1.2.3.4", "/api/v1/cards", now));

        let later = now + WINDOW + Duration::from_secs(1);
        assert!(rl.check_at("1.2.3.4", "/api/v1/cards", later));
    }

    #[test]
    fn clients_are_counted_separately() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..30 {
            rl.check_at("1.2.3.4", "/api/v1/cards", now);
        }
        assert!(rl.check_at("5.6.7.8", "/api/v1/cards", now));
    }

    #[test]
    fn buckets_are_counted_separately() {
        let rl = limiter();
        let now = Instant::now();
        for _ in 0..30 {
            rl.check_at("1.2.3.4", "/api/v1/cards", now);
        }
        // logs uses the default bucket, unaffected by the cards counter
        assert!(rl.check_at("1.2.3.4", "/api/v1/logs", now));
    }

    #[test]
    fn default_limit_applies_to_unlisted_routes() {
        assert_eq!(limit_for("/api/v1/logs"), DEFAULT_LIMIT);
        assert_eq!(limit_for("/api/v1/cards"), 30);
        assert_eq!(limit_for("/api/v1/images/cards/x.png"), 200);
    }
}
