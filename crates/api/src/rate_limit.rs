//! Fixed-window request limiting per client.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use taskboard_infra::RateLimitConfig;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    max_clients: usize,
    trust_forwarded_for: bool,
    clients: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window,
            max_clients: config.max_clients.max(1),
            trust_forwarded_for: config.trust_forwarded_for,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn trusts_forwarded_for(&self) -> bool {
        self.trust_forwarded_for
    }

    /// Count one request for `client`; `false` once its window is exhausted.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    pub fn check_at(&self, client: &str, now: Instant) -> bool {
        // The table holds counters only, so a poisoned lock is still usable.
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        // A new client at capacity first drops expired windows, then the
        // oldest one still running.
        if !clients.contains_key(client) && clients.len() >= self.max_clients {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
            if clients.len() >= self.max_clients {
                let oldest = clients
                    .iter()
                    .min_by_key(|(_, w)| w.started)
                    .map(|(key, _)| key.clone());
                if let Some(key) = oldest {
                    clients.remove(&key);
                }
            }
        }

        let entry = clients.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(secs),
            ..RateLimitConfig::default()
        })
    }

    #[test]
    fn blocks_after_max_within_window() {
        let limiter = limiter(2, 60);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("a", t0));
        assert!(!limiter.check_at("a", t0 + Duration::from_secs(59)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(limiter.check_at("b", t0));
        assert!(!limiter.check_at("a", t0));
    }

    #[test]
    fn window_resets() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();
        assert!(limiter.check_at("a", t0));
        assert!(!limiter.check_at("a", t0 + Duration::from_secs(30)));
        assert!(limiter.check_at("a", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn table_stays_bounded_under_many_clients() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(3600),
            max_clients: 64,
            trust_forwarded_for: true,
        });
        let t0 = Instant::now();
        for i in 0..10_000u32 {
            let now = t0 + Duration::from_millis(i.into());
            assert!(limiter.check_at(&format!("198.51.100.{i}"), now));
            assert!(limiter.tracked_clients() <= 64);
        }
        assert_eq!(limiter.tracked_clients(), 64);
    }

    #[test]
    fn eviction_keeps_recent_clients() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(3600),
            max_clients: 2,
            trust_forwarded_for: true,
        });
        let t0 = Instant::now();
        assert!(limiter.check_at("old", t0));
        assert!(limiter.check_at("recent", t0 + Duration::from_secs(1)));
        assert!(limiter.check_at("new", t0 + Duration::from_secs(2)));

        // "recent" is still counted; "old" was evicted and starts over.
        assert!(!limiter.check_at("recent", t0 + Duration::from_secs(3)));
        assert!(limiter.check_at("old", t0 + Duration::from_secs(3)));
    }
}
