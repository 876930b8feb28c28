//! Fixed-window request counting for the auth endpoints.
//!
//! Keyed by client address and action; the window resets once its
//! duration has fully elapsed. Login, registration and password-reset
//! requests go through this before touching the database.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ApiError;

#[derive(Clone, Debug)]
struct WindowEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

pub struct RateLimiter {
    /// client key -> (action -> window entry)
    entries: Mutex<HashMap<String, HashMap<&'static str, WindowEntry>>>,
    max_requests: u32,
    window_seconds: i64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window_seconds,
        }
    }

    /// Count one request; errors with 429 once the window is exhausted.
    pub fn check(&self, client: &str, action: &'static str) -> Result<(), ApiError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ApiError::internal("rate limiter lock poisoned"))?;

        let now = Utc::now();
        let window = Duration::seconds(self.window_seconds);

        let client_entries = entries.entry(client.to_string()).or_default();
        let entry = client_entries.entry(action).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now >= entry.window_start + window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;

        if entry.count > self.max_requests {
            let retry_after = (entry.window_start + window - now).num_seconds().max(0);
            return Err(ApiError::rate_limited(format!(
                "too many {action} attempts, try again in {retry_after} second(s)"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(3, 60);
        for _ in 0..3 {
            limiter.check("10.0.0.1", "login").expect("under the limit");
        }
        let err = limiter.check("10.0.0.1", "login").expect_err("over the limit");
        assert!(matches!(err, ApiError::RateLimited(_)));
    }

    #[test]
    fn clients_and_actions_are_tracked_separately() {
        let limiter = RateLimiter::new(1, 60);
        limiter.check("10.0.0.1", "login").expect("first client");
        limiter.check("10.0.0.2", "login").expect("second client");
        limiter.check("10.0.0.1", "register").expect("other action");
        assert!(limiter.check("10.0.0.1", "login").is_err());
    }

    #[test]
    fn zero_second_window_resets_immediately() {
        let limiter = RateLimiter::new(1, 0);
        for _ in 0..5 {
            limiter.check("10.0.0.1", "login").expect("window always fresh");
        }
    }
}
