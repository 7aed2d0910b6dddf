//! Per-user request rate limiting
//!
//! Sliding one-minute window of request instants per user id.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;
use turf_advisor_config::RateLimitConfig;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Rate limit exceeded, retry in {}s", retry_after.as_secs().max(1))]
pub struct RateLimitError {
    pub retry_after: Duration,
}

pub struct RateLimiter {
    enabled: bool,
    per_window: usize,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            per_window: config.requests_per_minute.max(1) as usize,
            hits: DashMap::new(),
        }
    }

    /// Count one request for `user_id`, or refuse it
    pub fn check(&self, user_id: &str) -> Result<(), RateLimitError> {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: &str, now: Instant) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }
        let mut hits = self.hits.entry(user_id.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= WINDOW)
        {
            hits.pop_front();
        }
        if hits.len() >= self.per_window {
            let oldest = hits.front().copied().unwrap_or(now);
            return Err(RateLimitError {
                retry_after: WINDOW.saturating_sub(now.saturating_duration_since(oldest)),
            });
        }
        hits.push_back(now);
        Ok(())
    }

    /// Drop users with no request in the current window
    pub fn prune(&self) {
        let now = Instant::now();
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|t| now.saturating_duration_since(*t) < WINDOW)
        });
    }

    pub fn tracked_users(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_minute: per_minute,
        })
    }

    #[test]
    fn test_limit_per_user() {
        let limiter = limiter(2);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_ok());
        assert!(limiter.check_at("a", now).is_ok());
        let err = limiter.check_at("a", now).unwrap_err();
        assert_eq!(err.retry_after, WINDOW);
        assert!(limiter.check_at("b", now).is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1);
        let start = Instant::now();
        assert!(limiter.check_at("a", start).is_ok());
        assert!(limiter.check_at("a", start + Duration::from_secs(30)).is_err());
        assert!(limiter.check_at("a", start + WINDOW).is_ok());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            requests_per_minute: 1,
        });
        for _ in 0..10 {
            assert!(limiter.check("a").is_ok());
        }
        assert_eq!(limiter.tracked_users(), 0);
    }
}
