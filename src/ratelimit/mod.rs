//! # Rate-Limit Admission Layer (C7)
//!
//! Four windowed counters per `(client-ip, endpoint-class)`, window =
//! 15 minutes (spec §4.7). Generalizes the teacher's
//! `RateLimiter { requests: HashMap<String, Vec<SystemTime>>, .. }`
//! sliding-window-over-a-vec idiom into a single fixed-window counter
//! per key, backed by `moka`'s TTL eviction instead of a manually
//! pruned `Vec<SystemTime>` — the semantics spec §4.7 asks for are a
//! reset-on-window-expiry counter, not a rolling log.

use crate::error::{CmdbError, Result};
use moka::future::Cache;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Read,
    Write,
    WriteSensitive,
    Expensive,
    Destructive,
}

impl EndpointClass {
    fn limit(self) -> u32 {
        match self {
            EndpointClass::Read => 100,
            EndpointClass::Write => 30,
            EndpointClass::WriteSensitive => 20,
            EndpointClass::Expensive => 20,
            EndpointClass::Destructive => 5,
        }
    }

    fn label(self) -> &'static str {
        match self {
            EndpointClass::Read => "read",
            EndpointClass::Write => "write",
            EndpointClass::WriteSensitive => "write-sensitive",
            EndpointClass::Expensive => "expensive",
            EndpointClass::Destructive => "destructive",
        }
    }
}

/// Standard response headers advertising remaining budget (spec §4.7).
#[derive(Debug, Clone, Copy)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u32,
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    window_secs: u64,
    counters: Cache<String, u32>,
}

impl RateLimiter {
    pub fn new(window_secs: u64) -> Self {
        let counters = Cache::builder()
            .time_to_live(Duration::from_secs(window_secs))
            .build();
        Self { window_secs, counters }
    }

    fn key(client_ip: &str, class: EndpointClass) -> String {
        format!("{client_ip}:{}", class.label())
    }

    /// Increment the counter for `(client_ip, class)` and admit the
    /// request if it is within the class limit; otherwise return
    /// `RateLimited` (spec §4.7 "Over-limit response").
    pub async fn check(&self, client_ip: &str, class: EndpointClass) -> Result<RateLimitHeaders> {
        let key = Self::key(client_ip, class);
        let limit = class.limit();

        let count = match self.counters.get(&key).await {
            Some(existing) => existing + 1,
            None => 1,
        };
        self.counters.insert(key, count).await;

        if count > limit {
            return Err(CmdbError::RateLimited { retry_after_secs: self.window_secs });
        }

        Ok(RateLimitHeaders {
            limit,
            remaining: limit.saturating_sub(count),
            retry_after_secs: self.window_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_requests_under_the_limit() {
        let limiter = RateLimiter::new(900);
        for _ in 0..5 {
            assert!(limiter.check("1.2.3.4", EndpointClass::Destructive).await.is_ok());
        }
    }

    #[tokio::test]
    async fn rejects_the_n_plus_one_th_request() {
        let limiter = RateLimiter::new(900);
        for _ in 0..5 {
            limiter.check("1.2.3.4", EndpointClass::Destructive).await.unwrap();
        }
        let result = limiter.check("1.2.3.4", EndpointClass::Destructive).await;
        assert!(matches!(result, Err(CmdbError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn counters_are_independent_per_client_and_class() {
        let limiter = RateLimiter::new(900);
        for _ in 0..5 {
            limiter.check("1.2.3.4", EndpointClass::Destructive).await.unwrap();
        }
        assert!(limiter.check("5.6.7.8", EndpointClass::Destructive).await.is_ok());
        assert!(limiter.check("1.2.3.4", EndpointClass::Read).await.is_ok());
    }
}
