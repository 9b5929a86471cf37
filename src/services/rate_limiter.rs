//! Rate limiter for public writes
//!
//! Sliding one-minute window per client IP. Feedback submissions and
//! reactions share the budget.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEFAULT_MAX_PER_MINUTE: usize = 5;

/// Per-IP submission limiter
pub struct SubmissionRateLimiter {
    max_per_window: usize,
    window: Duration,
    requests: Arc<RwLock<HashMap<IpAddr, Vec<DateTime<Utc>>>>>,
}

impl SubmissionRateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        Self {
            max_per_window: max_per_minute,
            window: Duration::minutes(1),
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Requests allowed per IP within one window
    pub fn limit(&self) -> usize {
        self.max_per_window
    }

    pub fn window_seconds(&self) -> i64 {
        self.window.num_seconds()
    }

    /// Record a request if the IP still has budget
    ///
    /// Returns `false` when the request must be rejected; rejected requests
    /// are not recorded.
    pub async fn try_acquire(&self, ip: IpAddr) -> bool {
        self.try_acquire_at(ip, Utc::now()).await
    }

    async fn try_acquire_at(&self, ip: IpAddr, now: DateTime<Utc>) -> bool {
        let cutoff = now - self.window;
        let mut requests = self.requests.write().await;
        let times = requests.entry(ip).or_default();
        times.retain(|time| *time > cutoff);

        if times.len() >= self.max_per_window {
            return false;
        }
        times.push(now);
        true
    }

    /// Drop expired entries; called periodically from `main`
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut requests = self.requests.write().await;
        requests.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_ips(&self) -> usize {
        self.requests.read().await.len()
    }
}

impl Default for SubmissionRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_MINUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_limits_after_budget() {
        let limiter = SubmissionRateLimiter::default();
        let ip = IpAddr::from_str("127.0.0.1").unwrap();

        for _ in 0..5 {
            assert!(limiter.try_acquire(ip).await);
        }
        assert!(!limiter.try_acquire(ip).await);

        let other = IpAddr::from_str("10.0.0.2").unwrap();
        assert!(limiter.try_acquire(other).await);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = SubmissionRateLimiter::new(2);
        let ip = IpAddr::from_str("192.168.1.1").unwrap();
        let start = Utc::now();

        assert!(limiter.try_acquire_at(ip, start).await);
        assert!(limiter.try_acquire_at(ip, start + Duration::seconds(10)).await);
        assert!(!limiter.try_acquire_at(ip, start + Duration::seconds(30)).await);
        assert!(limiter.try_acquire_at(ip, start + Duration::seconds(61)).await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_expired_ips() {
        let limiter = SubmissionRateLimiter::default();
        let old = IpAddr::from_str("10.0.0.1").unwrap();
        let fresh = IpAddr::from_str("10.0.0.2").unwrap();

        limiter
            .try_acquire_at(old, Utc::now() - Duration::minutes(5))
            .await;
        limiter.try_acquire(fresh).await;
        assert_eq!(limiter.tracked_ips().await, 2);

        limiter.cleanup().await;
        assert_eq!(limiter.tracked_ips().await, 1);
    }
}
