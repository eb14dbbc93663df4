//! Per-caller rate limiting for layout requests.
//!
//! `AppState` holds an `Arc<dyn RateLimiter>`; the default is an in-memory
//! token bucket per caller id.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Set when the request was refused: how long until a token is available.
    pub retry_after: Option<Duration>,
}

impl RateDecision {
    pub fn allow() -> Self {
        RateDecision {
            allowed: true,
            retry_after: None,
        }
    }

    pub fn deny(retry_after: Duration) -> Self {
        RateDecision {
            allowed: false,
            retry_after: Some(retry_after),
        }
    }
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, caller_id: &str) -> RateDecision;
}

// ────────────────────────────────────────────────────────────────────────────
// TokenBucketLimiter
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Each caller gets `burst` tokens, refilled continuously at
/// `per_minute / 60` tokens per second. A request spends one token.
///
/// Buckets that have refilled to capacity are indistinguishable from new ones
/// and are dropped by a sweep that runs at most once per full-refill period.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    buckets: HashMap<String, Bucket>,
    last_sweep: Instant,
}

impl TokenBucketLimiter {
    pub fn new(burst: u32, per_minute: u32) -> Self {
        TokenBucketLimiter {
            capacity: f64::from(burst.max(1)),
            refill_per_sec: f64::from(per_minute.max(1)) / 60.0,
            state: Mutex::new(LimiterState {
                buckets: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Time for an empty bucket to refill completely.
    fn full_refill(&self) -> Duration {
        Duration::from_secs_f64(self.capacity / self.refill_per_sec)
    }

    fn refilled(&self, bucket: &Bucket, now: Instant) -> f64 {
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity)
    }

    fn sweep_idle(&self, state: &mut LimiterState, now: Instant) {
        if now.duration_since(state.last_sweep) < self.full_refill() {
            return;
        }
        let before = state.buckets.len();
        state
            .buckets
            .retain(|_, bucket| self.refilled(bucket, now) < self.capacity);
        state.last_sweep = now;

        let evicted = before - state.buckets.len();
        if evicted > 0 {
            tracing::debug!(
                evicted,
                remaining = state.buckets.len(),
                "Evicted idle rate-limit buckets"
            );
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn check(&self, caller_id: &str) -> RateDecision {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        self.sweep_idle(&mut state, now);

        let bucket = state.buckets.entry(caller_id.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        bucket.tokens = self.refilled(bucket, now);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return RateDecision::allow();
        }

        let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
        tracing::debug!(caller_id, wait_secs = wait, "Rate limit exceeded");
        RateDecision::deny(Duration::from_secs_f64(wait))
    }
}
