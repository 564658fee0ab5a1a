//! Rate Limiting
//!
//! [`RateLimiter`] spaces calls out to `calls_per_second`, letting `burst`
//! calls through back to back. [`RateLimitedProvider`] applies one in front
//! of any model endpoint.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    provider::{Capabilities, Completion, CompletionRequest, LlmProvider},
};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Sliding one-second window limiter
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    burst: usize,
    recent: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    /// One call per second, no burst
    fn default() -> Self {
        Self {
            min_interval: WINDOW,
            burst: 1,
            recent: Mutex::new(VecDeque::new()),
        }
    }
}

impl RateLimiter {
    pub fn new(calls_per_second: f64, burst: usize) -> Result<Self> {
        if !calls_per_second.is_finite() || calls_per_second <= 0.0 {
            return Err(AgentError::Config(format!(
                "calls_per_second must be positive, got {calls_per_second}"
            )));
        }
        Ok(Self {
            min_interval: Duration::from_secs_f64(1.0 / calls_per_second),
            burst: burst.max(1),
            recent: Mutex::new(VecDeque::new()),
        })
    }

    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until another call is allowed, then record it
    pub async fn acquire(&self) {
        let mut recent = self.recent.lock().await;
        let now = Instant::now();

        while recent
            .front()
            .is_some_and(|t| now.duration_since(*t) > WINDOW)
        {
            recent.pop_front();
        }

        if recent.len() >= self.burst {
            if let Some(last) = recent.back() {
                let elapsed = now.duration_since(*last);
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    tracing::debug!(wait_ms = wait.as_millis(), "Rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }

        recent.push_back(Instant::now());
    }
}

/// Model endpoint behind a [`RateLimiter`]
pub struct RateLimitedProvider {
    inner: Arc<dyn LlmProvider>,
    limiter: RateLimiter,
}

impl RateLimitedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl LlmProvider for RateLimitedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.limiter.acquire().await;
        self.inner.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use agent_core::{Message, ScriptedProvider, provider::GenerationOptions};

    use super::*;

    #[test]
    fn test_rejects_non_positive_rates() {
        assert!(RateLimiter::new(0.0, 1).is_err());
        assert!(RateLimiter::new(f64::NAN, 1).is_err());
        assert_eq!(
            RateLimiter::new(4.0, 1).unwrap().min_interval(),
            Duration::from_millis(250)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaces_calls_after_burst() {
        let limiter = RateLimiter::new(2.0, 2).unwrap();
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_limited_provider_delegates() {
        let inner = Arc::new(ScriptedProvider::repeating("ok"));
        let provider = RateLimitedProvider::new(inner.clone(), RateLimiter::default());
        let request = CompletionRequest::new(vec![Message::user("hi")], GenerationOptions::default());

        let start = Instant::now();
        for _ in 0..3 {
            assert_eq!(provider.complete(&request).await.unwrap().content, "ok");
        }
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(inner.call_count(), 3);
        assert_eq!(provider.name(), "scripted");
    }
}
