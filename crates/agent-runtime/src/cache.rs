//! Response Caching
//!
//! Completions keyed by the serialized request, kept for a fixed TTL in a
//! bounded LRU. Repeated demo runs then cost one endpoint call.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    error::Result,
    provider::{Capabilities, Completion, CompletionRequest, LlmProvider},
};
use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// TTL-bounded LRU of completions
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, (Completion, Instant)>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl ResponseCache {
    /// A zero `max_entries` is treated as one
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fresh entry for `key`; expired entries are dropped
    pub async fn get(&self, key: &str) -> Option<Completion> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((completion, stored)) if stored.elapsed() < self.ttl => Some(completion.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: String, completion: Completion) {
        self.entries
            .lock()
            .await
            .put(key, (completion, Instant::now()));
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

/// Model endpoint with a [`ResponseCache`] in front
pub struct CachingProvider {
    inner: Arc<dyn LlmProvider>,
    cache: ResponseCache,
}

impl CachingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, cache: ResponseCache) -> Self {
        Self { inner, cache }
    }

    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn key(request: &CompletionRequest) -> Result<String> {
        Ok(serde_json::to_string(request)?)
    }
}

#[async_trait]
impl LlmProvider for CachingProvider {
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
        let key = Self::key(request)?;
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(provider = self.inner.name(), "Response cache hit");
            return Ok(hit);
        }

        let completion = self.inner.complete(request).await?;
        self.cache.insert(key, completion.clone()).await;
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use agent_core::{Message, ScriptedProvider, provider::GenerationOptions};

    use super::*;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![Message::user(text)], GenerationOptions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(10), 4);
        cache.insert("k".into(), Completion::text("m", "v")).await;

        assert!(cache.get("k").await.is_some());
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = ResponseCache::new(DEFAULT_TTL, 2);
        cache.insert("a".into(), Completion::text("m", "a")).await;
        cache.insert("b".into(), Completion::text("m", "b")).await;
        cache.get("a").await;
        cache.insert("c".into(), Completion::text("m", "c")).await;

        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn test_identical_requests_hit_the_cache() {
        let inner = Arc::new(ScriptedProvider::new().reply("first").reply("second"));
        let provider = CachingProvider::new(inner.clone(), ResponseCache::default());

        assert_eq!(provider.complete(&request("q")).await.unwrap().content, "first");
        assert_eq!(provider.complete(&request("q")).await.unwrap().content, "first");
        assert_eq!(provider.complete(&request("other")).await.unwrap().content, "second");
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(ScriptedProvider::new().fail("down").reply("up"));
        let provider = CachingProvider::new(inner, ResponseCache::default());

        assert!(provider.complete(&request("q")).await.is_err());
        assert_eq!(provider.complete(&request("q")).await.unwrap().content, "up");
    }
}
