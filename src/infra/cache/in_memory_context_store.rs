use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::models::attendee_context::AttendeeContext;
use crate::domain::ports::ContextCacheStore;
use async_trait::async_trait;

/// Single-instance backend for the attendee context cache. Entries carry
/// their own `fetched_at`; freshness is judged by the cache service, so this
/// store never needs to read the clock.
#[derive(Default)]
pub struct InMemoryContextStore {
    entries: RwLock<HashMap<String, AttendeeContext>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextCacheStore for InMemoryContextStore {
    async fn get(&self, key: &str) -> Option<AttendeeContext> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: &str, ctx: AttendeeContext) {
        self.entries.write().await.insert(key.to_string(), ctx);
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}
