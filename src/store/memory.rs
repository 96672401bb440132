use crate::core::cache::{CacheEntry, CacheKey, CacheStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory store. Entries live as long as the process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.inner.lock().await;
        let entry = entries.get(&key.storage_key()).cloned();
        if entry.is_some() {
            debug!("Cache HIT for key: {}", key);
        } else {
            debug!("Cache MISS for key: {}", key);
        }
        entry
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) {
        let mut entries = self.inner.lock().await;
        debug!(status = %entry.status, "Cache PUT for key: {}", key);
        entries.insert(key.storage_key(), entry);
    }
}
