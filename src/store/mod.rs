pub mod disk;
pub mod memory;

use crate::core::cache::CacheStore;
use crate::core::config::AppConfig;
use disk::DiskStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the persistent store under the configured data directory.
///
/// Falls back to an in-memory store when the directory cannot be resolved or opened, so
/// a broken cache never stops the app from fetching.
pub fn open_store(config: &AppConfig) -> Arc<dyn CacheStore> {
    let opened = config
        .default_data_path()
        .and_then(|path| DiskStore::open(&path.join("cache")));

    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Persistent cache unavailable, using in-memory cache");
            Arc::new(MemoryStore::new())
        }
    }
}
