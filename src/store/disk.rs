use crate::core::cache::{CacheEntry, CacheKey, CacheStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::{debug, warn};

const PARTITION_NAME: &str = "market_data";

/// Store backed by a fjall keyspace. Entries are JSON encoded and survive restarts.
pub struct DiskStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create cache directory: {}", path.display()))?;

        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open cache at {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION_NAME, PartitionCreateOptions::default())
            .context("Failed to open cache partition")?;
        debug!("Opened disk cache at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }

    fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        match self.partition.get(key.storage_key())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        self.partition
            .insert(key.storage_key(), serde_json::to_vec(entry)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    #[cfg(test)]
    fn write_raw(&self, key: &CacheKey, bytes: &[u8]) -> Result<()> {
        self.partition.insert(key.storage_key(), bytes)?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.read(key) {
            Ok(Some(entry)) => {
                debug!("Cache HIT for key: {}", key);
                Some(entry)
            }
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache read failed for key: {}, treating as miss", key);
                None
            }
        }
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) {
        match self.write(key, &entry) {
            Ok(()) => debug!(status = %entry.status, "Cache PUT for key: {}", key),
            Err(e) => warn!(error = %e, "Cache write failed for key: {}", key),
        }
    }
}
