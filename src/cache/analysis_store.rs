//! Fingerprint -> palette cache
//!
//! Shared by every logical key that happens to serve the same image bytes.
//! Entries are written once, by the holder of the fingerprint lock, and
//! never change afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::keyed_lock::{KeyedLock, KeyedLockRegistry};
use super::record_dir::RecordDir;
use crate::errors::StoreResult;
use crate::models::{AnalysisEntry, ContentFingerprint, Palette};

pub struct AnalysisStore {
    entries: RwLock<HashMap<ContentFingerprint, Arc<AnalysisEntry>>>,
    records: RecordDir,
    locks: KeyedLockRegistry,
}

impl AnalysisStore {
    /// Store rooted at `<cache_dir>/analysis`
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            records: RecordDir::new(cache_dir.join("analysis")),
            locks: KeyedLockRegistry::new(),
        }
    }

    pub async fn get(&self, fingerprint: &ContentFingerprint) -> Option<Arc<AnalysisEntry>> {
        self.entries.read().await.get(fingerprint).cloned()
    }

    /// Record the palette for `fingerprint` in memory, then on disk.
    ///
    /// An existing entry is kept as is. On a disk failure the in-memory
    /// entry stays and remains authoritative for this process.
    pub async fn set(&self, fingerprint: &ContentFingerprint, palette: Palette) -> StoreResult<()> {
        let entry = {
            let mut entries = self.entries.write().await;
            if entries.contains_key(fingerprint) {
                debug!(fingerprint = %fingerprint, "Analysis already cached, keeping existing entry");
                return Ok(());
            }
            let entry = Arc::new(AnalysisEntry {
                fingerprint: fingerprint.clone(),
                palette,
            });
            entries.insert(fingerprint.clone(), entry.clone());
            entry
        };

        self.records.write(fingerprint.as_str(), entry.as_ref()).await
    }

    /// Bulk-load persisted analyses; returns how many were loaded
    pub async fn load_all(&self) -> StoreResult<usize> {
        let loaded: Vec<AnalysisEntry> = self.records.load_all().await?;
        let count = loaded.len();

        let mut entries = self.entries.write().await;
        for entry in loaded {
            entries.insert(entry.fingerprint.clone(), Arc::new(entry));
        }

        if count > 0 {
            info!("Loaded {} analysis cache entries from {}", count, self.records.path().display());
        }
        Ok(count)
    }

    /// Exclusion handle for `fingerprint`; the same instance for every caller
    pub async fn acquire_lock(&self, fingerprint: &ContentFingerprint) -> KeyedLock {
        self.locks.acquire(fingerprint.as_str()).await
    }

    pub async fn prune_idle_locks(&self) -> usize {
        self.locks.prune_idle().await
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
