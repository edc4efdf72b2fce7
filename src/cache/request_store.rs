//! Logical key -> request metadata cache
//!
//! Last writer wins, in memory and on disk alike. Freshness is the
//! caller's concern: `get` hands back whatever is stored, expired or not.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::record_dir::RecordDir;
use crate::errors::StoreResult;
use crate::models::{ContentFingerprint, ImageLocations, LogicalKey, RequestEntry, WallpaperMetadata};

pub struct RequestStore {
    entries: RwLock<HashMap<LogicalKey, Arc<RequestEntry>>>,
    records: RecordDir,
    /// Orders writers so the mirror and the record files agree
    write_order: Mutex<()>,
}

impl RequestStore {
    /// Store rooted at `<cache_dir>/requests`
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            records: RecordDir::new(cache_dir.join("requests")),
            write_order: Mutex::new(()),
        }
    }

    pub async fn get(&self, key: &LogicalKey) -> Option<Arc<RequestEntry>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Replace the entry for `key`, then persist it
    pub async fn set(
        &self,
        key: &LogicalKey,
        fingerprint: &ContentFingerprint,
        image_urls: ImageLocations,
        metadata: WallpaperMetadata,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let entry = Arc::new(RequestEntry {
            locale: key.locale.clone(),
            days_ago: key.days_ago,
            fingerprint: fingerprint.clone(),
            image_urls,
            metadata,
            expires_at,
        });

        // Readers only wait on the mirror insert, never on the disk write
        let _order = self.write_order.lock().await;
        self.entries.write().await.insert(key.clone(), entry.clone());
        self.records.write(&key.to_string(), entry.as_ref()).await
    }

    /// Bulk-load persisted requests; returns how many were loaded
    pub async fn load_all(&self) -> StoreResult<usize> {
        let loaded: Vec<RequestEntry> = self.records.load_all().await?;
        let count = loaded.len();

        let mut entries = self.entries.write().await;
        for entry in loaded {
            entries.insert(entry.key(), Arc::new(entry));
        }

        if count > 0 {
            info!("Loaded {} request cache entries from {}", count, self.records.path().display());
        }
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hasher::fingerprint;
    use chrono::Duration;
    use tempfile::TempDir;

    fn urls() -> ImageLocations {
        ImageLocations::from([(
            "1920x1080".to_string(),
            "https://www.bing.com/th?id=OHR.Test_1920x1080.jpg".to_string(),
        )])
    }

    fn metadata(title: &str) -> WallpaperMetadata {
        WallpaperMetadata {
            title: title.to_string(),
            start_date: "20251019".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let tmp = TempDir::new().unwrap();
        let store = RequestStore::new(tmp.path());
        let key = LogicalKey::new("en-US", 0);
        let expires = Utc::now() + Duration::hours(1);

        store
            .set(&key, &fingerprint(b"a"), urls(), metadata("first"), expires)
            .await
            .unwrap();
        store
            .set(&key, &fingerprint(b"b"), ImageLocations::new(), metadata("second"), expires)
            .await
            .unwrap();

        let entry = store.get(&key).await.unwrap();
        assert_eq!(entry.fingerprint, fingerprint(b"b"));
        assert_eq!(entry.metadata.title, "second");
        assert!(entry.image_urls.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_returns_expired_entries() {
        let tmp = TempDir::new().unwrap();
        let store = RequestStore::new(tmp.path());
        let key = LogicalKey::new("ja-JP", 2);
        let expired = Utc::now() - Duration::minutes(5);

        store
            .set(&key, &fingerprint(b"a"), urls(), metadata("old"), expired)
            .await
            .unwrap();

        let entry = store.get(&key).await.unwrap();
        assert!(!entry.is_fresh(Utc::now()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_leave_memory_and_disk_in_agreement() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(RequestStore::new(tmp.path()));
        let key = LogicalKey::new("en-US", 0);
        let expires = Utc::now() + Duration::hours(1);

        for round in 0..25 {
            let writers: Vec<_> = (0..8)
                .map(|i| {
                    let store = store.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        let title = format!("t{i}");
                        store
                            .set(&key, &fingerprint(title.as_bytes()), urls(), metadata(&title), expires)
                            .await
                    })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let in_memory = store.get(&key).await.unwrap();
            let on_disk = RequestStore::new(tmp.path());
            on_disk.load_all().await.unwrap();
            let on_disk = on_disk.get(&key).await.unwrap();
            assert_eq!(on_disk.metadata.title, in_memory.metadata.title, "round {round}");
            assert_eq!(on_disk.fingerprint, in_memory.fingerprint, "round {round}");
        }
    }

    #[tokio::test]
    async fn test_reload_from_disk() {
        let tmp = TempDir::new().unwrap();
        let expires = Utc::now() + Duration::hours(1);
        {
            let store = RequestStore::new(tmp.path());
            for (locale, days) in [("en-US", 0), ("en-US", 1), ("de-DE", 0)] {
                store
                    .set(&LogicalKey::new(locale, days), &fingerprint(b"x"), urls(), metadata(locale), expires)
                    .await
                    .unwrap();
            }
        }
        assert!(tmp.path().join("requests").join("en-US_1.json").exists());

        let store = RequestStore::new(tmp.path());
        assert!(store.is_empty().await);
        assert_eq!(store.load_all().await.unwrap(), 3);
        let entry = store.get(&LogicalKey::new("de-DE", 0)).await.unwrap();
        assert_eq!(entry.metadata.title, "de-DE");
        assert_eq!(entry.image_urls, urls());
    }
}
