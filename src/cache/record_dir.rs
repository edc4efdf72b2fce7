//! Flat-file JSON persistence shared by both caches
//!
//! One directory, one pretty-printed JSON file per record key. Writes go
//! through a temporary file and a rename so a crash never leaves a torn
//! record behind.

use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct RecordDir {
    dir: PathBuf,
}

impl RecordDir {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))
    }

    fn record_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.json"))
    }

    /// Overwrite the record `stem` with `value`
    pub async fn write<T: Serialize>(&self, stem: &str, value: &T) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(value)?;
        self.ensure().await?;

        let tmp_path = self.dir.join(format!(".{stem}.{}.tmp", Uuid::new_v4()));
        let final_path = self.record_path(stem);

        if let Err(e) = fs::write(&tmp_path, &data).await {
            return Err(StoreError::io(&tmp_path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::io(&final_path, e));
        }
        Ok(())
    }

    /// Read every parseable `*.json` record. A missing directory yields an
    /// empty list; unreadable or corrupt files are skipped.
    pub async fn load_all<T: DeserializeOwned>(&self) -> StoreResult<Vec<T>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match entry.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable cache record");
                    continue;
                }
            };
            match serde_json::from_slice::<T>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping corrupt cache record");
                }
            }
        }

        Ok(records)
    }
}
