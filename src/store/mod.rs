pub mod log_store;

pub use log_store::LogStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    AlreadyExists,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Durable per-record JSON documents, one file per record at
/// `<base>/<collection>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, collection: &str, id: &str) -> PathBuf {
        self.base_dir.join(collection).join(format!("{id}.json"))
    }

    /// Write a new record. Fails with `AlreadyExists` if the id is taken.
    pub async fn create<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(self.base_dir.join(collection)).await?;

        let json = serde_json::to_vec_pretty(record)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.record_path(collection, id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists,
                _ => StoreError::Io(e),
            })?;
        file.write_all(&json).await?;
        file.flush().await?;

        Ok(())
    }

    pub async fn read<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<T, StoreError> {
        let bytes = fs::read(self.record_path(collection, id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound,
                _ => StoreError::Io(e),
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read a record without committing to a shape. The worker validates raw
    /// documents defensively instead of trusting them to deserialize.
    pub async fn read_raw(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<serde_json::Value, StoreError> {
        self.read(collection, id).await
    }

    /// Overwrite an existing record. Fails with `NotFound` if it is absent.
    pub async fn update<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let path = self.record_path(collection, id);
        fs::metadata(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(e),
        })?;

        let json = serde_json::to_vec_pretty(record)?;
        fs::write(&path, json).await?;

        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        fs::remove_file(self.record_path(collection, id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound,
                _ => StoreError::Io(e),
            })
    }

    /// Ids of every record in the collection. A collection nobody has written
    /// to yet is just an empty list.
    pub async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.base_dir.join(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_string_lossy().strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }
}
