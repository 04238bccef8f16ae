use super::StoreError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only per-check log files. The live log for a check lives at
/// `<base>/<name>.log`, one JSON entry per line; rotation moves its contents
/// into a gzip archive at `<base>/<archive_id>.gz`.
#[derive(Debug, Clone)]
pub struct LogStore {
    base_dir: PathBuf,
}

impl LogStore {
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn live_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.log"))
    }

    fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.base_dir.join(format!("{archive_id}.gz"))
    }

    /// Append one entry as a JSON line, creating the log if needed.
    pub async fn append<T: Serialize>(&self, name: &str, entry: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.live_path(name))
            .await?;
        file.write_all(&line).await?;

        Ok(())
    }

    /// Names of all logs, without extensions. Live logs only by default;
    /// `include_compressed` adds the archives.
    pub async fn list(&self, include_compressed: bool) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.base_dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();

            if let Some(name) = file_name.strip_suffix(".log") {
                names.push(name.to_string());
            } else if include_compressed {
                if let Some(name) = file_name.strip_suffix(".gz") {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Gzip the live log's current contents into a new archive entry. The
    /// live log itself is left untouched; callers truncate it separately.
    pub async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), StoreError> {
        let bytes = fs::read(self.live_path(log_id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound,
                _ => StoreError::Io(e),
            })?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes)?;
        let compressed = encoder.finish()?;

        fs::write(self.archive_path(archive_id), compressed).await?;
        Ok(())
    }

    /// Reset a live log to zero bytes.
    pub async fn truncate(&self, log_id: &str) -> Result<(), StoreError> {
        fs::File::create(self.live_path(log_id)).await?;
        Ok(())
    }

    /// Decompressed contents of an archive entry.
    pub async fn read_archive(&self, archive_id: &str) -> Result<Vec<u8>, StoreError> {
        let compressed = fs::read(self.archive_path(archive_id))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StoreError::NotFound,
                _ => StoreError::Io(e),
            })?;

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}
