//! Text blobs kept on disk so sessions only carry a path.
//!
//! OCR output can run to tens of kilobytes; the session stores a
//! [`BlobHandle`] and the text lives in `<dir>/<prefix>-<uuid-hex>.txt`.
//! Files are never deleted: a new upload orphans the previous blob.

use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Opaque reference to a stored blob. The empty handle reads as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl From<&str> for BlobHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<PathBuf> for BlobHandle {
    fn from(p: PathBuf) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write-once text files under a shared directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `content` to a new uniquely named file and return its handle.
    pub async fn save(&self, prefix: &str, content: &str) -> Result<BlobHandle, DashboardError> {
        let dir = self.dir.clone();
        let prefix = prefix.to_string();
        let content = content.to_string();
        let content_len = content.len();

        let path = tokio::task::spawn_blocking(move || save_blocking(&dir, &prefix, &content))
            .await
            .map_err(|e| DashboardError::Internal(format!("Blob task panicked: {e}")))??;

        debug!("Saved blob {} ({} bytes)", path.display(), content_len);
        Ok(BlobHandle::from(path))
    }

    /// Full text of the blob, or `""` for an empty handle or a missing file.
    pub async fn read(&self, handle: &BlobHandle) -> Result<String, DashboardError> {
        if handle.is_empty() {
            return Ok(String::new());
        }
        match tokio::fs::read_to_string(handle.as_path()).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(DashboardError::Blob {
                path: handle.as_path().to_path_buf(),
                source: e,
            }),
        }
    }
}

fn save_blocking(dir: &Path, prefix: &str, content: &str) -> Result<PathBuf, DashboardError> {
    let io_err = |source| DashboardError::Blob {
        path: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut file = tempfile::Builder::new()
        .prefix(".blob-")
        .tempfile_in(dir)
        .map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;

    let path = dir.join(blob_file_name(prefix, Uuid::new_v4()));
    file.persist_noclobber(&path).map_err(|e| io_err(e.error))?;
    Ok(path)
}

/// `<prefix>-<uuid as 32 hex digits>.txt`
fn blob_file_name(prefix: &str, id: Uuid) -> String {
    format!("{prefix}-{}.txt", id.simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let handle = store.save("syllabus", "hello world").await.unwrap();
        assert_eq!(store.read(&handle).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn saved_file_is_named_after_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let handle = store.save("syllabus", "x").await.unwrap();
        let name = handle.as_path().file_name().unwrap().to_string_lossy().to_string();
        let id = name
            .strip_prefix("syllabus-")
            .and_then(|rest| rest.strip_suffix(".txt"))
            .unwrap_or_else(|| panic!("got: {name}"));
        assert_eq!(id.len(), 32, "got: {name}");
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()), "got: {name}");
        assert_eq!(Uuid::parse_str(id).unwrap().get_version_num(), 4);
        assert_eq!(handle.as_path().parent(), Some(dir.path()));

        // only the blob remains; the staging file was renamed into place
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn each_save_gets_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let a = store.save("syllabus", "first").await.unwrap();
        let b = store.save("syllabus", "second").await.unwrap();
        assert_ne!(a, b);
        // the older blob is orphaned, not removed
        assert_eq!(store.read(&a).await.unwrap(), "first");
        assert_eq!(store.read(&b).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn empty_handle_reads_as_empty_string() {
        let store = BlobStore::new(std::env::temp_dir());
        assert_eq!(store.read(&BlobHandle::empty()).await.unwrap(), "");
        assert_eq!(store.read(&BlobHandle::from("")).await.unwrap(), "");
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_string() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let handle = BlobHandle::from(dir.path().join("does-not-exist.txt"));
        assert_eq!(store.read(&handle).await.unwrap(), "");
    }

    #[tokio::test]
    async fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().join("nested").join("blobs"));

        let handle = store.save("syllabus", "ünïcödé text").await.unwrap();
        assert_eq!(store.read(&handle).await.unwrap(), "ünïcödé text");
    }
}
