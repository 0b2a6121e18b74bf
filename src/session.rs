//! Per-user dashboard state and its on-disk store.
//!
//! A browser is identified by an opaque [`SessionId`] carried in a cookie.
//! The matching [`SessionState`] is one JSON file under the session
//! directory, loaded at the start of each request and saved at the end.
//! There is no locking: two concurrent requests for the same session race
//! and the last save wins.

use crate::blob::BlobHandle;
use crate::error::DashboardError;
use crate::pipeline::extract::Extraction;
use crate::schedule::{FaqMap, ScheduleEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Random identifier of one browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a cookie value; anything that is not a UUID is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A one-shot message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Everything the dashboard remembers about one browser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub faq: FaqMap,
    /// Sorted by week ascending.
    pub schedule: Vec<ScheduleEntry>,
    pub summary: String,
    /// Where the OCR text of the last upload lives.
    pub ocr_blob: BlobHandle,
    last_answer: Option<String>,
    notices: Vec<Notice>,
}

impl SessionState {
    /// Replace the results of the previous upload wholesale.
    pub fn store_upload(&mut self, ocr_blob: BlobHandle, extraction: Extraction) {
        self.ocr_blob = ocr_blob;
        self.faq = extraction.faq;
        self.schedule = extraction.schedule;
        self.summary = extraction.summary;
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.last_answer = Some(answer.into());
    }

    /// The last answer, removed so it shows once.
    pub fn take_answer(&mut self) -> Option<String> {
        self.last_answer.take()
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Queued notices in arrival order, removed so they show once.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn has_schedule(&self) -> bool {
        !self.schedule.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One JSON file per session under a directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// State for `id`; a missing file is a fresh session.
    ///
    /// A file that no longer deserialises is logged and replaced by a fresh
    /// session rather than failing every request that carries the cookie.
    pub async fn load(&self, id: &SessionId) -> Result<SessionState, DashboardError> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SessionState::default()),
            Err(source) => return Err(DashboardError::SessionIo { path, source }),
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!("Discarding unreadable session {}: {}", id, e);
                Ok(SessionState::default())
            }
        }
    }

    /// Persist `state`, replacing the previous file in one rename.
    pub async fn save(&self, id: &SessionId, state: &SessionState) -> Result<(), DashboardError> {
        let json = serde_json::to_vec(state)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DashboardError::SessionIo {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| DashboardError::SessionIo {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| DashboardError::SessionIo {
                path: path.clone(),
                source,
            })?;

        debug!("Saved session {} ({} bytes)", id, json.len());
        Ok(())
    }

    /// Forget a session. Deleting an unknown session is not an error.
    pub async fn delete(&self, id: &SessionId) -> Result<(), DashboardError> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DashboardError::SessionIo { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;

    fn mock_extraction() -> Extraction {
        Extraction {
            faq: mock::faq(),
            schedule: mock::schedule(),
            summary: mock::SUMMARY.to_string(),
            dropped_rows: 0,
        }
    }

    #[test]
    fn session_id_parse_rejects_garbage() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("../../etc/passwd"), None);
        assert_eq!(SessionId::parse(""), None);
    }

    #[test]
    fn answer_and_notices_are_read_once() {
        let mut s = SessionState::default();
        s.set_answer("42");
        s.push_notice(Notice::error("first"));
        s.push_notice(Notice::success("second"));

        assert_eq!(s.take_answer().as_deref(), Some("42"));
        assert_eq!(s.take_answer(), None);

        let notices = s.take_notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].message, "first");
        assert_eq!(notices[1].kind, NoticeKind::Success);
        assert!(s.take_notices().is_empty());
    }

    #[test]
    fn store_upload_replaces_everything() {
        let mut s = SessionState::default();
        s.store_upload(BlobHandle::from("/tmp/a.txt"), mock_extraction());
        s.store_upload(
            BlobHandle::from("/tmp/b.txt"),
            Extraction {
                summary: "second".into(),
                ..Extraction::default()
            },
        );
        assert_eq!(s.ocr_blob, BlobHandle::from("/tmp/b.txt"));
        assert!(!s.has_schedule());
        assert_eq!(s.faq, FaqMap::default());
        assert_eq!(s.summary, "second");
    }

    #[test]
    fn clear_resets_state() {
        let mut s = SessionState::default();
        s.store_upload(BlobHandle::from("/tmp/a.txt"), mock_extraction());
        s.set_answer("x");
        s.clear();
        assert_eq!(s, SessionState::default());
    }

    #[tokio::test]
    async fn store_round_trips_and_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        let id = SessionId::new();

        assert_eq!(store.load(&id).await.unwrap(), SessionState::default());

        let mut state = SessionState::default();
        state.store_upload(BlobHandle::from("/tmp/a.txt"), mock_extraction());
        state.push_notice(Notice::success("done"));
        store.save(&id, &state).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), state);

        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), SessionState::default());
    }

    #[tokio::test]
    async fn corrupt_session_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let id = SessionId::new();
        std::fs::write(dir.path().join(format!("{id}.json")), b"{not json").unwrap();
        assert_eq!(store.load(&id).await.unwrap(), SessionState::default());
    }
}
