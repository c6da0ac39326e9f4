//! Upload records in their storage shape and their navigation shape

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An upload as returned by the upload store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUpload {
    pub id: i32,
    pub commit: String,
    pub root: String,
    pub visible_at_tip: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub state: String,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub process_after: Option<OffsetDateTime>,
    #[serde(default)]
    pub num_resets: i32,
    #[serde(default)]
    pub num_failures: i32,
    pub repository_id: i32,
    pub repository_name: String,
    pub indexer: String,
    #[serde(default)]
    pub indexer_version: String,
    #[serde(default)]
    pub associated_index_id: Option<i32>,
}

/// An upload as seen by the rest of the navigation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: i32,
    pub commit: String,
    /// Repo-relative directory the index covers
    pub root: String,
    pub visible_at_tip: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub process_after: Option<OffsetDateTime>,
    pub num_resets: i32,
    pub num_failures: i32,
    pub repository_id: i32,
    pub repository_name: String,
    pub indexer: String,
    pub indexer_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_index_id: Option<i32>,
}

impl From<StoredUpload> for Upload {
    fn from(stored: StoredUpload) -> Self {
        Self {
            id: stored.id,
            commit: stored.commit,
            root: stored.root,
            visible_at_tip: stored.visible_at_tip,
            uploaded_at: stored.uploaded_at,
            state: stored.state,
            failure_message: stored.failure_message,
            started_at: stored.started_at,
            finished_at: stored.finished_at,
            process_after: stored.process_after,
            num_resets: stored.num_resets,
            num_failures: stored.num_failures,
            repository_id: stored.repository_id,
            repository_name: stored.repository_name,
            indexer: stored.indexer,
            indexer_version: stored.indexer_version,
            associated_index_id: stored.associated_index_id,
        }
    }
}

impl Upload {
    /// Whether `path` (repo-relative) falls under this upload's root.
    pub fn covers_path(&self, path: &str) -> bool {
        let root = self.root.trim_end_matches('/');
        root.is_empty()
            || path == root
            || path
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}
