use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

/// A stored file as seen by callers of the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Leaf name, derived from `path`.
    pub name: String,
    /// Full logical path inside the repository (`container/name`).
    pub path: String,
    /// Size in bytes as reported by the remote service.
    pub size: u64,
    /// Locator for the raw bytes, governed by the remote service's access rules.
    pub download_url: Option<Url>,
    /// Version token of the committed object.
    pub sha: String,
    /// When this adapter observed the entry. The contents API exposes no
    /// creation time, so this is an approximation, not file history.
    pub observed_at: DateTime<Utc>,
}
