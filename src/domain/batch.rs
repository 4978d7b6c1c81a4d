use serde::{Deserialize, Serialize};

use super::{FileEntry, StoreError};

/// One file queued for a batch upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new<N: Into<String>>(name: N, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

/// How a batch upload reacts to a failing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// Stop at the first failure; later files are never attempted.
    #[default]
    FailFast,
    /// Attempt every file and report each outcome.
    BestEffort,
}

/// Progress notification emitted after each file of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress<'a> {
    /// Files processed so far, successful or not.
    pub completed: usize,
    pub total: usize,
    /// Name of the file just processed.
    pub name: &'a str,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub name: String,
    pub error: StoreError,
}

/// Outcome of a batch upload.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub uploaded: Vec<FileEntry>,
    pub failures: Vec<BatchFailure>,
    /// Names never attempted because the batch stopped early.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    /// True when every queued file was uploaded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn failure_for(&self, name: &str) -> Option<&StoreError> {
        self.failures.iter().find(|failure| failure.name == name).map(|failure| &failure.error)
    }
}
