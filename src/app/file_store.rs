//! Repository-backed file store.
//!
//! Translates list/put/delete into reads and commits against a
//! [`ContentService`]. Every mutation reads the object's current version
//! token first and hands it to the service as a write precondition, so a
//! concurrent writer surfaces as [`StoreError::Conflict`] instead of being
//! overwritten.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use crate::domain::{
    BatchFailure, BatchPolicy, BatchProgress, BatchReport, CancelFlag, CommitterConfig,
    ContainerPath, FileEntry, FileName, MARKER_NAME, StoreConfig, StoreError, UploadFile,
};
use crate::ports::{
    ContentService, DeleteRequest, EntryKind, RemoteContent, RemoteEntry, WriteRequest,
};

const MARKER_COMMIT_MESSAGE: &str = "Initialize file storage directory";

pub struct FileStore<S: ContentService> {
    service: S,
    container: ContainerPath,
    committer: CommitterConfig,
    max_object_bytes: u64,
    batch_policy: BatchPolicy,
    cancel: CancelFlag,
    // Set once the container is known to exist in this session; cleared when a
    // listing finds it missing so the next write recreates it.
    bootstrapped: AtomicBool,
}

impl<S: ContentService> FileStore<S> {
    pub fn new(service: S, container: ContainerPath) -> Self {
        let defaults = StoreConfig::default();
        Self {
            service,
            container,
            committer: defaults.committer,
            max_object_bytes: defaults.upload.max_object_bytes,
            batch_policy: defaults.upload.batch_policy,
            cancel: CancelFlag::new(),
            bootstrapped: AtomicBool::new(false),
        }
    }

    pub fn from_config(service: S, config: &StoreConfig) -> Result<Self, StoreError> {
        let container = config.repository.container_path()?;
        Ok(Self::new(service, container)
            .with_committer(config.committer.clone())
            .with_max_object_bytes(config.upload.max_object_bytes)
            .with_batch_policy(config.upload.batch_policy))
    }

    pub fn with_committer(mut self, committer: CommitterConfig) -> Self {
        self.committer = committer;
        self
    }

    pub fn with_max_object_bytes(mut self, limit: u64) -> Self {
        self.max_object_bytes = limit;
        self
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    /// Install a shared cancellation signal, checked before every remote call.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn container(&self) -> &ContainerPath {
        &self.container
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        self.batch_policy
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Make sure the container exists, creating the `.keep` marker if needed.
    ///
    /// Safe to call repeatedly and concurrently: losing the race to create the
    /// marker counts as success.
    pub fn ensure_container_exists(&self) -> Result<(), StoreError> {
        self.cancel.check()?;
        match self.service.get(self.container.as_str()) {
            Ok(RemoteContent::Listing(_)) => {}
            Ok(RemoteContent::Object(_)) => return Err(self.container_is_a_file()),
            Err(err) if err.is_not_found() => self.create_marker()?,
            Err(err) => return Err(err),
        }

        self.bootstrapped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn create_marker(&self) -> Result<(), StoreError> {
        self.cancel.check()?;
        let marker = self.container.marker_path();
        let request = WriteRequest {
            path: &marker,
            content: &[],
            message: MARKER_COMMIT_MESSAGE,
            expected_sha: None,
            committer: &self.committer,
        };

        match self.service.put_object(request) {
            Ok(_) => {
                tracing::info!(container = %self.container, "created container marker");
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(container = %self.container, "container marker already created");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn container_is_a_file(&self) -> StoreError {
        StoreError::malformed(
            "container",
            format!("'{}' is a file, not a directory", self.container),
        )
    }

    /// List the files in the container.
    ///
    /// A container that does not exist yet lists as empty.
    pub fn list(&self) -> Result<Vec<FileEntry>, StoreError> {
        self.cancel.check()?;
        let listing = match self.service.get(self.container.as_str()) {
            Ok(RemoteContent::Listing(entries)) => entries,
            Ok(RemoteContent::Object(_)) => return Err(self.container_is_a_file()),
            Err(err) if err.is_not_found() => {
                self.bootstrapped.store(false, Ordering::SeqCst);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let observed_at = Utc::now();
        listing
            .into_iter()
            .filter(|entry| !is_non_file(entry))
            .filter(|entry| !self.is_marker(entry))
            .map(|entry| self.listed_entry(entry, observed_at))
            .collect()
    }

    fn is_marker(&self, entry: &RemoteEntry) -> bool {
        entry.name.as_deref() == Some(MARKER_NAME)
            || entry.path.as_deref() == Some(self.container.marker_path().as_str())
    }

    fn listed_entry(
        &self,
        entry: RemoteEntry,
        observed_at: DateTime<Utc>,
    ) -> Result<FileEntry, StoreError> {
        let malformed = |details: String| {
            tracing::warn!(container = %self.container, "malformed listing entry: {}", details);
            StoreError::malformed("listing entry", details)
        };

        if entry.kind.is_none() {
            return Err(malformed(format!(
                "entry {:?} at {:?} has a missing or unknown type",
                entry.name, entry.path
            )));
        }
        let Some(path) = entry.path else {
            return Err(malformed(format!("entry {:?} has no path", entry.name)));
        };
        let leaf = path
            .strip_prefix(self.container.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .ok_or_else(|| malformed(format!("'{}' is not directly inside the container", path)))?;
        if let Some(name) = &entry.name
            && name != leaf
        {
            return Err(malformed(format!("name '{}' does not match path '{}'", name, path)));
        }
        let sha = entry.sha.ok_or_else(|| malformed(format!("'{}' has no version token", path)))?;
        let size = entry.size.ok_or_else(|| malformed(format!("'{}' has no size", path)))?;

        Ok(FileEntry {
            name: leaf.to_string(),
            path,
            size,
            download_url: entry.download_url,
            sha,
            observed_at,
        })
    }

    /// Upload one file, creating it or replacing the current version.
    pub fn put(&self, name: &str, bytes: &[u8]) -> Result<FileEntry, StoreError> {
        let name = FileName::new(name)?;
        let path = self.container.join(&name);
        let size = bytes.len() as u64;
        if size > self.max_object_bytes {
            return Err(StoreError::TooLarge { path, size, limit: Some(self.max_object_bytes) });
        }

        if !self.bootstrapped.load(Ordering::SeqCst) {
            self.ensure_container_exists()?;
        }

        let current_sha = match self.current_sha(&path) {
            Ok(sha) => Some(sha),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        self.cancel.check()?;
        let message = format!("Upload file: {}", name);
        let written = self.service.put_object(WriteRequest {
            path: &path,
            content: bytes,
            message: &message,
            expected_sha: current_sha.as_deref(),
            committer: &self.committer,
        })?;

        let sha = written.sha.ok_or_else(|| {
            StoreError::malformed("write response", format!("'{}' has no version token", path))
        })?;
        tracing::info!(path = %path, sha = %sha, size, replaced = current_sha.is_some(), "uploaded file");

        Ok(FileEntry {
            name: name.into(),
            path,
            size,
            download_url: written.download_url,
            sha,
            observed_at: Utc::now(),
        })
    }

    /// Read the version token of the object at `path`.
    fn current_sha(&self, path: &str) -> Result<String, StoreError> {
        self.cancel.check()?;
        match self.service.get(path)? {
            RemoteContent::Object(object) => object.entry.sha.ok_or_else(|| {
                StoreError::malformed("object", format!("'{}' has no version token", path))
            }),
            RemoteContent::Listing(_) => Err(StoreError::malformed(
                "object",
                format!("'{}' is a directory, not a file", path),
            )),
        }
    }

    /// Upload files one at a time using the configured batch policy.
    pub fn put_many(&self, files: &[UploadFile]) -> BatchReport {
        self.put_many_with_progress(files, |_| {})
    }

    /// Upload files one at a time, reporting progress after each file.
    pub fn put_many_with_progress<F>(&self, files: &[UploadFile], mut on_progress: F) -> BatchReport
    where
        F: FnMut(BatchProgress<'_>),
    {
        let total = files.len();
        let mut report = BatchReport::default();

        for (index, file) in files.iter().enumerate() {
            let result = self.put(&file.name, &file.bytes);
            on_progress(BatchProgress { completed: index + 1, total, name: &file.name });

            let error = match result {
                Ok(entry) => {
                    report.uploaded.push(entry);
                    continue;
                }
                Err(error) => error,
            };

            tracing::warn!(name = %file.name, "upload failed: {}", error);
            let stop = self.batch_policy == BatchPolicy::FailFast
                || matches!(error, StoreError::Cancelled);
            report.failures.push(BatchFailure { name: file.name.clone(), error });
            if stop {
                report.skipped.extend(files[index + 1..].iter().map(|file| file.name.clone()));
                break;
            }
        }

        report
    }

    /// Delete the file at `path`, at whatever version it currently has.
    ///
    /// The version is read and then passed as a precondition; if another
    /// writer changes the file in between, the delete fails with a conflict.
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        let name = self.container.leaf_of(path)?;
        let path = self.container.join(&name);
        let sha = self.current_sha(&path)?;
        self.delete_at(&path, &name, &sha)
    }

    /// Delete the file at `path` only if it is still at version `sha`.
    pub fn delete_version(&self, path: &str, sha: &str) -> Result<(), StoreError> {
        let name = self.container.leaf_of(path)?;
        let path = self.container.join(&name);
        self.delete_at(&path, &name, sha)
    }

    fn delete_at(&self, path: &str, name: &FileName, sha: &str) -> Result<(), StoreError> {
        self.cancel.check()?;
        let message = format!("Delete file: {}", name);
        self.service.delete_object(DeleteRequest {
            path,
            message: &message,
            expected_sha: sha,
            committer: &self.committer,
        })?;
        tracing::info!(path = %path, sha = %sha, "deleted file");
        Ok(())
    }
}

/// Directories, symlinks and submodules are not stored files. Entries of
/// unknown type are kept so `listed_entry` can surface them.
fn is_non_file(entry: &RemoteEntry) -> bool {
    matches!(entry.kind, Some(EntryKind::Dir | EntryKind::Symlink | EntryKind::Submodule))
}
