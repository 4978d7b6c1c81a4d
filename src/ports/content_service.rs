//! Remote content service port definition.

use url::Url;

use crate::domain::{CommitterConfig, StoreError};

/// Kind of object reported in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

impl EntryKind {
    /// Parse the API `type` field; unknown kinds yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(EntryKind::File),
            "dir" => Some(EntryKind::Dir),
            "symlink" => Some(EntryKind::Symlink),
            "submodule" => Some(EntryKind::Submodule),
            _ => None,
        }
    }
}

/// One object as described by the remote service.
///
/// Fields stay optional so the caller decides how to treat incomplete data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub kind: Option<EntryKind>,
    pub name: Option<String>,
    pub path: Option<String>,
    pub sha: Option<String>,
    pub size: Option<u64>,
    pub download_url: Option<Url>,
}

/// A single object read with its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub entry: RemoteEntry,
    /// Decoded bytes, when the service inlined them.
    pub content: Option<Vec<u8>>,
}

/// Result of reading a path: a directory listing or a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteContent {
    Listing(Vec<RemoteEntry>),
    Object(RemoteObject),
}

/// A commit that creates or replaces one object.
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub message: &'a str,
    /// Version being replaced; `None` asserts the path is new.
    pub expected_sha: Option<&'a str>,
    pub committer: &'a CommitterConfig,
}

/// A commit that removes one object.
#[derive(Debug, Clone, Copy)]
pub struct DeleteRequest<'a> {
    pub path: &'a str,
    pub message: &'a str,
    pub expected_sha: &'a str,
    pub committer: &'a CommitterConfig,
}

/// Port for a versioned, commit-oriented object store.
///
/// Every mutation is a commit guarded by the version token of the object it
/// replaces. Implementations report a mismatched or missing token as
/// [`StoreError::Conflict`].
pub trait ContentService: Send + Sync {
    /// Read a directory listing or a single object. Absent paths yield
    /// [`StoreError::NotFound`].
    fn get(&self, path: &str) -> Result<RemoteContent, StoreError>;

    /// Create or update one object and return its new description.
    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError>;

    /// Delete one object at the expected version.
    fn delete_object(&self, request: DeleteRequest<'_>) -> Result<(), StoreError>;

    /// Login of the account behind the configured credential.
    fn authenticated_user(&self) -> Result<String, StoreError>;
}

impl<T: ContentService + ?Sized> ContentService for Box<T> {
    fn get(&self, path: &str) -> Result<RemoteContent, StoreError> {
        (**self).get(path)
    }

    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
        (**self).put_object(request)
    }

    fn delete_object(&self, request: DeleteRequest<'_>) -> Result<(), StoreError> {
        (**self).delete_object(request)
    }

    fn authenticated_user(&self) -> Result<String, StoreError> {
        (**self).authenticated_user()
    }
}

impl<T: ContentService + ?Sized> ContentService for std::sync::Arc<T> {
    fn get(&self, path: &str) -> Result<RemoteContent, StoreError> {
        (**self).get(path)
    }

    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
        (**self).put_object(request)
    }

    fn delete_object(&self, request: DeleteRequest<'_>) -> Result<(), StoreError> {
        (**self).delete_object(request)
    }

    fn authenticated_user(&self) -> Result<String, StoreError> {
        (**self).authenticated_user()
    }
}
