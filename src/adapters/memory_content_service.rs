//! In-memory content service with the same version-token rules as the remote API.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use url::Url;

use crate::domain::StoreError;
use crate::ports::{
    ContentService, DeleteRequest, EntryKind, RemoteContent, RemoteEntry, RemoteObject,
    WriteRequest,
};

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    sha: String,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    commits: Vec<String>,
    version: u64,
}

impl State {
    fn next_sha(&mut self, path: &str, content: &[u8]) -> String {
        self.version += 1;
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        content.hash(&mut hasher);
        format!("{:016x}{:08x}", hasher.finish(), self.version)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.objects.range(prefix.clone()..).next().is_some_and(|(key, _)| key.starts_with(&prefix))
    }
}

/// Thread-safe in-process repository.
///
/// Directories exist only implicitly, through the objects below them.
#[derive(Debug)]
pub struct MemoryContentService {
    state: Mutex<State>,
    login: String,
}

impl Default for MemoryContentService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryContentService {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()), login: "memory-user".to_string() }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write an object directly, bypassing version checks, as a second writer would.
    pub fn write_out_of_band(&self, path: &str, content: &[u8]) -> String {
        let mut state = self.lock();
        let sha = state.next_sha(path, content);
        state.objects.insert(path.to_string(), StoredObject { content: content.to_vec(), sha: sha.clone() });
        state.commits.push(format!("out-of-band write: {}", path));
        sha
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().objects.contains_key(path)
    }

    pub fn sha_of(&self, path: &str) -> Option<String> {
        self.lock().objects.get(path).map(|object| object.sha.clone())
    }

    pub fn content_of(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(path).map(|object| object.content.clone())
    }

    /// Paths of every stored object, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Commit messages in the order they were applied.
    pub fn commits(&self) -> Vec<String> {
        self.lock().commits.clone()
    }
}

fn download_url(path: &str) -> Option<Url> {
    Url::parse("memory://store/").ok()?.join(path).ok()
}

fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn file_entry(path: &str, object: &StoredObject) -> RemoteEntry {
    RemoteEntry {
        kind: Some(EntryKind::File),
        name: Some(leaf(path).to_string()),
        path: Some(path.to_string()),
        sha: Some(object.sha.clone()),
        size: Some(object.content.len() as u64),
        download_url: download_url(path),
    }
}

fn dir_entry(path: &str) -> RemoteEntry {
    RemoteEntry {
        kind: Some(EntryKind::Dir),
        name: Some(leaf(path).to_string()),
        path: Some(path.to_string()),
        sha: None,
        size: Some(0),
        download_url: None,
    }
}

impl ContentService for MemoryContentService {
    fn get(&self, path: &str) -> Result<RemoteContent, StoreError> {
        let state = self.lock();
        let path = path.trim_matches('/');

        if let Some(object) = state.objects.get(path) {
            return Ok(RemoteContent::Object(RemoteObject {
                entry: file_entry(path, object),
                content: Some(object.content.clone()),
            }));
        }

        let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
        let mut files = Vec::new();
        let mut dirs = BTreeSet::new();
        for (key, object) in state.objects.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(format!("{}{}", prefix, dir));
                }
                None => files.push(file_entry(key, object)),
            }
        }

        if files.is_empty() && dirs.is_empty() {
            return Err(StoreError::NotFound { path: path.to_string() });
        }

        let mut listing: Vec<RemoteEntry> = dirs.iter().map(|dir| dir_entry(dir)).collect();
        listing.extend(files);
        Ok(RemoteContent::Listing(listing))
    }

    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
        let mut state = self.lock();
        let path = request.path.trim_matches('/');

        if state.is_dir(path) {
            return Err(StoreError::Rejected {
                status: 422,
                message: format!("{} is a directory", path),
            });
        }

        let current = state.objects.get(path).map(|object| object.sha.clone());
        match (current.as_deref(), request.expected_sha) {
            (Some(_), None) => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: "\"sha\" wasn't supplied".to_string(),
                });
            }
            (Some(actual), Some(expected)) if actual != expected => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: format!("{} does not match {}", path, expected),
                });
            }
            (None, Some(expected)) => {
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    message: format!("{} does not exist at {}", path, expected),
                });
            }
            _ => {}
        }

        let sha = state.next_sha(path, request.content);
        let object = StoredObject { content: request.content.to_vec(), sha };
        let entry = file_entry(path, &object);
        state.objects.insert(path.to_string(), object);
        state.commits.push(request.message.to_string());
        Ok(entry)
    }

    fn delete_object(&self, request: DeleteRequest<'_>) -> Result<(), StoreError> {
        let mut state = self.lock();
        let path = request.path.trim_matches('/');

        let Some(current) = state.objects.get(path) else {
            return Err(StoreError::NotFound { path: path.to_string() });
        };
        if current.sha != request.expected_sha {
            return Err(StoreError::Conflict {
                path: path.to_string(),
                message: format!("{} does not match {}", path, request.expected_sha),
            });
        }

        state.objects.remove(path);
        state.commits.push(request.message.to_string());
        Ok(())
    }

    fn authenticated_user(&self) -> Result<String, StoreError> {
        Ok(self.login.clone())
    }
}
