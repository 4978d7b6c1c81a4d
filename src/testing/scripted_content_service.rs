use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::StoreError;
use crate::ports::{ContentService, DeleteRequest, RemoteContent, RemoteEntry, WriteRequest};

/// Content service replaying canned responses in order.
///
/// Running out of scripted responses fails the call with a transient error
/// so tests notice unexpected extra requests.
#[derive(Default)]
pub struct ScriptedContentService {
    gets: Mutex<VecDeque<Result<RemoteContent, StoreError>>>,
    puts: Mutex<VecDeque<Result<RemoteEntry, StoreError>>>,
    deletes: Mutex<VecDeque<Result<(), StoreError>>>,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    put_messages: Mutex<Vec<String>>,
}

impl ScriptedContentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gets(gets: Vec<Result<RemoteContent, StoreError>>) -> Self {
        let service = Self::new();
        service.gets.lock().expect("gets lock poisoned").extend(gets);
        service
    }

    pub fn push_get(self, response: Result<RemoteContent, StoreError>) -> Self {
        self.gets.lock().expect("gets lock poisoned").push_back(response);
        self
    }

    pub fn push_put(self, response: Result<RemoteEntry, StoreError>) -> Self {
        self.puts.lock().expect("puts lock poisoned").push_back(response);
        self
    }

    pub fn push_delete(self, response: Result<(), StoreError>) -> Self {
        self.deletes.lock().expect("deletes lock poisoned").push_back(response);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn put_messages(&self) -> Vec<String> {
        self.put_messages.lock().expect("messages lock poisoned").clone()
    }
}

fn exhausted(what: &str) -> StoreError {
    StoreError::Transient {
        message: format!("test: unexpected extra {} call", what),
        status: Some(500),
        retry_after_ms: None,
    }
}

impl ContentService for ScriptedContentService {
    fn get(&self, _path: &str) -> Result<RemoteContent, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.gets.lock().expect("gets lock poisoned");
        guard.pop_front().unwrap_or_else(|| Err(exhausted("get")))
    }

    fn put_object(&self, request: WriteRequest<'_>) -> Result<RemoteEntry, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.put_messages.lock().expect("messages lock poisoned").push(request.message.to_string());
        let mut guard = self.puts.lock().expect("puts lock poisoned");
        guard.pop_front().unwrap_or_else(|| Err(exhausted("put")))
    }

    fn delete_object(&self, _request: DeleteRequest<'_>) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.deletes.lock().expect("deletes lock poisoned");
        guard.pop_front().unwrap_or_else(|| Err(exhausted("delete")))
    }

    fn authenticated_user(&self) -> Result<String, StoreError> {
        Ok("scripted-user".to_string())
    }
}
