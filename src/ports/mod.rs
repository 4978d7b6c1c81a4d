mod content_service;

pub use content_service::{
    ContentService, DeleteRequest, EntryKind, RemoteContent, RemoteEntry, RemoteObject,
    WriteRequest,
};
