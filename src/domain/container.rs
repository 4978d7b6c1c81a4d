use std::fmt;

use super::{FileName, StoreError};

/// Leaf name of the placeholder object that keeps an empty container listable.
pub const MARKER_NAME: &str = ".keep";

/// The fixed path prefix inside the repository that holds every stored file.
///
/// Stored normalized: no leading or trailing `/`, no empty or relative segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPath(String);

impl ContainerPath {
    pub fn new(prefix: &str) -> Result<Self, StoreError> {
        let trimmed = prefix.trim_matches('/');
        let invalid = |reason: &str| StoreError::InvalidPath {
            path: prefix.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("container prefix must not be empty"));
        }
        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(invalid("container prefix has an empty or relative segment"));
            }
            if segment.contains('\\') || segment.chars().any(char::is_control) {
                return Err(invalid("container prefix has an unsupported character"));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full logical path of `name` inside this container.
    pub fn join(&self, name: &FileName) -> String {
        format!("{}/{}", self.0, name)
    }

    pub fn marker_path(&self) -> String {
        format!("{}/{}", self.0, MARKER_NAME)
    }

    /// Resolve a logical path back to the leaf name it stores.
    ///
    /// Only direct children of the container are addressable, and the marker
    /// is never exposed.
    pub fn leaf_of(&self, path: &str) -> Result<FileName, StoreError> {
        let outside = || StoreError::InvalidPath {
            path: path.to_string(),
            reason: format!("must be a file directly inside '{}'", self.0),
        };

        let rest = path
            .strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(outside)?;

        FileName::new(rest).map_err(|err| match err {
            StoreError::InvalidName { reason, .. } => {
                StoreError::InvalidPath { path: path.to_string(), reason }
            }
            other => other,
        })
    }
}

impl fmt::Display for ContainerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
