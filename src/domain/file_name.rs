use std::fmt;

use super::StoreError;
use super::container::MARKER_NAME;

/// Longest leaf name accepted, in bytes.
pub const MAX_NAME_BYTES: usize = 255;

/// A validated leaf file name.
///
/// Guarantees:
/// - Non-empty and at most [`MAX_NAME_BYTES`] bytes
/// - No path separators (/, \) and not "." or ".."
/// - No NUL or other control characters
/// - No leading or trailing whitespace
/// - Not the reserved container marker name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    /// Validate and create a new instance.
    pub fn new(name: &str) -> Result<Self, StoreError> {
        match rejection_reason(name) {
            None => Ok(Self(name.to_string())),
            Some(reason) => {
                Err(StoreError::InvalidName { name: name.to_string(), reason: reason.to_string() })
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn rejection_reason(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("must not be empty");
    }
    if name.len() > MAX_NAME_BYTES {
        return Some("must be at most 255 bytes");
    }
    if name.contains('/') || name.contains('\\') {
        return Some("must not contain path separators");
    }
    if name == "." || name == ".." {
        return Some("must not be a relative path segment");
    }
    if name.chars().any(char::is_control) {
        return Some("must not contain control characters");
    }
    if name.trim() != name {
        return Some("must not start or end with whitespace");
    }
    if name == MARKER_NAME {
        return Some("is reserved for the container marker");
    }
    None
}

impl std::ops::Deref for FileName {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        self
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<FileName> for String {
    fn from(val: FileName) -> Self {
        val.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_names_are_valid() {
        assert!(FileName::new("a.txt").is_ok());
        assert!(FileName::new("report final (2).pdf").is_ok());
        assert!(FileName::new(".env.example").is_ok());
        assert!(FileName::new("日本語.md").is_ok());
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(FileName::new("..").is_err());
        assert!(FileName::new(".").is_err());
        assert!(FileName::new("/../escape.txt").is_err());
        assert!(FileName::new("..\\escape.txt").is_err());
        assert!(FileName::new("nested/file.txt").is_err());
    }

    #[test]
    fn empty_and_padded_names_are_rejected() {
        assert!(FileName::new("").is_err());
        assert!(FileName::new(" a.txt").is_err());
        assert!(FileName::new("a.txt\t").is_err());
    }

    #[test]
    fn marker_name_is_reserved() {
        let err = FileName::new(".keep").unwrap_err();
        match err {
            StoreError::InvalidName { name, reason } => {
                assert_eq!(name, ".keep");
                assert!(reason.contains("marker"));
            }
            other => panic!("unexpected error variant: {}", other),
        }
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "x".repeat(MAX_NAME_BYTES + 1);
        assert!(FileName::new(&name).is_err());
        assert!(FileName::new(&"x".repeat(MAX_NAME_BYTES)).is_ok());
    }

    proptest! {
        #[test]
        fn accepted_names_never_contain_separators(name in "\\PC{1,40}") {
            if let Ok(valid) = FileName::new(&name) {
                prop_assert!(!valid.contains('/'));
                prop_assert!(!valid.contains('\\'));
                prop_assert!(valid.as_str() != "..");
                prop_assert_eq!(valid.as_str(), name.as_str());
            }
        }

        #[test]
        fn any_name_with_a_slash_is_rejected(prefix in "[a-z]{0,8}", suffix in "[a-z.]{0,8}") {
            let name = format!("{}/{}", prefix, suffix);
            prop_assert!(FileName::new(&name).is_err());
        }
    }
}
