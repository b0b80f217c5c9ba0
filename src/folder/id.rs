//! Folder identifiers.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::{FolioError, Result};

/// A sanitized folder identifier.
///
/// Folder ids double as object-store prefixes, so the only way to obtain
/// one is [`FolderId::parse`], which trims whitespace, strips leading and
/// trailing slashes and rejects anything outside `[A-Za-z0-9/_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(String);

impl FolderId {
    /// Sanitize a caller-supplied folder id.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::folder::FolderId;
    ///
    /// assert_eq!(FolderId::parse(" /weddings/2024/ ").unwrap().as_str(), "weddings/2024");
    /// assert!(FolderId::parse("../secrets").is_err());
    /// assert!(FolderId::parse("///").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(FolioError::InvalidArgument("folderId is required".to_string()));
        }
        if !trimmed.chars().all(is_folder_char) {
            return Err(FolioError::InvalidArgument(
                "folderId contains invalid characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Sanitize an optional value, treating absence as "no folder".
    pub fn parse_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| Self::parse(value).ok())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The object-store prefix holding this folder's objects.
    pub fn prefix(&self) -> String {
        format!("{}/", self.0)
    }

    /// File name of `key` if it sits directly under this folder.
    ///
    /// Keys in sub-folders, keys outside the prefix and the bare prefix
    /// itself yield `None`.
    pub fn direct_child_name<'k>(&self, key: &'k str) -> Option<&'k str> {
        let remainder = key.strip_prefix(self.as_str())?.strip_prefix('/')?;
        if remainder.is_empty() || remainder.contains('/') {
            return None;
        }
        Some(remainder)
    }

    /// Storage key for a file directly under this folder.
    pub fn child_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.0, file_name)
    }
}

fn is_folder_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-')
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FolderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for FolderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
