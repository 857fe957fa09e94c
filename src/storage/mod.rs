//! Object storage backends.
//!
//! A keystore is persisted as a single object in an [`ObjectStore`]. The
//! store only moves bytes; it knows nothing about the container format.
//! Two backends ship with the crate: [`LocalStore`] rooted at a directory
//! and [`MemoryStore`] kept in process memory. Remote backends implement the
//! same trait.

pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use crate::error::StorageError;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// A validated, `/`-separated, relative object path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Validate and build an object path.
    ///
    /// Rejects empty paths, absolute paths, and paths with empty, `.` or
    /// `..` segments.
    ///
    /// # Example
    ///
    /// ```
    /// use remote_keystore::storage::ObjectPath;
    ///
    /// let path = ObjectPath::new("secrets/prod.rks").unwrap();
    /// assert_eq!(path.file_name(), "prod.rks");
    /// assert!(ObjectPath::new("../escape").is_err());
    /// ```
    pub fn new(path: impl Into<String>) -> Result<Self, StorageError> {
        let path = path.into();

        if path.is_empty() {
            return Err(StorageError::InvalidPath("path is empty".to_string()));
        }
        if path.starts_with('/') || path.starts_with('\\') {
            return Err(StorageError::InvalidPath(format!(
                "'{}' must be relative",
                path
            )));
        }
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\')
            {
                return Err(StorageError::InvalidPath(format!(
                    "'{}' has an invalid segment '{}'",
                    path, segment
                )));
            }
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The last segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Whether `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &ObjectPath) -> bool {
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0) && self.0[prefix.0.len()..].starts_with('/'))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for ObjectPath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Metadata about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub path: ObjectPath,
    /// Size in bytes.
    pub size: u64,
}

/// A write stream for one object.
///
/// Bytes become visible at the target path only when [`finish`] succeeds.
/// Dropping a sink without finishing it discards what was written and
/// leaves any previous object untouched.
///
/// [`finish`]: ObjectSink::finish
pub trait ObjectSink: Write + Send {
    /// Flush and publish the object, replacing any existing one.
    fn finish(self: Box<Self>) -> Result<(), StorageError>;
}

/// A byte store addressed by [`ObjectPath`].
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Open an existing object for reading.
    ///
    /// Fails with [`StorageError::NotFound`] if nothing exists at `path`.
    fn open_read(&self, path: &ObjectPath) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Open a sink that overwrites the object at `path` when finished.
    fn open_write(&self, path: &ObjectPath) -> Result<Box<dyn ObjectSink>, StorageError>;

    /// Metadata of an existing object.
    fn stat(&self, path: &ObjectPath) -> Result<ObjectMeta, StorageError>;

    /// All objects under `prefix` (or the whole store), sorted by path.
    fn list(&self, prefix: Option<&ObjectPath>) -> Result<Vec<ObjectMeta>, StorageError>;

    /// Whether an object exists at `path`.
    fn exists(&self, path: &ObjectPath) -> Result<bool, StorageError> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_valid() {
        let path = ObjectPath::new("a/b/keystore.rks").unwrap();
        assert_eq!(path.as_str(), "a/b/keystore.rks");
        assert_eq!(path.file_name(), "keystore.rks");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "keystore.rks"]);
    }

    #[test]
    fn test_object_path_invalid() {
        for bad in ["", "/abs", "a//b", "a/./b", "a/../b", "trailing/", "win\\path"] {
            assert!(
                matches!(ObjectPath::new(bad), Err(StorageError::InvalidPath(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_object_path_starts_with() {
        let path: ObjectPath = "team/prod/ks.rks".parse().unwrap();

        assert!(path.starts_with(&"team".parse().unwrap()));
        assert!(path.starts_with(&"team/prod".parse().unwrap()));
        assert!(path.starts_with(&path.clone()));
        assert!(!path.starts_with(&"tea".parse().unwrap()));
        assert!(!path.starts_with(&"team/production".parse().unwrap()));
    }
}
