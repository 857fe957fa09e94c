//! Object store rooted at a local directory.

use crate::error::StorageError;
use crate::storage::{ObjectMeta, ObjectPath, ObjectSink, ObjectStore};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Prefix of in-flight temporary files; such files are never listed.
const TEMP_PREFIX: &str = ".rks-upload-";

/// Stores each object as a file below a root directory.
///
/// Writes land in a temporary file next to the target and are renamed into
/// place on [`ObjectSink::finish`], so readers never see a half-written
/// keystore.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &ObjectPath) -> PathBuf {
        let mut full = self.root.clone();
        for segment in path.segments() {
            full.push(segment);
        }
        full
    }

    fn to_object_path(&self, file: &Path) -> Option<ObjectPath> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?
            .join("/");
        ObjectPath::new(joined).ok()
    }
}

fn map_io(path: &ObjectPath, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io(err)
    }
}

impl ObjectStore for LocalStore {
    fn open_read(&self, path: &ObjectPath) -> Result<Box<dyn Read + Send>, StorageError> {
        let file = File::open(self.resolve(path)).map_err(|e| map_io(path, e))?;
        // Directories open fine on Unix and only fail on read
        if !file.metadata()?.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &ObjectPath) -> Result<Box<dyn ObjectSink>, StorageError> {
        let target = self.resolve(path);
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        fs::create_dir_all(parent)?;

        let file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)?;

        Ok(Box::new(LocalSink { file, target }))
    }

    fn stat(&self, path: &ObjectPath) -> Result<ObjectMeta, StorageError> {
        let metadata = fs::metadata(self.resolve(path)).map_err(|e| map_io(path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        Ok(ObjectMeta {
            path: path.clone(),
            size: metadata.len(),
        })
    }

    fn list(&self, prefix: Option<&ObjectPath>) -> Result<Vec<ObjectMeta>, StorageError> {
        let base = match prefix {
            Some(prefix) => self.resolve(prefix),
            None => self.root.clone(),
        };
        if !base.exists() {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(TEMP_PREFIX))
            {
                continue;
            }
            let Some(path) = self.to_object_path(entry.path()) else {
                continue;
            };
            objects.push(ObjectMeta {
                path,
                size: entry.metadata().map_err(io::Error::from)?.len(),
            });
        }

        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }
}

/// Sink writing to a temporary file that is renamed over the target.
struct LocalSink {
    file: NamedTempFile,
    target: PathBuf,
}

impl Write for LocalSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ObjectSink for LocalSink {
    fn finish(self: Box<Self>) -> Result<(), StorageError> {
        let LocalSink { mut file, target } = *self;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&target).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}
