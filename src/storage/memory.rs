//! In-memory object store.

use crate::error::StorageError;
use crate::storage::{ObjectMeta, ObjectPath, ObjectSink, ObjectStore};
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Objects = Arc<Mutex<BTreeMap<ObjectPath, Arc<Vec<u8>>>>>;

/// A purely in-memory object store.
///
/// Clones share the same objects, which makes it a convenient stand-in for a
/// remote store shared by several keystore managers. Nothing written here
/// survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Objects,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock(objects: &Objects) -> MutexGuard<'_, BTreeMap<ObjectPath, Arc<Vec<u8>>>> {
    // The map is always left consistent, so a poisoned lock is still usable.
    objects.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ObjectStore for MemoryStore {
    fn open_read(&self, path: &ObjectPath) -> Result<Box<dyn Read + Send>, StorageError> {
        let data = lock(&self.objects)
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(SharedBytes(data))))
    }

    fn open_write(&self, path: &ObjectPath) -> Result<Box<dyn ObjectSink>, StorageError> {
        Ok(Box::new(MemorySink {
            objects: Arc::clone(&self.objects),
            path: path.clone(),
            buffer: Vec::new(),
        }))
    }

    fn stat(&self, path: &ObjectPath) -> Result<ObjectMeta, StorageError> {
        let objects = lock(&self.objects);
        let data = objects
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(ObjectMeta {
            path: path.clone(),
            size: data.len() as u64,
        })
    }

    fn list(&self, prefix: Option<&ObjectPath>) -> Result<Vec<ObjectMeta>, StorageError> {
        let objects = lock(&self.objects);
        Ok(objects
            .iter()
            .filter(|(path, _)| prefix.map_or(true, |prefix| path.starts_with(prefix)))
            .map(|(path, data)| ObjectMeta {
                path: path.clone(),
                size: data.len() as u64,
            })
            .collect())
    }
}

/// Read-only view of a stored object.
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Buffers writes and publishes them on finish.
struct MemorySink {
    objects: Objects,
    path: ObjectPath,
    buffer: Vec<u8>,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ObjectSink for MemorySink {
    fn finish(self: Box<Self>) -> Result<(), StorageError> {
        let MemorySink {
            objects,
            path,
            buffer,
        } = *self;
        lock(&objects).insert(path, Arc::new(buffer));
        Ok(())
    }
}
