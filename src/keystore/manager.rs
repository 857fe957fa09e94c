//! Keystore lifecycle on top of an object store.
//!
//! A [`KeystoreManager`] binds an [`ObjectStore`] to at most one loaded
//! [`KeystoreHandle`]. Callers `open` a keystore (from storage or empty),
//! read and modify entries in memory, and `store` it back. Nothing is
//! durable until `store` succeeds.

use crate::cert::{Certificate, X509Certificate};
use crate::config::KeystoreConfig;
use crate::error::{KeyError, OpenError, StorageError, StoreError};
use crate::keystore::codec::{CodecRegistry, ContainerCodec};
use crate::keystore::entry::{Entry, EntryKind, KeyMaterial};
use crate::keystore::handle::KeystoreHandle;
use crate::storage::{ObjectPath, ObjectStore};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Loads, edits and persists one keystore at a time.
///
/// All mutation goes through `&mut self`; share a manager between threads by
/// wrapping it in a `Mutex`.
///
/// # Example
///
/// ```
/// use remote_keystore::keystore::KeystoreManager;
/// use remote_keystore::storage::{MemoryStore, ObjectPath};
/// use std::sync::Arc;
///
/// # fn example() -> remote_keystore::error::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let path = ObjectPath::new("prod/app.p12")?;
///
/// let mut manager = KeystoreManager::new(store.clone());
/// manager.open(None, "PKCS12", "store-pw")?;
/// manager.set_password("db", "s3cret", "entry-pw")?;
/// manager.store(&path, "store-pw")?;
///
/// let mut reader = KeystoreManager::new(store);
/// reader.open(Some(&path), "PKCS12", "store-pw")?;
/// assert_eq!(*reader.get_password("db", "entry-pw")?, "s3cret");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct KeystoreManager {
    store: Arc<dyn ObjectStore>,
    codecs: CodecRegistry,
    config: KeystoreConfig,
    handle: Option<KeystoreHandle>,
}

impl KeystoreManager {
    /// A manager with the default configuration.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, KeystoreConfig::default())
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: KeystoreConfig) -> Self {
        Self {
            store,
            codecs: CodecRegistry::with_defaults(config.kdf),
            config,
            handle: None,
        }
    }

    /// Make another container type available to `open`.
    pub fn register_codec(&mut self, codec: Box<dyn ContainerCodec>) {
        self.codecs.register(codec);
    }

    pub fn config(&self) -> &KeystoreConfig {
        &self.config
    }

    pub fn object_store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Whether a keystore is loaded.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Container type of the loaded keystore.
    pub fn container_type(&self) -> Option<&str> {
        self.handle.as_ref().map(KeystoreHandle::container_type)
    }

    /// The loaded keystore, if any.
    pub fn handle(&self) -> Option<&KeystoreHandle> {
        self.handle.as_ref()
    }

    /// Take the loaded keystore out of the manager.
    pub fn into_handle(self) -> Option<KeystoreHandle> {
        self.handle
    }

    fn loaded(&self) -> Result<&KeystoreHandle, KeyError> {
        self.handle.as_ref().ok_or(KeyError::NotOpen)
    }

    fn loaded_mut(&mut self) -> Result<&mut KeystoreHandle, KeyError> {
        self.handle.as_mut().ok_or(KeyError::NotOpen)
    }

    /// Load the keystore at `path`, or start an empty one when `path` is
    /// `None`.
    ///
    /// `container_password` verifies an existing container; for a new one it
    /// is not retained, since `store` takes the password again.
    ///
    /// On failure the previously loaded keystore, if any, stays loaded.
    pub fn open(
        &mut self,
        path: Option<&ObjectPath>,
        container_type: &str,
        container_password: &str,
    ) -> Result<(), OpenError> {
        let codec = self
            .codecs
            .get(container_type)
            .ok_or_else(|| OpenError::UnsupportedType(container_type.to_string()))?;
        let container_type = codec.container_type().to_string();

        let handle = match path {
            None => {
                info!(container_type = %container_type, "Initialized empty keystore");
                KeystoreHandle::new(container_type, self.config.kdf)
            }
            Some(path) => {
                let mut bytes = Vec::new();
                let mut reader = self.store.open_read(path)?;
                reader
                    .read_to_end(&mut bytes)
                    .map_err(|e| OpenError::Io(StorageError::Io(e)))?;
                drop(reader);

                let entries = codec.decode(&bytes, container_password)?;
                info!(
                    path = %path,
                    container_type = %container_type,
                    entries = entries.len(),
                    "Loaded keystore"
                );
                KeystoreHandle::from_entries(container_type, entries, self.config.kdf)
            }
        };

        self.handle = Some(handle);
        Ok(())
    }

    /// Persist the loaded keystore to `path`, replacing any existing object.
    ///
    /// The container is fully encoded before storage is touched, so an
    /// encoding failure leaves the existing object as it was. The write
    /// stream is released on every path; an interrupted write is discarded
    /// by the store.
    pub fn store(&self, path: &ObjectPath, container_password: &str) -> Result<(), StoreError> {
        let handle = self.handle.as_ref().ok_or(StoreError::NotOpen)?;
        let codec = self.codecs.get(handle.container_type()).ok_or_else(|| {
            StoreError::EncodeFailure(format!(
                "no codec for container type {}",
                handle.container_type()
            ))
        })?;

        let bytes = codec
            .encode(handle.entries(), container_password)
            .map_err(|e| StoreError::EncodeFailure(e.to_string()))?;

        let mut sink = self.store.open_write(path)?;
        sink.write_all(&bytes).map_err(StorageError::Io)?;
        sink.finish()?;

        info!(
            path = %path,
            container_type = %handle.container_type(),
            entries = handle.len(),
            bytes = bytes.len(),
            "Stored keystore"
        );
        Ok(())
    }

    /// Decrypt the private key at `alias`.
    pub fn get_private_key(&self, alias: &str, entry_password: &str) -> Result<KeyMaterial, KeyError> {
        self.loaded()?.get_private_key(alias, entry_password)
    }

    /// The certificate at `alias`: a trusted certificate, or the leaf
    /// certificate of a private key entry.
    pub fn get_certificate(&self, alias: &str) -> Result<Certificate, KeyError> {
        self.loaded()?.get_certificate(alias)
    }

    /// The certificate chain of the private key entry at `alias`.
    pub fn get_certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>, KeyError> {
        self.loaded()?.get_certificate_chain(alias)
    }

    /// Decrypt the secret at `alias`.
    pub fn get_password(
        &self,
        alias: &str,
        entry_password: &str,
    ) -> Result<Zeroizing<String>, KeyError> {
        self.loaded()?.get_password(alias, entry_password)
    }

    /// Store `password` at `alias`, sealed under `entry_password`.
    /// Remember to call [`store`](Self::store) afterwards.
    pub fn set_password(
        &mut self,
        alias: &str,
        password: &str,
        entry_password: &str,
    ) -> Result<(), KeyError> {
        self.loaded_mut()?
            .set_password(alias, password, entry_password)?;
        debug!(alias, "Set secret entry");
        Ok(())
    }

    /// Store a trusted certificate at `alias`.
    pub fn set_certificate_entry(
        &mut self,
        alias: &str,
        certificate: Certificate,
    ) -> Result<(), KeyError> {
        self.loaded_mut()?.set_certificate_entry(alias, certificate)?;
        debug!(alias, "Set certificate entry");
        Ok(())
    }

    /// Store a PKCS#8 private key with its chain (leaf first) at `alias`.
    pub fn set_private_key_entry(
        &mut self,
        alias: &str,
        pkcs8_der: &[u8],
        chain: Vec<Certificate>,
        entry_password: &str,
    ) -> Result<(), KeyError> {
        self.loaded_mut()?
            .set_private_key_entry(alias, pkcs8_der, chain, entry_password)?;
        debug!(alias, "Set private key entry");
        Ok(())
    }

    /// Remove the entry at `alias`.
    pub fn delete_entry(&mut self, alias: &str) -> Result<Entry, KeyError> {
        let removed = self.loaded_mut()?.delete_entry(alias)?;
        debug!(alias, kind = %removed.kind(), "Deleted entry");
        Ok(removed)
    }

    /// All aliases, sorted.
    pub fn aliases(&self) -> Result<Vec<String>, KeyError> {
        Ok(self.loaded()?.aliases().map(str::to_string).collect())
    }

    pub fn contains_alias(&self, alias: &str) -> Result<bool, KeyError> {
        Ok(self.loaded()?.contains_alias(alias))
    }

    pub fn entry_kind(&self, alias: &str) -> Result<EntryKind, KeyError> {
        self.loaded()?
            .entry_kind(alias)
            .ok_or_else(|| KeyError::NoSuchAlias(alias.to_string()))
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize, KeyError> {
        Ok(self.loaded()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, KeyError> {
        Ok(self.loaded()?.is_empty())
    }

    /// Every distinct X.509 certificate held by the keystore.
    pub fn get_all_x509_certificates(&self) -> Result<HashSet<X509Certificate>, KeyError> {
        let certificates = self.loaded()?.x509_certificates();
        debug!(count = certificates.len(), "Enumerated X.509 certificates");
        Ok(certificates)
    }
}
