//! Error types for the keystore library.
//!
//! Each layer has its own error enum so callers can match on the failure that
//! matters to them: [`OpenError`] for loading a container, [`KeyError`] for
//! entry access, [`StoreError`] for persisting. [`Error`] wraps all of them
//! for callers that only want to propagate with `?`.

use crate::keystore::entry::EntryKind;
use thiserror::Error;

/// Failures of the object storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object exists at the requested path.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The path is not a valid object path.
    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    /// Any other I/O failure of the backend.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the password-based encryption primitives.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key derivation parameters were rejected or derivation failed.
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Authentication tag did not verify: wrong password or tampered data.
    #[error("Invalid password")]
    InvalidPassword,

    /// The sealed blob is structurally invalid.
    #[error("Malformed sealed data: {0}")]
    Malformed(String),
}

/// Failures reported by a container codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The container password does not verify.
    #[error("Container password does not verify")]
    BadPassword,

    /// The bytes are not a valid container of this type.
    #[error("Corrupt container: {0}")]
    Corrupt(String),

    /// The entries could not be serialized.
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Failures of [`KeystoreManager::open`](crate::keystore::manager::KeystoreManager::open).
#[derive(Error, Debug)]
pub enum OpenError {
    /// No codec is registered for the container type.
    #[error("Unsupported container type: {0}")]
    UnsupportedType(String),

    /// The container password is wrong or the container failed its integrity check.
    #[error("Container password does not verify")]
    BadPassword,

    /// No container exists at the path.
    #[error("Keystore not found: {0}")]
    NotFound(String),

    /// The bytes are not a valid container for the declared type.
    #[error("Corrupt keystore: {0}")]
    Corrupt(String),

    /// The storage backend failed for another reason.
    #[error("Storage error: {0}")]
    Io(#[source] StorageError),
}

impl From<StorageError> for OpenError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => OpenError::NotFound(path),
            other => OpenError::Io(other),
        }
    }
}

impl From<CodecError> for OpenError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::BadPassword => OpenError::BadPassword,
            CodecError::Corrupt(msg) | CodecError::Encode(msg) => OpenError::Corrupt(msg),
        }
    }
}

/// Failures of entry reads and in-memory writes.
#[derive(Error, Debug)]
pub enum KeyError {
    /// No keystore has been opened on this manager.
    #[error("Keystore is not open")]
    NotOpen,

    /// The alias is empty or blank.
    #[error("Invalid alias: {0:?}")]
    InvalidAlias(String),

    /// The alias does not exist.
    #[error("No such alias: {0}")]
    NoSuchAlias(String),

    /// The alias holds a different kind of entry.
    #[error("Alias '{alias}' holds a {found} entry, expected {expected}")]
    WrongType {
        alias: String,
        expected: EntryKind,
        found: EntryKind,
    },

    /// The entry password does not decrypt the entry.
    #[error("Entry password does not verify")]
    BadPassword,

    /// The algorithm is not supported by this build.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Decrypted bytes could not be decoded as text.
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Key material passed in is not usable.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A sealed entry is structurally damaged.
    #[error("Corrupt entry: {0}")]
    CorruptEntry(String),
}

impl From<CryptoError> for KeyError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPassword => KeyError::BadPassword,
            CryptoError::KeyDerivation(msg) | CryptoError::Encryption(msg) => {
                KeyError::UnsupportedAlgorithm(msg)
            }
            CryptoError::Malformed(msg) => KeyError::CorruptEntry(msg),
        }
    }
}

/// Failures of [`KeystoreManager::store`](crate::keystore::manager::KeystoreManager::store).
#[derive(Error, Debug)]
pub enum StoreError {
    /// No keystore has been opened on this manager.
    #[error("Keystore is not open")]
    NotOpen,

    /// The in-memory keystore could not be encoded.
    #[error("Encoding failed: {0}")]
    EncodeFailure(String),

    /// The storage backend failed while writing.
    #[error("Storage error: {0}")]
    Io(#[from] StorageError),
}

/// Top-level error for callers that do not need to distinguish layers.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Certificate parsing failed
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    Pem(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O error (CLI input files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for keystore operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KeyError::NoSuchAlias("db".to_string());
        assert_eq!(err.to_string(), "No such alias: db");

        let err = KeyError::WrongType {
            alias: "root".to_string(),
            expected: EntryKind::Secret,
            found: EntryKind::Certificate,
        };
        assert_eq!(
            err.to_string(),
            "Alias 'root' holds a certificate entry, expected secret"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
        assert_send_sync::<OpenError>();
        assert_send_sync::<KeyError>();
        assert_send_sync::<StoreError>();
    }

    #[test]
    fn test_storage_not_found_maps_to_open_not_found() {
        let err = OpenError::from(StorageError::NotFound("a/b".to_string()));
        assert!(matches!(err, OpenError::NotFound(path) if path == "a/b"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = OpenError::from(StorageError::Io(io));
        assert!(matches!(err, OpenError::Io(StorageError::Io(_))));
    }

    #[test]
    fn test_crypto_errors_map_to_key_errors() {
        assert!(matches!(
            KeyError::from(CryptoError::InvalidPassword),
            KeyError::BadPassword
        ));
        assert!(matches!(
            KeyError::from(CryptoError::KeyDerivation("bad params".to_string())),
            KeyError::UnsupportedAlgorithm(_)
        ));
        assert!(matches!(
            KeyError::from(CryptoError::Malformed("short".to_string())),
            KeyError::CorruptEntry(_)
        ));
    }

    #[test]
    fn test_codec_errors_map_to_open_errors() {
        assert!(matches!(
            OpenError::from(CodecError::BadPassword),
            OpenError::BadPassword
        ));
        assert!(matches!(
            OpenError::from(CodecError::Corrupt("magic".to_string())),
            OpenError::Corrupt(_)
        ));
    }
}
