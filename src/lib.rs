//! Remote keystore: password-protected keystores on pluggable object storage.
//!
//! A keystore is a container of aliased entries: private keys with their
//! certificate chains, trusted certificates, and secret passwords. The
//! whole container is protected by a container password and every private
//! key and secret additionally by an entry password.
//!
//! Containers default to PKCS#12 (`PKCS12`). The `RKS` container is also
//! built in and lets private keys carry their own entry password.
//!
//! The crate is organised in layers:
//!
//! - [`storage`] moves container bytes to and from an object store
//! - [`keystore`] decodes containers and manages their entries
//! - [`crypto`] derives keys from passwords and seals data
//! - [`cert`] parses and imports certificates
//!
//! Every fallible operation returns a `Result` with a typed error; see
//! [`error`].
//!
//! # Example
//!
//! ```rust,no_run
//! use remote_keystore::keystore::KeystoreManager;
//! use remote_keystore::storage::{LocalStore, ObjectPath};
//! use remote_keystore::Result;
//! use std::sync::Arc;
//!
//! fn example() -> Result<()> {
//!     let store = Arc::new(LocalStore::new("/var/lib/keystores"));
//!     let mut manager = KeystoreManager::new(store);
//!
//!     manager.open(Some(&ObjectPath::new("prod/app.p12")?), "PKCS12", "store-pw")?;
//!     for cert in manager.get_all_x509_certificates()? {
//!         println!("{}", cert.subject());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cert;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod storage;

// Re-export commonly used types
pub use config::KeystoreConfig;
pub use error::{Error, KeyError, OpenError, Result, StoreError};
pub use keystore::KeystoreManager;
