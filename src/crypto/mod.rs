//! Cryptographic primitives for the keystore.
//!
//! - Password-based key derivation using Argon2id
//! - Sealing arbitrary payloads with AES-256-GCM under a derived key
//!
//! Both the container as a whole and each protected entry are sealed with
//! the same primitive, each under its own password.
//!
//! # Example
//!
//! ```rust
//! use remote_keystore::crypto::encryption::{seal, unseal};
//! use remote_keystore::crypto::password::KdfParams;
//!
//! let sealed = seal(b"db-password", "entry-password", &KdfParams::default()).unwrap();
//! let opened = unseal(&sealed, "entry-password").unwrap();
//! assert_eq!(opened.as_slice(), b"db-password");
//! ```

pub mod encryption;
pub mod password;
