//! Keystore model and lifecycle.
//!
//! - [`entry`]: the entry kinds and their protected representation
//! - [`handle`]: an in-memory keystore
//! - [`codec`]: container formats
//! - [`manager`]: open, edit and store keystores on an object store

pub mod codec;
pub mod entry;
pub mod handle;
pub mod manager;

pub use codec::{
    CodecRegistry, ContainerCodec, Pkcs12Codec, RksCodec, PKCS12_CONTAINER_TYPE, RKS_CONTAINER_TYPE,
};
pub use entry::{Entry, EntryKind, KeyAlgorithm, KeyMaterial};
pub use handle::KeystoreHandle;
pub use manager::KeystoreManager;
