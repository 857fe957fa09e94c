//! Container codecs.
//!
//! A codec turns the alias → entry map into the bytes of one container type
//! and back. The container type string passed to `open` selects the codec.
//!
//! Two codecs are registered by default:
//! - [`Pkcs12Codec`] (`PKCS12`): standard PKCS#12/PFX files
//! - [`RksCodec`] (`RKS`): a sealed JSON document

pub mod pkcs12;
pub mod rks;

pub use pkcs12::{Pkcs12Codec, PKCS12_CONTAINER_TYPE};
pub use rks::{RksCodec, RKS_CONTAINER_TYPE};

use crate::crypto::password::KdfParams;
use crate::error::CodecError;
use crate::keystore::entry::Entry;
use std::collections::BTreeMap;
use std::fmt;

/// Encoding and decoding of one container type.
pub trait ContainerCodec: Send + Sync + fmt::Debug {
    /// The container type identifier this codec handles.
    fn container_type(&self) -> &str;

    /// Decode and verify a container.
    fn decode(&self, bytes: &[u8], password: &str) -> Result<BTreeMap<String, Entry>, CodecError>;

    /// Encode entries into a container protected by `password`.
    fn encode(&self, entries: &BTreeMap<String, Entry>, password: &str)
        -> Result<Vec<u8>, CodecError>;
}

/// Codecs known to a manager, looked up by case-insensitive type name.
#[derive(Debug, Default)]
pub struct CodecRegistry {
    codecs: Vec<Box<dyn ContainerCodec>>,
}

impl CodecRegistry {
    /// A registry without any codec.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the `PKCS12` and `RKS` codecs.
    ///
    /// `kdf` applies to material the codecs seal themselves.
    pub fn with_defaults(kdf: KdfParams) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Pkcs12Codec::new(kdf)));
        registry.register(Box::new(RksCodec::new(kdf)));
        registry
    }

    /// Add a codec, replacing any codec for the same type.
    pub fn register(&mut self, codec: Box<dyn ContainerCodec>) {
        let name = codec.container_type().to_string();
        self.codecs
            .retain(|existing| !existing.container_type().eq_ignore_ascii_case(&name));
        self.codecs.push(codec);
    }

    pub fn get(&self, container_type: &str) -> Option<&dyn ContainerCodec> {
        self.codecs
            .iter()
            .find(|codec| codec.container_type().eq_ignore_ascii_case(container_type))
            .map(|codec| &**codec)
    }

    /// Registered type names, in registration order.
    pub fn container_types(&self) -> Vec<&str> {
        self.codecs.iter().map(|codec| codec.container_type()).collect()
    }
}
