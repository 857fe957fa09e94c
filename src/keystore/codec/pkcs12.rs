//! The `PKCS12` container.
//!
//! Files are standard PKCS#12/PFX, read and written by `p12-keystore`; the
//! container password drives the MAC and bag encryption. Entries map as:
//!
//! - trusted certificates ↔ certificate bags
//! - private keys ↔ private key chains. The entry password of a private
//!   key must be the container password, as `keytool` requires for
//!   PKCS#12. Keys read from a file are sealed in memory under the
//!   container password.
//! - secrets ↔ secret bags. A secret protected by the container password is
//!   written as its plain value. One protected by its own entry password is
//!   written as [`SEALED_SECRET_MARKER`] followed by its sealed bytes. Plain
//!   values read from a file are sealed under the container password.

use super::ContainerCodec;
use crate::cert::{Certificate, X509_KIND};
use crate::crypto::encryption::{seal, unseal};
use crate::crypto::password::KdfParams;
use crate::error::{CodecError, CryptoError};
use crate::keystore::entry::{Entry, PrivateKeyEntry, SecretEntry, TextEncoding};
use crate::keystore::handle::validate_alias;
use der::asn1::AnyRef;
use der::{Decode, SliceReader, Tag, Tagged};
use p12_keystore::secret::{Secret, SecretKeyType};
use p12_keystore::{Certificate as P12Certificate, KeyStore, KeyStoreEntry, PrivateKeyChain};
use pkcs8::PrivateKeyInfo;
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::Zeroizing;

/// Container type identifier of the PKCS#12 codec.
pub const PKCS12_CONTAINER_TYPE: &str = "PKCS12";

/// Prefix of a secret bag value sealed under its own entry password.
pub const SEALED_SECRET_MARKER: &[u8] = b"RKS-SEALED-1:";

/// PFX syntax version (RFC 7292).
const PFX_VERSION: u8 = 3;

/// PKCS#12 containers.
#[derive(Debug, Clone)]
pub struct Pkcs12Codec {
    kdf: KdfParams,
}

impl Pkcs12Codec {
    /// `kdf` seals keys and secrets read from files.
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }

    fn seal_imported(
        &self,
        alias: &str,
        plaintext: &[u8],
        password: &str,
    ) -> Result<Vec<u8>, CodecError> {
        seal(plaintext, password, &self.kdf).map_err(|e| {
            CodecError::Corrupt(format!("entry '{}' could not be sealed: {}", alias, e))
        })
    }

    fn import_key_chain(
        &self,
        alias: &str,
        key_chain: &PrivateKeyChain,
        password: &str,
    ) -> Result<Entry, CodecError> {
        let info = PrivateKeyInfo::from_der(key_chain.key()).map_err(|e| {
            CodecError::Corrupt(format!("entry '{}' holds an invalid PKCS#8 key: {}", alias, e))
        })?;
        let algorithm_oid = info.algorithm.oid;

        let chain = key_chain
            .chain()
            .iter()
            .map(|cert| import_certificate(alias, cert))
            .collect::<Result<Vec<_>, _>>()?;
        if chain.is_empty() {
            return Err(CodecError::Corrupt(format!(
                "private key entry '{}' has no certificate chain",
                alias
            )));
        }

        Ok(Entry::PrivateKey(PrivateKeyEntry {
            sealed_key: self.seal_imported(alias, key_chain.key(), password)?,
            algorithm_oid,
            chain,
        }))
    }

    fn import_secret(
        &self,
        alias: &str,
        value: &[u8],
        password: &str,
    ) -> Result<Entry, CodecError> {
        let sealed_payload = match value.strip_prefix(SEALED_SECRET_MARKER) {
            Some(sealed) => sealed.to_vec(),
            None => self.seal_imported(alias, value, password)?,
        };

        Ok(Entry::Secret(SecretEntry {
            sealed_payload,
            encoding: TextEncoding::Utf8,
        }))
    }
}

/// Whether `bytes` is a DER PFX: a SEQUENCE starting with version 3.
fn is_pfx(bytes: &[u8]) -> bool {
    let Ok(pfx) = AnyRef::from_der(bytes) else {
        return false;
    };
    if pfx.tag() != Tag::Sequence {
        return false;
    }
    let Ok(mut reader) = SliceReader::new(pfx.value()) else {
        return false;
    };
    matches!(u8::decode(&mut reader), Ok(PFX_VERSION))
}

fn import_certificate(alias: &str, cert: &P12Certificate) -> Result<Certificate, CodecError> {
    Certificate::from_encoded(X509_KIND, cert.as_der()).map_err(|e| {
        CodecError::Corrupt(format!("entry '{}' holds an invalid certificate: {}", alias, e))
    })
}

fn export_certificate(alias: &str, cert: &Certificate) -> Result<P12Certificate, CodecError> {
    let x509 = cert.as_x509().ok_or_else(|| {
        CodecError::Encode(format!(
            "entry '{}' holds a {} certificate; PKCS#12 only stores X.509",
            alias,
            cert.kind()
        ))
    })?;
    P12Certificate::from_der(x509.as_der())
        .map_err(|e| CodecError::Encode(format!("entry '{}': {}", alias, e)))
}

fn export_key_chain(
    alias: &str,
    key: &PrivateKeyEntry,
    password: &str,
) -> Result<PrivateKeyChain, CodecError> {
    let key_der = unseal(&key.sealed_key, password).map_err(|e| match e {
        CryptoError::InvalidPassword => CodecError::Encode(format!(
            "private key '{}' must use the container password as its entry password",
            alias
        )),
        other => CodecError::Encode(format!("private key '{}': {}", alias, other)),
    })?;
    let chain = key
        .chain
        .iter()
        .map(|cert| export_certificate(alias, cert))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PrivateKeyChain::new(key_der.as_slice(), alias.as_bytes(), chain))
}

fn export_secret(alias: &str, secret: &SecretEntry, password: &str) -> Result<Secret, CodecError> {
    let value = match unseal(&secret.sealed_payload, password) {
        Ok(plaintext) => plaintext,
        Err(CryptoError::InvalidPassword) => {
            let mut marked = SEALED_SECRET_MARKER.to_vec();
            marked.extend_from_slice(&secret.sealed_payload);
            Zeroizing::new(marked)
        }
        Err(other) => {
            return Err(CodecError::Encode(format!("secret '{}': {}", alias, other)));
        }
    };

    Secret::builder(SecretKeyType::HmacSha256)
        .with_key(value.to_vec())
        .build()
        .map_err(|e| CodecError::Encode(format!("secret '{}': {:?}", alias, e)))
}

impl ContainerCodec for Pkcs12Codec {
    fn container_type(&self) -> &str {
        PKCS12_CONTAINER_TYPE
    }

    fn decode(&self, bytes: &[u8], password: &str) -> Result<BTreeMap<String, Entry>, CodecError> {
        if !is_pfx(bytes) {
            return Err(CodecError::Corrupt("not a PKCS#12 PFX structure".to_string()));
        }

        let keystore = KeyStore::from_pkcs12(bytes, password).map_err(|e| {
            debug!(error = %e, "PKCS#12 container rejected");
            CodecError::BadPassword
        })?;

        let mut entries = BTreeMap::new();
        for (alias, entry) in keystore.entries() {
            let alias = alias.to_string();
            validate_alias(&alias).map_err(|e| CodecError::Corrupt(e.to_string()))?;

            #[allow(unreachable_patterns)]
            let entry = match entry {
                KeyStoreEntry::Certificate(cert) => {
                    Entry::Certificate(import_certificate(&alias, cert)?)
                }
                KeyStoreEntry::PrivateKeyChain(key_chain) => {
                    self.import_key_chain(&alias, key_chain, password)?
                }
                KeyStoreEntry::Secret(secret) => {
                    self.import_secret(&alias, secret.get_key(), password)?
                }
                _ => {
                    return Err(CodecError::Corrupt(format!(
                        "entry '{}' has an unsupported bag type",
                        alias
                    )))
                }
            };
            entries.insert(alias, entry);
        }

        Ok(entries)
    }

    fn encode(
        &self,
        entries: &BTreeMap<String, Entry>,
        password: &str,
    ) -> Result<Vec<u8>, CodecError> {
        let mut keystore = KeyStore::new();
        for (alias, entry) in entries {
            let bag = match entry {
                Entry::Certificate(cert) => {
                    KeyStoreEntry::Certificate(export_certificate(alias, cert)?)
                }
                Entry::PrivateKey(key) => {
                    KeyStoreEntry::PrivateKeyChain(export_key_chain(alias, key, password)?)
                }
                Entry::Secret(secret) => {
                    KeyStoreEntry::Secret(export_secret(alias, secret, password)?)
                }
            };
            keystore.add_entry(alias, bag);
        }

        keystore
            .writer(password)
            .write()
            .map_err(|e| CodecError::Encode(e.to_string()))
    }
}
