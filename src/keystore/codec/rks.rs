//! The `RKS` container.
//!
//! Laid out as:
//! `RKS1` magic ‖ sealed JSON document
//! where the sealing is [`crate::crypto::encryption::seal`] under the
//! container password. Entries inside the document keep their own sealing.

use super::ContainerCodec;
use crate::cert::Certificate;
use crate::crypto::encryption::{seal, unseal};
use crate::crypto::password::KdfParams;
use crate::error::{CodecError, CryptoError};
use crate::keystore::entry::{Entry, PrivateKeyEntry, SecretEntry, TextEncoding};
use crate::keystore::handle::validate_alias;
use der::asn1::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Container type identifier of the sealed JSON codec.
pub const RKS_CONTAINER_TYPE: &str = "RKS";

const RKS_MAGIC: &[u8; 4] = b"RKS1";
const RKS_DOCUMENT_VERSION: u32 = 1;

/// The sealed JSON container.
#[derive(Debug, Clone)]
pub struct RksCodec {
    kdf: KdfParams,
}

impl RksCodec {
    pub fn new(kdf: KdfParams) -> Self {
        Self { kdf }
    }
}

#[derive(Serialize, Deserialize)]
struct ContainerDocument {
    version: u32,
    entries: BTreeMap<String, StoredEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredEntry {
    PrivateKey {
        algorithm: String,
        #[serde(with = "hex")]
        sealed_key: Vec<u8>,
        chain: Vec<StoredCertificate>,
    },
    Certificate {
        certificate: StoredCertificate,
    },
    Secret {
        encoding: TextEncoding,
        #[serde(with = "hex")]
        sealed_payload: Vec<u8>,
    },
}

#[derive(Serialize, Deserialize)]
struct StoredCertificate {
    kind: String,
    #[serde(with = "hex")]
    encoded: Vec<u8>,
}

impl From<&Certificate> for StoredCertificate {
    fn from(cert: &Certificate) -> Self {
        Self {
            kind: cert.kind().to_string(),
            encoded: cert.encoded().to_vec(),
        }
    }
}

impl StoredCertificate {
    fn into_certificate(self, alias: &str) -> Result<Certificate, CodecError> {
        Certificate::from_encoded(&self.kind, &self.encoded).map_err(|e| {
            CodecError::Corrupt(format!("entry '{}' holds an invalid certificate: {}", alias, e))
        })
    }
}

impl From<&Entry> for StoredEntry {
    fn from(entry: &Entry) -> Self {
        match entry {
            Entry::PrivateKey(key) => StoredEntry::PrivateKey {
                algorithm: key.algorithm_oid.to_string(),
                sealed_key: key.sealed_key.clone(),
                chain: key.chain.iter().map(StoredCertificate::from).collect(),
            },
            Entry::Certificate(cert) => StoredEntry::Certificate {
                certificate: cert.into(),
            },
            Entry::Secret(secret) => StoredEntry::Secret {
                encoding: secret.encoding,
                sealed_payload: secret.sealed_payload.clone(),
            },
        }
    }
}

impl StoredEntry {
    fn into_entry(self, alias: &str) -> Result<Entry, CodecError> {
        Ok(match self {
            StoredEntry::PrivateKey {
                algorithm,
                sealed_key,
                chain,
            } => {
                let algorithm_oid = ObjectIdentifier::new(&algorithm).map_err(|e| {
                    CodecError::Corrupt(format!("entry '{}' has a bad algorithm OID: {}", alias, e))
                })?;
                let chain = chain
                    .into_iter()
                    .map(|cert| cert.into_certificate(alias))
                    .collect::<Result<Vec<_>, _>>()?;
                if chain.is_empty() {
                    return Err(CodecError::Corrupt(format!(
                        "private key entry '{}' has no certificate chain",
                        alias
                    )));
                }
                Entry::PrivateKey(PrivateKeyEntry {
                    sealed_key,
                    algorithm_oid,
                    chain,
                })
            }
            StoredEntry::Certificate { certificate } => {
                Entry::Certificate(certificate.into_certificate(alias)?)
            }
            StoredEntry::Secret {
                encoding,
                sealed_payload,
            } => Entry::Secret(SecretEntry {
                sealed_payload,
                encoding,
            }),
        })
    }
}

impl ContainerCodec for RksCodec {
    fn container_type(&self) -> &str {
        RKS_CONTAINER_TYPE
    }

    fn decode(&self, bytes: &[u8], password: &str) -> Result<BTreeMap<String, Entry>, CodecError> {
        let sealed = bytes
            .strip_prefix(RKS_MAGIC.as_slice())
            .ok_or_else(|| CodecError::Corrupt("missing RKS1 header".to_string()))?;

        let plaintext = unseal(sealed, password).map_err(|e| match e {
            CryptoError::InvalidPassword => CodecError::BadPassword,
            other => CodecError::Corrupt(other.to_string()),
        })?;

        let document: ContainerDocument = serde_json::from_slice(&plaintext)
            .map_err(|e| CodecError::Corrupt(format!("invalid container document: {}", e)))?;
        if document.version != RKS_DOCUMENT_VERSION {
            return Err(CodecError::Corrupt(format!(
                "unsupported document version {}",
                document.version
            )));
        }

        document
            .entries
            .into_iter()
            .map(|(alias, stored)| {
                validate_alias(&alias)
                    .map_err(|e| CodecError::Corrupt(e.to_string()))?;
                let entry = stored.into_entry(&alias)?;
                Ok::<_, CodecError>((alias, entry))
            })
            .collect()
    }

    fn encode(
        &self,
        entries: &BTreeMap<String, Entry>,
        password: &str,
    ) -> Result<Vec<u8>, CodecError> {
        let document = ContainerDocument {
            version: RKS_DOCUMENT_VERSION,
            entries: entries
                .iter()
                .map(|(alias, entry)| (alias.clone(), StoredEntry::from(entry)))
                .collect(),
        };

        let plaintext = Zeroizing::new(
            serde_json::to_vec(&document).map_err(|e| CodecError::Encode(e.to_string()))?,
        );
        let sealed =
            seal(&plaintext, password, &self.kdf).map_err(|e| CodecError::Encode(e.to_string()))?;

        let mut output = Vec::with_capacity(RKS_MAGIC.len() + sealed.len());
        output.extend_from_slice(RKS_MAGIC);
        output.extend_from_slice(&sealed);
        Ok(output)
    }
}
