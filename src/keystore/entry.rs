//! Keystore entries.
//!
//! Entries are held in their protected form: private keys and secrets stay
//! sealed in memory and are only opened for the duration of a read.

use crate::cert::Certificate;
use crate::error::KeyError;
use der::asn1::ObjectIdentifier;
use der::Decode;
use pkcs8::PrivateKeyInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The three kinds of entry a keystore can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    PrivateKey,
    Certificate,
    Secret,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::PrivateKey => "private key",
            EntryKind::Certificate => "certificate",
            EntryKind::Secret => "secret",
        })
    }
}

/// Private key algorithms this crate recognises in PKCS#8 material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ed25519,
    Ed448,
    X25519,
    X448,
    Ec,
    Rsa,
    RsaPss,
}

const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const OID_ED448: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.113");
const OID_X25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.110");
const OID_X448: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.111");
const OID_EC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_RSA_PSS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");

impl KeyAlgorithm {
    /// Map an algorithm OID to a supported algorithm.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            (OID_ED25519, KeyAlgorithm::Ed25519),
            (OID_ED448, KeyAlgorithm::Ed448),
            (OID_X25519, KeyAlgorithm::X25519),
            (OID_X448, KeyAlgorithm::X448),
            (OID_EC, KeyAlgorithm::Ec),
            (OID_RSA, KeyAlgorithm::Rsa),
            (OID_RSA_PSS, KeyAlgorithm::RsaPss),
        ]
        .into_iter()
        .find_map(|(known, alg)| (known == *oid).then_some(alg))
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            KeyAlgorithm::Ed25519 => OID_ED25519,
            KeyAlgorithm::Ed448 => OID_ED448,
            KeyAlgorithm::X25519 => OID_X25519,
            KeyAlgorithm::X448 => OID_X448,
            KeyAlgorithm::Ec => OID_EC,
            KeyAlgorithm::Rsa => OID_RSA,
            KeyAlgorithm::RsaPss => OID_RSA_PSS,
        }
    }

    /// Identify the algorithm of PKCS#8 DER key material.
    ///
    /// Fails with [`KeyError::InvalidKey`] if the bytes are not PKCS#8 and
    /// with [`KeyError::UnsupportedAlgorithm`] for unknown algorithms.
    pub fn of_pkcs8(der: &[u8]) -> Result<Self, KeyError> {
        let info = PrivateKeyInfo::from_der(der)
            .map_err(|e| KeyError::InvalidKey(format!("not a PKCS#8 private key: {}", e)))?;
        let oid = info.algorithm.oid;
        Self::from_oid(&oid).ok_or_else(|| KeyError::UnsupportedAlgorithm(oid.to_string()))
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyAlgorithm::Ed25519 => "Ed25519",
            KeyAlgorithm::Ed448 => "Ed448",
            KeyAlgorithm::X25519 => "X25519",
            KeyAlgorithm::X448 => "X448",
            KeyAlgorithm::Ec => "EC",
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::RsaPss => "RSASSA-PSS",
        })
    }
}

/// Decrypted private key material, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    pkcs8_der: Vec<u8>,
    #[zeroize(skip)]
    algorithm: KeyAlgorithm,
}

impl KeyMaterial {
    pub(crate) fn new(pkcs8_der: Vec<u8>, algorithm: KeyAlgorithm) -> Self {
        Self {
            pkcs8_der,
            algorithm,
        }
    }

    /// The key as PKCS#8 DER.
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("pkcs8_der", &"<redacted>")
            .finish()
    }
}

/// Text encoding recorded with every secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
}

impl TextEncoding {
    /// Decode bytes in this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, KeyError> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| KeyError::DecodeFailure(format!("secret is not valid UTF-8: {}", e))),
        }
    }

    /// Encode text in this encoding.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

/// A private key sealed under its entry password, with its certificate chain.
///
/// The algorithm is kept as an OID so that containers written elsewhere load
/// even when they hold keys this build cannot use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKeyEntry {
    pub(crate) sealed_key: Vec<u8>,
    pub(crate) algorithm_oid: ObjectIdentifier,
    /// Leaf first.
    pub(crate) chain: Vec<Certificate>,
}

impl PrivateKeyEntry {
    pub fn algorithm_oid(&self) -> ObjectIdentifier {
        self.algorithm_oid
    }

    /// The algorithm, if supported.
    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        KeyAlgorithm::from_oid(&self.algorithm_oid)
    }

    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    /// The certificate matching the key.
    pub fn leaf(&self) -> Option<&Certificate> {
        self.chain.first()
    }
}

/// A secret sealed under its entry password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub(crate) sealed_payload: Vec<u8>,
    pub(crate) encoding: TextEncoding,
}

impl SecretEntry {
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

/// One keystore entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    PrivateKey(PrivateKeyEntry),
    Certificate(Certificate),
    Secret(SecretEntry),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::PrivateKey(_) => EntryKind::PrivateKey,
            Entry::Certificate(_) => EntryKind::Certificate,
            Entry::Secret(_) => EntryKind::Secret,
        }
    }

    /// The certificate this entry resolves to: the certificate itself, or
    /// the leaf of a private key's chain.
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Entry::PrivateKey(key) => key.leaf(),
            Entry::Certificate(cert) => Some(cert),
            Entry::Secret(_) => None,
        }
    }
}
