//! The in-memory keystore.
//!
//! A [`KeystoreHandle`] is a plain owned value: every mutation takes
//! `&mut self`, so a handle has exactly one writer at a time. Nothing here
//! touches storage; persistence lives in the manager.

use crate::cert::{Certificate, X509Certificate};
use crate::crypto::encryption::{seal, unseal};
use crate::crypto::password::KdfParams;
use crate::error::KeyError;
use crate::keystore::entry::{
    Entry, EntryKind, KeyAlgorithm, KeyMaterial, PrivateKeyEntry, SecretEntry, TextEncoding,
};
use std::collections::{BTreeMap, HashSet};
use zeroize::Zeroizing;

/// Reject empty or blank aliases.
pub fn validate_alias(alias: &str) -> Result<(), KeyError> {
    if alias.trim().is_empty() {
        return Err(KeyError::InvalidAlias(alias.to_string()));
    }
    Ok(())
}

/// A loaded keystore: its container type and alias → entry mapping.
#[derive(Debug, Clone)]
pub struct KeystoreHandle {
    container_type: String,
    entries: BTreeMap<String, Entry>,
    kdf: KdfParams,
}

impl KeystoreHandle {
    /// An empty keystore of the given container type.
    ///
    /// `kdf` is used when sealing new entries.
    pub fn new(container_type: impl Into<String>, kdf: KdfParams) -> Self {
        Self::from_entries(container_type, BTreeMap::new(), kdf)
    }

    pub fn from_entries(
        container_type: impl Into<String>,
        entries: BTreeMap<String, Entry>,
        kdf: KdfParams,
    ) -> Self {
        Self {
            container_type: container_type.into(),
            entries,
            kdf,
        }
    }

    pub fn container_type(&self) -> &str {
        &self.container_type
    }

    pub fn entries(&self) -> &BTreeMap<String, Entry> {
        &self.entries
    }

    pub fn entry(&self, alias: &str) -> Option<&Entry> {
        self.entries.get(alias)
    }

    /// Aliases in sorted order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    pub fn entry_kind(&self, alias: &str) -> Option<EntryKind> {
        self.entries.get(alias).map(Entry::kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, alias: &str) -> Result<&Entry, KeyError> {
        self.entries
            .get(alias)
            .ok_or_else(|| KeyError::NoSuchAlias(alias.to_string()))
    }

    fn wrong_type(alias: &str, expected: EntryKind, found: &Entry) -> KeyError {
        KeyError::WrongType {
            alias: alias.to_string(),
            expected,
            found: found.kind(),
        }
    }

    /// Decrypt the private key stored at `alias`.
    pub fn get_private_key(&self, alias: &str, entry_password: &str) -> Result<KeyMaterial, KeyError> {
        let key = match self.lookup(alias)? {
            Entry::PrivateKey(key) => key,
            other => return Err(Self::wrong_type(alias, EntryKind::PrivateKey, other)),
        };

        let plaintext = unseal(&key.sealed_key, entry_password)?;
        let algorithm = key
            .algorithm()
            .ok_or_else(|| KeyError::UnsupportedAlgorithm(key.algorithm_oid.to_string()))?;

        Ok(KeyMaterial::new(plaintext.to_vec(), algorithm))
    }

    /// The certificate of a certificate entry, or the leaf certificate of a
    /// private key entry.
    pub fn get_certificate(&self, alias: &str) -> Result<Certificate, KeyError> {
        let entry = self.lookup(alias)?;
        entry
            .certificate()
            .cloned()
            .ok_or_else(|| Self::wrong_type(alias, EntryKind::Certificate, entry))
    }

    /// The full chain of a private key entry, leaf first.
    pub fn get_certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>, KeyError> {
        match self.lookup(alias)? {
            Entry::PrivateKey(key) => Ok(key.chain.clone()),
            other => Err(Self::wrong_type(alias, EntryKind::PrivateKey, other)),
        }
    }

    /// Decrypt and decode the secret stored at `alias`.
    pub fn get_password(
        &self,
        alias: &str,
        entry_password: &str,
    ) -> Result<Zeroizing<String>, KeyError> {
        let secret = match self.lookup(alias)? {
            Entry::Secret(secret) => secret,
            other => return Err(Self::wrong_type(alias, EntryKind::Secret, other)),
        };

        let plaintext = unseal(&secret.sealed_payload, entry_password)?;
        Ok(Zeroizing::new(secret.encoding.decode(&plaintext)?))
    }

    /// Seal `password` under `entry_password` and store it at `alias`,
    /// replacing any existing entry.
    pub fn set_password(
        &mut self,
        alias: &str,
        password: &str,
        entry_password: &str,
    ) -> Result<(), KeyError> {
        validate_alias(alias)?;

        let encoding = TextEncoding::Utf8;
        let plaintext = Zeroizing::new(encoding.encode(password));
        let sealed_payload = seal(&plaintext, entry_password, &self.kdf)?;

        self.entries.insert(
            alias.to_string(),
            Entry::Secret(SecretEntry {
                sealed_payload,
                encoding,
            }),
        );
        Ok(())
    }

    /// Store a trusted certificate at `alias`, replacing any existing entry.
    pub fn set_certificate_entry(
        &mut self,
        alias: &str,
        certificate: Certificate,
    ) -> Result<(), KeyError> {
        validate_alias(alias)?;
        self.entries
            .insert(alias.to_string(), Entry::Certificate(certificate));
        Ok(())
    }

    /// Seal a PKCS#8 private key under `entry_password` and store it with
    /// its certificate chain (leaf first) at `alias`.
    pub fn set_private_key_entry(
        &mut self,
        alias: &str,
        pkcs8_der: &[u8],
        chain: Vec<Certificate>,
        entry_password: &str,
    ) -> Result<(), KeyError> {
        validate_alias(alias)?;
        if chain.is_empty() {
            return Err(KeyError::InvalidKey(
                "a private key entry needs at least one certificate".to_string(),
            ));
        }

        let algorithm = KeyAlgorithm::of_pkcs8(pkcs8_der)?;
        let sealed_key = seal(pkcs8_der, entry_password, &self.kdf)?;

        self.entries.insert(
            alias.to_string(),
            Entry::PrivateKey(PrivateKeyEntry {
                sealed_key,
                algorithm_oid: algorithm.oid(),
                chain,
            }),
        );
        Ok(())
    }

    /// Remove the entry at `alias`, returning it.
    pub fn delete_entry(&mut self, alias: &str) -> Result<Entry, KeyError> {
        self.entries
            .remove(alias)
            .ok_or_else(|| KeyError::NoSuchAlias(alias.to_string()))
    }

    /// Every distinct X.509 certificate any alias resolves to.
    pub fn x509_certificates(&self) -> HashSet<X509Certificate> {
        self.entries
            .values()
            .filter_map(Entry::certificate)
            .filter_map(Certificate::as_x509)
            .cloned()
            .collect()
    }
}
