//! Certificate values held by keystore entries.

use crate::error::{Error, Result};
use der::Decode;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Certificate type name for X.509 certificates.
pub const X509_KIND: &str = "X.509";

/// A parsed X.509 certificate.
///
/// Equality and hashing use the DER encoding, so two aliases holding the
/// same certificate compare equal.
#[derive(Clone)]
pub struct X509Certificate {
    der: Vec<u8>,
    parsed: x509_cert::Certificate,
}

impl X509Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parsed = x509_cert::Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("Invalid X.509 DER: {}", e)))?;

        Ok(Self {
            der: der.to_vec(),
            parsed,
        })
    }

    /// The DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name, RFC 4514 style.
    pub fn subject(&self) -> String {
        self.parsed.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name, RFC 4514 style.
    pub fn issuer(&self) -> String {
        self.parsed.tbs_certificate.issuer.to_string()
    }

    /// Serial number as lowercase hex.
    pub fn serial_hex(&self) -> String {
        hex::encode(self.parsed.tbs_certificate.serial_number.as_bytes())
    }

    /// The parsed structure, for callers that need more than the accessors.
    pub fn parsed(&self) -> &x509_cert::Certificate {
        &self.parsed
    }
}

impl PartialEq for X509Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for X509Certificate {}

impl Hash for X509Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Debug for X509Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509Certificate")
            .field("subject", &self.subject())
            .field("serial", &self.serial_hex())
            .finish()
    }
}

/// A certificate stored in the keystore.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Certificate {
    /// An X.509 certificate.
    X509(X509Certificate),
    /// A certificate of another type, kept as opaque bytes.
    Other { kind: String, encoded: Vec<u8> },
}

impl Certificate {
    /// Build a certificate from its type name and encoding.
    ///
    /// X.509 encodings are parsed and must be valid DER.
    pub fn from_encoded(kind: &str, encoded: &[u8]) -> Result<Self> {
        if kind.eq_ignore_ascii_case(X509_KIND) {
            X509Certificate::from_der(encoded).map(Certificate::X509)
        } else {
            Ok(Certificate::Other {
                kind: kind.to_string(),
                encoded: encoded.to_vec(),
            })
        }
    }

    /// The certificate type name.
    pub fn kind(&self) -> &str {
        match self {
            Certificate::X509(_) => X509_KIND,
            Certificate::Other { kind, .. } => kind,
        }
    }

    /// The raw encoding.
    pub fn encoded(&self) -> &[u8] {
        match self {
            Certificate::X509(cert) => cert.as_der(),
            Certificate::Other { encoded, .. } => encoded,
        }
    }

    /// The X.509 certificate, if this is one.
    pub fn as_x509(&self) -> Option<&X509Certificate> {
        match self {
            Certificate::X509(cert) => Some(cert),
            Certificate::Other { .. } => None,
        }
    }
}

impl From<X509Certificate> for Certificate {
    fn from(cert: X509Certificate) -> Self {
        Certificate::X509(cert)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::self_signed;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_der_valid() {
        let (cert, _) = self_signed("example.com");

        assert!(!cert.as_der().is_empty());
        assert!(!cert.serial_hex().is_empty());
        // rcgen's default subject
        assert!(cert.subject().contains("rcgen self signed cert"));
    }

    #[test]
    fn test_from_der_invalid() {
        let result = X509Certificate::from_der(b"not a certificate");
        assert!(matches!(result, Err(Error::Certificate(_))));
    }

    #[test]
    fn test_equality_by_encoding() {
        let (cert1, _) = self_signed("a.example");
        let (cert2, _) = self_signed("b.example");
        let copy = X509Certificate::from_der(cert1.as_der()).unwrap();

        assert_eq!(cert1, copy);
        assert_ne!(cert1, cert2);

        let set: HashSet<_> = [cert1.clone(), copy, cert2].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_encoded_dispatch() {
        let (cert, _) = self_signed("example.com");

        let x509 = Certificate::from_encoded("x.509", cert.as_der()).unwrap();
        assert_eq!(x509.kind(), X509_KIND);
        assert_eq!(x509.as_x509(), Some(&cert));

        let other = Certificate::from_encoded("PGP", b"opaque").unwrap();
        assert_eq!(other.kind(), "PGP");
        assert_eq!(other.encoded(), b"opaque");
        assert!(other.as_x509().is_none());
    }

    #[test]
    fn test_from_encoded_rejects_bad_x509() {
        assert!(Certificate::from_encoded(X509_KIND, b"garbage").is_err());
    }
}
