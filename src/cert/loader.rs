//! Certificate and key loading from PEM data.
//!
//! Used by callers that import material into a keystore from PEM files.

use crate::cert::certificate::X509Certificate;
use crate::error::{Error, Result};
use rustls_pemfile::Item;
use std::io::Cursor;
use zeroize::Zeroizing;

/// Load the first certificate from PEM data.
///
/// # Example
///
/// ```rust,no_run
/// use remote_keystore::cert::loader::load_certificate_from_pem;
///
/// # fn example() -> remote_keystore::error::Result<()> {
/// let pem = std::fs::read_to_string("cert.pem")?;
/// let cert = load_certificate_from_pem(&pem)?;
/// println!("{}", cert.subject());
/// # Ok(())
/// # }
/// ```
pub fn load_certificate_from_pem(pem_str: &str) -> Result<X509Certificate> {
    let mut cursor = Cursor::new(pem_str.as_bytes());

    loop {
        match rustls_pemfile::read_one(&mut cursor)
            .map_err(|e| Error::Pem(format!("Failed to read PEM: {}", e)))?
        {
            Some(Item::X509Certificate(cert_der)) => return X509Certificate::from_der(&cert_der),
            Some(_) => continue,
            None => return Err(Error::Pem("PEM data does not contain a certificate".to_string())),
        }
    }
}

/// Load every certificate from PEM data, in order.
///
/// Non-certificate sections are skipped. Fails if none are found.
pub fn load_certificates_from_pem(pem_str: &str) -> Result<Vec<X509Certificate>> {
    let mut cursor = Cursor::new(pem_str.as_bytes());
    let mut certificates = Vec::new();

    loop {
        match rustls_pemfile::read_one(&mut cursor)
            .map_err(|e| Error::Pem(format!("Failed to read PEM: {}", e)))?
        {
            Some(Item::X509Certificate(cert_der)) => {
                certificates.push(X509Certificate::from_der(&cert_der)?);
            }
            Some(_) => continue,
            None => break,
        }
    }

    if certificates.is_empty() {
        return Err(Error::Pem("No certificates found in PEM data".to_string()));
    }

    Ok(certificates)
}

/// Load the first PKCS#8 private key from PEM data.
pub fn load_pkcs8_key_from_pem(pem_str: &str) -> Result<Zeroizing<Vec<u8>>> {
    let mut cursor = Cursor::new(pem_str.as_bytes());

    loop {
        match rustls_pemfile::read_one(&mut cursor)
            .map_err(|e| Error::Pem(format!("Failed to read PEM: {}", e)))?
        {
            Some(Item::Pkcs8Key(key)) => {
                return Ok(Zeroizing::new(key.secret_pkcs8_der().to_vec()));
            }
            Some(_) => continue,
            None => {
                return Err(Error::Pem(
                    "PEM data does not contain a PKCS#8 private key".to_string(),
                ))
            }
        }
    }
}
