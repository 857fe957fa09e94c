//! Password-based sealing with Argon2id and AES-256-GCM.
//!
//! The sealed output format is:
//! [m_cost u32le][t_cost u32le][p_cost u32le][salt (32 bytes)][nonce (12 bytes)][ciphertext]
//!
//! The Argon2 parameters travel with the data so a blob can always be opened
//! with only the password, whatever the current configuration says.

use crate::crypto::password::{derive_key, generate_salt, KdfParams, SALT_LENGTH};
use crate::error::CryptoError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

/// The length of the nonce used for AES-GCM encryption.
const NONCE_LENGTH: usize = 12;

/// Three little-endian u32 cost parameters.
const PARAMS_LENGTH: usize = 12;

/// Bytes preceding the ciphertext.
pub const HEADER_LENGTH: usize = PARAMS_LENGTH + SALT_LENGTH + NONCE_LENGTH;

/// Seal `plaintext` under `password`.
///
/// A fresh salt and nonce are drawn for every call, so sealing the same
/// plaintext twice yields different bytes.
///
/// # Example
///
/// ```
/// use remote_keystore::crypto::encryption::{seal, unseal};
/// use remote_keystore::crypto::password::KdfParams;
///
/// let sealed = seal(b"this is a secret", "secure-password", &KdfParams::default()).unwrap();
/// let opened = unseal(&sealed, "secure-password").unwrap();
///
/// assert_eq!(b"this is a secret".as_slice(), opened.as_slice());
/// ```
pub fn seal(plaintext: &[u8], password: &str, params: &KdfParams) -> Result<Vec<u8>, CryptoError> {
    params.validate()?;

    let salt = generate_salt();
    let derived_key = derive_key(password, &salt, params)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(derived_key.as_slice())
        .map_err(|e| CryptoError::Encryption(format!("Invalid key length: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut output = Vec::with_capacity(HEADER_LENGTH + ciphertext.len());
    output.extend_from_slice(&params.memory_kib.to_le_bytes());
    output.extend_from_slice(&params.iterations.to_le_bytes());
    output.extend_from_slice(&params.parallelism.to_le_bytes());
    output.extend_from_slice(&salt);
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Open a blob produced by [`seal`].
///
/// Fails with [`CryptoError::InvalidPassword`] when the authentication tag
/// does not verify; no plaintext is returned in that case.
pub fn unseal(sealed: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if sealed.len() < HEADER_LENGTH {
        return Err(CryptoError::Malformed(format!(
            "Sealed data too short: expected at least {} bytes, got {}",
            HEADER_LENGTH,
            sealed.len()
        )));
    }

    let params = KdfParams {
        memory_kib: read_u32(&sealed[0..4]),
        iterations: read_u32(&sealed[4..8]),
        parallelism: read_u32(&sealed[8..12]),
    };
    params
        .validate()
        .map_err(|e| CryptoError::Malformed(format!("Unusable KDF parameters: {}", e)))?;

    let salt = &sealed[PARAMS_LENGTH..PARAMS_LENGTH + SALT_LENGTH];
    let nonce_bytes = &sealed[PARAMS_LENGTH + SALT_LENGTH..HEADER_LENGTH];
    let ciphertext = &sealed[HEADER_LENGTH..];

    let derived_key = derive_key(password, salt, &params)?;
    let cipher = Aes256Gcm::new_from_slice(derived_key.as_slice())
        .map_err(|e| CryptoError::Encryption(format!("Invalid key length: {}", e)))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::InvalidPassword)?;

    Ok(Zeroizing::new(plaintext))
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::TEST_KDF;

    #[test]
    fn test_seal_unseal_roundtrip() {
        let secret = b"this is a test private key";

        let sealed = seal(secret, "secure-password", &TEST_KDF).unwrap();
        let opened = unseal(&sealed, "secure-password").unwrap();

        assert_eq!(secret.as_slice(), opened.as_slice());
    }

    #[test]
    fn test_seal_produces_different_output() {
        let sealed1 = seal(b"test key", "password", &TEST_KDF).unwrap();
        let sealed2 = seal(b"test key", "password", &TEST_KDF).unwrap();

        // Each seal uses a different salt and nonce
        assert_ne!(sealed1, sealed2);
    }

    #[test]
    fn test_seal_records_params() {
        let sealed = seal(b"test key", "password", &TEST_KDF).unwrap();

        assert_eq!(read_u32(&sealed[0..4]), TEST_KDF.memory_kib);
        assert_eq!(read_u32(&sealed[4..8]), TEST_KDF.iterations);
        assert_eq!(read_u32(&sealed[8..12]), TEST_KDF.parallelism);
        assert!(sealed.len() >= HEADER_LENGTH + b"test key".len());
    }

    #[test]
    fn test_unseal_wrong_password() {
        let sealed = seal(b"test key", "correct-password", &TEST_KDF).unwrap();

        match unseal(&sealed, "wrong-password") {
            Err(CryptoError::InvalidPassword) => {}
            _ => panic!("Expected InvalidPassword"),
        }
    }

    #[test]
    fn test_unseal_tampered_ciphertext() {
        let mut sealed = seal(b"test key", "password", &TEST_KDF).unwrap();
        let len = sealed.len();
        sealed[len - 1] ^= 0xFF;

        assert!(matches!(
            unseal(&sealed, "password"),
            Err(CryptoError::InvalidPassword)
        ));
    }

    #[test]
    fn test_unseal_too_short() {
        match unseal(&[0u8; 20], "password") {
            Err(CryptoError::Malformed(msg)) => assert!(msg.contains("too short")),
            _ => panic!("Expected Malformed"),
        }
    }

    #[test]
    fn test_unseal_rejects_hostile_params() {
        let mut sealed = seal(b"test key", "password", &TEST_KDF).unwrap();
        sealed[0..4].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            unseal(&sealed, "password"),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn test_seal_empty_plaintext() {
        let sealed = seal(b"", "password", &TEST_KDF).unwrap();
        let opened = unseal(&sealed, "password").unwrap();

        assert!(opened.is_empty());
    }
}
