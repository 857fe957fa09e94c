//! Password derivation and handling.
//!
//! This module provides password-based key derivation using Argon2id with
//! caller-tunable cost parameters.

use crate::error::CryptoError;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// The length of the salt used for key derivation.
pub const SALT_LENGTH: usize = 32;

/// The length of the derived key.
pub const KEY_LENGTH: usize = 32;

/// Upper bound on memory cost accepted from sealed data (1 GiB).
pub const MAX_MEMORY_KIB: u32 = 1024 * 1024;

/// Upper bound on the iteration count accepted from sealed data.
pub const MAX_ITERATIONS: u32 = 64;

/// Argon2id cost parameters.
///
/// These are recorded next to every sealed blob, so changing them only
/// affects data sealed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    /// Check that Argon2 accepts these parameters and that they are within
    /// the bounds this crate is willing to honour when reading sealed data.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(CryptoError::KeyDerivation(format!(
                "memory cost {} KiB exceeds limit of {} KiB",
                self.memory_kib, MAX_MEMORY_KIB
            )));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(CryptoError::KeyDerivation(format!(
                "iteration count {} exceeds limit of {}",
                self.iterations, MAX_ITERATIONS
            )));
        }
        self.to_argon2().map(|_| ())
    }

    fn to_argon2(self) -> Result<Params, CryptoError> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2 parameters rejected: {}", e)))
    }
}

/// Cheap parameters so unit tests do not spend seconds in Argon2.
#[cfg(test)]
pub(crate) const TEST_KDF: KdfParams = KdfParams {
    memory_kib: 256,
    iterations: 1,
    parallelism: 1,
};

/// Generate a random salt for key derivation.
///
/// # Example
///
/// ```
/// use remote_keystore::crypto::password::{generate_salt, SALT_LENGTH};
///
/// let salt = generate_salt();
/// assert_eq!(salt.len(), SALT_LENGTH);
/// ```
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derive an encryption key from a password and salt using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to derive from
/// * `salt` - A random salt (must be SALT_LENGTH bytes)
/// * `params` - Argon2id cost parameters
///
/// # Example
///
/// ```
/// use remote_keystore::crypto::password::{derive_key, generate_salt, KdfParams, KEY_LENGTH};
///
/// let salt = generate_salt();
/// let key = derive_key("secure-password", &salt, &KdfParams::default()).unwrap();
/// assert_eq!(key.len(), KEY_LENGTH);
/// ```
pub fn derive_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LENGTH]>, CryptoError> {
    if salt.len() != SALT_LENGTH {
        return Err(CryptoError::KeyDerivation(format!(
            "Salt must be {} bytes, got {}",
            SALT_LENGTH,
            salt.len()
        )));
    }

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);
    let mut output = Zeroizing::new([0u8; KEY_LENGTH]);

    argon2
        .hash_password_into(password.as_bytes(), salt, &mut *output)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2 error: {}", e)))?;

    Ok(output)
}
