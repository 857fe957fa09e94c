//! Keystore configuration.
//!
//! Configuration is plain data with defaults for every field, loadable from
//! JSON. It governs how new data is sealed; existing containers carry their
//! own parameters and open regardless of the current configuration.

use crate::crypto::password::KdfParams;
use crate::error::{Error, Result};
use crate::keystore::codec::PKCS12_CONTAINER_TYPE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings shared by every keystore a manager opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// Container type used when the caller does not name one.
    pub default_container_type: String,

    /// Argon2id parameters for newly sealed containers and entries.
    pub kdf: KdfParams,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            default_container_type: PKCS12_CONTAINER_TYPE.to_string(),
            kdf: KdfParams::default(),
        }
    }
}

impl KeystoreConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use remote_keystore::config::KeystoreConfig;
    ///
    /// let config = KeystoreConfig::from_json_str(r#"{"kdf": {"iterations": 3}}"#).unwrap();
    /// assert_eq!(config.kdf.iterations, 3);
    /// assert_eq!(config.default_container_type, "PKCS12");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: KeystoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.default_container_type.trim().is_empty() {
            return Err(Error::Config(
                "default_container_type must not be empty".to_string(),
            ));
        }
        self.kdf
            .validate()
            .map_err(|e| Error::Config(format!("invalid kdf parameters: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = KeystoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_container_type, PKCS12_CONTAINER_TYPE);
    }

    #[test]
    fn test_from_json_partial() {
        let config = KeystoreConfig::from_json_str(
            r#"{"kdf": {"memory_kib": 512, "iterations": 1, "parallelism": 1}}"#,
        )
        .unwrap();

        assert_eq!(config.kdf.memory_kib, 512);
        assert_eq!(config.default_container_type, PKCS12_CONTAINER_TYPE);
    }

    #[test]
    fn test_from_json_rejects_bad_kdf() {
        let result = KeystoreConfig::from_json_str(r#"{"kdf": {"iterations": 0}}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_rejects_empty_type() {
        let result = KeystoreConfig::from_json_str(r#"{"default_container_type": " "}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_malformed() {
        let result = KeystoreConfig::from_json_str("{not json");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keystore.json");
        fs::write(&path, r#"{"default_container_type": "rks"}"#).unwrap();

        let config = KeystoreConfig::load(&path).unwrap();
        assert_eq!(config.default_container_type, "rks");
    }
}
