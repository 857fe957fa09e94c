//! Integration tests for the keystore manager.
//!
//! These tests drive complete open / edit / store workflows against both
//! storage backends.

use remote_keystore::cert::loader::{load_certificates_from_pem, load_pkcs8_key_from_pem};
use remote_keystore::cert::{Certificate, X509Certificate};
use remote_keystore::config::KeystoreConfig;
use remote_keystore::error::{KeyError, OpenError, Result, StorageError, StoreError};
use remote_keystore::keystore::{EntryKind, KeyAlgorithm, KeystoreManager};
use remote_keystore::storage::{LocalStore, MemoryStore, ObjectPath, ObjectStore};
use std::fs;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

fn cheap_config() -> KeystoreConfig {
    KeystoreConfig::from_json_str(r#"{"kdf": {"memory_kib": 256, "iterations": 1, "parallelism": 1}}"#)
        .unwrap()
}

fn manager_for(store: Arc<dyn ObjectStore>) -> KeystoreManager {
    KeystoreManager::with_config(store, cheap_config())
}

fn path(s: &str) -> ObjectPath {
    ObjectPath::new(s).unwrap()
}

/// A self-signed certificate and its PKCS#8 key.
fn self_signed(name: &str) -> (X509Certificate, Vec<u8>) {
    let cert = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    let der = cert.serialize_der().unwrap();
    (
        X509Certificate::from_der(&der).unwrap(),
        cert.serialize_private_key_der(),
    )
}

#[test]
fn test_secret_roundtrip_through_local_store() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(temp_dir.path()));
    let ks_path = path("teams/payments/app.p12");

    // 1. Create and populate
    let mut writer = manager_for(store.clone());
    writer.open(None, "PKCS12", "pw1")?;
    writer.set_password("db", "s3cret", "pw2")?;
    writer.store(&ks_path, "pw1")?;

    assert!(temp_dir.path().join("teams/payments/app.p12").is_file());

    // 2. Reopen with a fresh manager
    let mut reader = manager_for(store);
    reader.open(Some(&ks_path), "PKCS12", "pw1")?;
    assert_eq!(*reader.get_password("db", "pw2")?, "s3cret");

    Ok(())
}

#[test]
fn test_secret_roundtrip_rks() -> Result<()> {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let ks_path = path("app.rks");

    let mut writer = manager_for(store.clone());
    writer.open(None, "RKS", "pw1")?;
    writer.set_password("db", "s3cret", "pw2")?;
    writer.store(&ks_path, "pw1")?;

    let mut reader = manager_for(store);
    reader.open(Some(&ks_path), "RKS", "pw1")?;
    assert_eq!(*reader.get_password("db", "pw2")?, "s3cret");

    Ok(())
}

#[test]
fn test_shared_memory_store_between_managers() -> Result<()> {
    let remote = MemoryStore::new();
    let ks_path = path("ks.rks");

    let mut writer = manager_for(Arc::new(remote.clone()));
    writer.open(None, "pkcs12", "pw1")?;
    writer.set_password("api", "token-123", "pw2")?;
    writer.store(&ks_path, "pw1")?;

    assert_eq!(remote.len(), 1);

    let mut reader = manager_for(Arc::new(remote));
    reader.open(Some(&ks_path), "PKCS12", "pw1")?;
    assert_eq!(reader.aliases()?, vec!["api"]);
    assert_eq!(*reader.get_password("api", "pw2")?, "token-123");

    Ok(())
}

#[test]
fn test_empty_keystore_has_no_certificates() -> Result<()> {
    let mut manager = manager_for(Arc::new(MemoryStore::new()));
    manager.open(None, "PKCS12", "pw")?;

    assert!(manager.get_all_x509_certificates()?.is_empty());
    assert!(manager.is_empty()?);

    Ok(())
}

#[test]
fn test_wrong_container_password() -> Result<()> {
    for container_type in ["PKCS12", "RKS"] {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let mut writer = manager_for(store.clone());
        writer.open(None, container_type, "pw1")?;
        writer.set_password("db", "s3cret", "pw2")?;
        writer.store(&path("ks"), "pw1")?;

        let mut reader = manager_for(store);
        let result = reader.open(Some(&path("ks")), container_type, "wrongpw");
        assert!(matches!(result, Err(OpenError::BadPassword)));
        assert!(!reader.is_open());
    }

    Ok(())
}

#[test]
fn test_wrong_entry_password() -> Result<()> {
    let mut manager = manager_for(Arc::new(MemoryStore::new()));
    manager.open(None, "PKCS12", "pw1")?;
    manager.set_password("db", "s3cret", "pw2")?;

    assert!(matches!(
        manager.get_password("db", "pw1"),
        Err(KeyError::BadPassword)
    ));

    Ok(())
}

#[test]
fn test_unsupported_container_type() {
    let mut manager = manager_for(Arc::new(MemoryStore::new()));

    let result = manager.open(None, "JCEKS", "pw");
    assert!(matches!(result, Err(OpenError::UnsupportedType(t)) if t == "JCEKS"));
}

#[test]
fn test_certificates_deduplicated_across_aliases() -> Result<()> {
    let (shared, _) = self_signed("shared.example");
    let (other, other_key) = self_signed("other.example");

    for container_type in ["PKCS12", "RKS"] {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let mut writer = manager_for(store.clone());
        writer.open(None, container_type, "pw")?;
        writer.set_certificate_entry("ca-1", shared.clone().into())?;
        writer.set_certificate_entry("ca-2", shared.clone().into())?;
        writer.set_private_key_entry("server", &other_key, vec![other.clone().into()], "pw")?;
        writer.set_password("db", "s3cret", "spw")?;
        writer.store(&path("ks"), "pw")?;

        let mut reader = manager_for(store);
        reader.open(Some(&path("ks")), container_type, "pw")?;
        let certs = reader.get_all_x509_certificates()?;

        assert_eq!(certs.len(), 2);
        assert!(certs.contains(&shared));
        assert!(certs.contains(&other));
    }

    Ok(())
}

#[test]
fn test_pkcs12_written_elsewhere_opens() -> Result<()> {
    use p12_keystore::{Certificate as P12Certificate, KeyStore, KeyStoreEntry, PrivateKeyChain};

    let (leaf, key) = self_signed("svc.example");
    let (ca, _) = self_signed("ca.example");

    let mut p12 = KeyStore::new();
    p12.add_entry(
        "svc",
        KeyStoreEntry::PrivateKeyChain(PrivateKeyChain::new(
            key.as_slice(),
            b"svc-key-id".as_slice(),
            vec![P12Certificate::from_der(leaf.as_der()).unwrap()],
        )),
    );
    p12.add_entry(
        "ca",
        KeyStoreEntry::Certificate(P12Certificate::from_der(ca.as_der()).unwrap()),
    );
    let bytes = p12.writer("changeit").write().unwrap();

    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("svc.p12"), &bytes)?;
    let mut manager = manager_for(Arc::new(LocalStore::new(temp_dir.path())));
    manager.open(Some(&path("svc.p12")), "PKCS12", "changeit")?;

    assert_eq!(manager.aliases()?, vec!["ca", "svc"]);
    assert_eq!(manager.entry_kind("ca")?, EntryKind::Certificate);
    let material = manager.get_private_key("svc", "changeit")?;
    assert_eq!(material.pkcs8_der(), key.as_slice());
    assert_eq!(material.algorithm(), KeyAlgorithm::Ec);
    assert_eq!(manager.get_certificate("svc")?, Certificate::from(leaf));
    assert_eq!(manager.get_all_x509_certificates()?.len(), 2);

    Ok(())
}

#[test]
fn test_pkcs12_key_needs_container_password() -> Result<()> {
    let (leaf, key) = self_signed("svc.example");
    let store = MemoryStore::new();

    let mut manager = manager_for(Arc::new(store.clone()));
    manager.open(None, "PKCS12", "pw")?;
    manager.store(&path("ks.p12"), "pw")?;
    let before = store.stat(&path("ks.p12"))?;

    manager.set_private_key_entry("svc", &key, vec![leaf.into()], "other-pw")?;
    assert!(matches!(
        manager.store(&path("ks.p12"), "pw"),
        Err(StoreError::EncodeFailure(_))
    ));
    assert_eq!(store.stat(&path("ks.p12"))?, before);

    Ok(())
}

#[test]
fn test_private_key_entry_workflow() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(temp_dir.path()));

    // PEM inputs, as the CLI reads them
    let rc = rcgen::generate_simple_self_signed(vec!["svc.example".to_string()]).unwrap();
    let chain_pem = rc.serialize_pem().unwrap();
    let key_pem = rc.serialize_private_key_pem();
    let key_der = load_pkcs8_key_from_pem(&key_pem)?;
    let chain: Vec<Certificate> = load_certificates_from_pem(&chain_pem)?
        .into_iter()
        .map(Certificate::from)
        .collect();

    // PKCS#12 keys share the container password; RKS keys have their own
    for (container_type, entry_password) in [("PKCS12", "pw"), ("RKS", "kpw")] {
        let mut writer = manager_for(store.clone());
        writer.open(None, container_type, "pw")?;
        writer.set_private_key_entry("svc", &key_der, chain.clone(), entry_password)?;
        writer.store(&path("svc"), "pw")?;

        let mut reader = manager_for(store.clone());
        reader.open(Some(&path("svc")), container_type, "pw")?;

        assert_eq!(reader.entry_kind("svc")?, EntryKind::PrivateKey);
        let key = reader.get_private_key("svc", entry_password)?;
        assert_eq!(key.algorithm(), KeyAlgorithm::Ec);
        assert_eq!(key.pkcs8_der(), key_der.as_slice());
        assert_eq!(reader.get_certificate("svc")?, chain[0]);
        assert_eq!(reader.get_certificate_chain("svc")?, chain);

        assert!(matches!(
            reader.get_password("svc", entry_password),
            Err(KeyError::WrongType { .. })
        ));
    }

    Ok(())
}

#[test]
fn test_delete_persists() -> Result<()> {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let mut manager = manager_for(store.clone());
    manager.open(None, "PKCS12", "pw")?;
    manager.set_password("a", "1", "pw")?;
    manager.set_password("b", "2", "pw")?;
    manager.store(&path("ks.rks"), "pw")?;

    manager.delete_entry("a")?;
    manager.store(&path("ks.rks"), "pw")?;

    let mut reader = manager_for(store);
    reader.open(Some(&path("ks.rks")), "RKS", "pw")?;
    assert_eq!(reader.aliases()?, vec!["b"]);
    assert!(matches!(
        reader.get_password("a", "pw"),
        Err(KeyError::NoSuchAlias(_))
    ));

    Ok(())
}

#[test]
fn test_unsaved_changes_are_not_durable() -> Result<()> {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    let mut manager = manager_for(store.clone());
    manager.open(None, "RKS", "pw")?;
    manager.store(&path("ks.rks"), "pw")?;
    manager.set_password("db", "s3cret", "pw")?;

    let mut reader = manager_for(store);
    reader.open(Some(&path("ks.rks")), "RKS", "pw")?;
    assert!(!reader.contains_alias("db")?);

    Ok(())
}

#[test]
fn test_corrupt_object_reports_corrupt() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("junk.rks"), b"garbage bytes")?;
    let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(temp_dir.path()));

    let mut manager = manager_for(store);
    let result = manager.open(Some(&path("junk.rks")), "RKS", "pw");
    assert!(matches!(result, Err(OpenError::Corrupt(_))));

    Ok(())
}

#[test]
fn test_missing_object_reports_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = manager_for(Arc::new(LocalStore::new(temp_dir.path())));

    let result = manager.open(Some(&path("nope.rks")), "RKS", "pw");
    assert!(matches!(result, Err(OpenError::NotFound(_))));
}

#[test]
fn test_directory_path_reports_not_found() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("teams/payments")).unwrap();
    let mut manager = manager_for(Arc::new(LocalStore::new(temp_dir.path())));

    let result = manager.open(Some(&path("teams/payments")), "PKCS12", "pw");
    assert!(matches!(result, Err(OpenError::NotFound(_))));
    assert!(!manager.is_open());
}

#[test]
fn test_store_before_open() {
    let manager = manager_for(Arc::new(MemoryStore::new()));

    assert!(matches!(
        manager.store(&path("ks.rks"), "pw"),
        Err(StoreError::NotOpen)
    ));
}

#[test]
fn test_interrupted_write_keeps_previous_object() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalStore::new(temp_dir.path());
    let ks_path = path("ks.rks");

    let mut manager = manager_for(Arc::new(store.clone()));
    manager.open(None, "RKS", "pw")?;
    manager.set_password("db", "s3cret", "pw")?;
    manager.store(&ks_path, "pw")?;
    let before = fs::read(temp_dir.path().join("ks.rks"))?;

    {
        let mut sink = store.open_write(&ks_path)?;
        sink.write_all(b"half a keystore").map_err(StorageError::Io)?;
        // dropped without finish
    }

    assert_eq!(fs::read(temp_dir.path().join("ks.rks"))?, before);
    assert_eq!(store.list(None)?.len(), 1);

    Ok(())
}
