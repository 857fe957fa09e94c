//! `rks` command-line interface.
//!
//! Thin caller over [`KeystoreManager`] with a [`LocalStore`] rooted at
//! `--root`. Every command that changes a keystore stores it back before
//! exiting.

use clap::{Parser, Subcommand};
use remote_keystore::cert::loader::{
    load_certificate_from_pem, load_certificates_from_pem, load_pkcs8_key_from_pem,
};
use remote_keystore::cert::Certificate;
use remote_keystore::config::KeystoreConfig;
use remote_keystore::error::{Error, Result};
use remote_keystore::keystore::{KeystoreManager, PKCS12_CONTAINER_TYPE};
use remote_keystore::storage::{LocalStore, ObjectPath, ObjectStore};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rks")]
#[command(about = "Password-protected keystores on object storage", long_about = None)]
struct Cli {
    /// Directory holding keystore objects
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Container type (default taken from the configuration)
    #[arg(long = "type", global = true)]
    container_type: Option<String>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Container password (prompted for if not given)
    #[arg(long, global = true, env = "RKS_STORE_PASSWORD", hide_env_values = true)]
    store_password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty keystore
    Init {
        /// Object path of the keystore
        path: String,

        /// Replace an existing keystore
        #[arg(long)]
        force: bool,
    },

    /// Store a secret password
    SetPassword {
        path: String,

        #[arg(long)]
        alias: String,
    },

    /// Print a secret password
    GetPassword {
        path: String,

        #[arg(long)]
        alias: String,
    },

    /// Import a trusted certificate from a PEM file
    ImportCert {
        path: String,

        #[arg(long)]
        alias: String,

        /// PEM certificate file
        #[arg(long)]
        file: PathBuf,
    },

    /// Import a PKCS#8 private key with its certificate chain
    ImportKey {
        path: String,

        #[arg(long)]
        alias: String,

        /// PEM private key file (PKCS#8)
        #[arg(long)]
        key: PathBuf,

        /// PEM certificate chain, leaf first
        #[arg(long)]
        chain: PathBuf,
    },

    /// Delete an entry
    Delete {
        path: String,

        #[arg(long)]
        alias: String,
    },

    /// List entries
    List { path: String },

    /// List the distinct X.509 certificates of a keystore
    Certs { path: String },

    /// List keystore objects under the root
    Objects {
        /// Only list objects under this prefix
        prefix: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("remote_keystore=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => KeystoreConfig::load(path)?,
        None => KeystoreConfig::default(),
    };
    let container_type = cli
        .container_type
        .clone()
        .unwrap_or_else(|| config.default_container_type.clone());
    let store = Arc::new(LocalStore::new(&cli.root));
    let session = Session {
        store: store.clone(),
        config,
        container_type,
        store_password: cli.store_password,
    };

    match cli.command {
        Commands::Init { path, force } => {
            let path = ObjectPath::new(path)?;
            if !force && store.exists(&path)? {
                return Err(Error::Config(format!(
                    "{} already exists (use --force to replace it)",
                    path
                )));
            }
            let password = session.store_password()?;
            let mut manager = session.manager();
            manager.open(None, &session.container_type, &password)?;
            manager.store(&path, &password)?;
            println!("Created empty keystore: {}", path);
        }

        Commands::SetPassword { path, alias } => {
            let (path, password, mut manager) = session.open(&path)?;
            let secret = rpassword::prompt_password("Enter secret to store: ")?;
            let entry_password = prompt_new_entry_password()?;
            manager.set_password(&alias, &secret, &entry_password)?;
            manager.store(&path, &password)?;
            println!("Stored secret: {}", alias);
        }

        Commands::GetPassword { path, alias } => {
            let (_, _, manager) = session.open(&path)?;
            let entry_password = rpassword::prompt_password("Enter entry password: ")?;
            let secret = manager.get_password(&alias, &entry_password)?;
            println!("{}", secret.as_str());
        }

        Commands::ImportCert { path, alias, file } => {
            let cert = load_certificate_from_pem(&fs::read_to_string(&file)?)?;
            let subject = cert.subject();
            let (path, password, mut manager) = session.open(&path)?;
            manager.set_certificate_entry(&alias, cert.into())?;
            manager.store(&path, &password)?;
            println!("Imported certificate '{}': {}", alias, subject);
        }

        Commands::ImportKey {
            path,
            alias,
            key,
            chain,
        } => {
            let key_der = load_pkcs8_key_from_pem(&fs::read_to_string(&key)?)?;
            let chain: Vec<Certificate> = load_certificates_from_pem(&fs::read_to_string(&chain)?)?
                .into_iter()
                .map(Certificate::from)
                .collect();
            let (path, password, mut manager) = session.open(&path)?;
            // PKCS#12 keys are protected by the container password
            let entry_password = if session.container_type.eq_ignore_ascii_case(PKCS12_CONTAINER_TYPE) {
                password.clone()
            } else {
                prompt_new_entry_password()?
            };
            manager.set_private_key_entry(&alias, &key_der, chain, &entry_password)?;
            manager.store(&path, &password)?;
            println!("Imported private key: {}", alias);
        }

        Commands::Delete { path, alias } => {
            let (path, password, mut manager) = session.open(&path)?;
            let removed = manager.delete_entry(&alias)?;
            manager.store(&path, &password)?;
            println!("Deleted {} entry: {}", removed.kind(), alias);
        }

        Commands::List { path } => {
            let (_, _, manager) = session.open(&path)?;
            let aliases = manager.aliases()?;
            if aliases.is_empty() {
                println!("No entries found in keystore.");
            } else {
                println!("{:<32} Kind", "Alias");
                println!("{}", "-".repeat(48));
                for alias in aliases {
                    println!("{:<32} {}", alias, manager.entry_kind(&alias)?);
                }
            }
        }

        Commands::Certs { path } => {
            let (_, _, manager) = session.open(&path)?;
            let mut certs: Vec<_> = manager.get_all_x509_certificates()?.into_iter().collect();
            certs.sort_by_key(|cert| cert.subject());
            if certs.is_empty() {
                println!("No X.509 certificates found in keystore.");
            }
            for cert in certs {
                println!("Subject: {}", cert.subject());
                println!("  Issuer: {}", cert.issuer());
                println!("  Serial: {}", cert.serial_hex());
            }
        }

        Commands::Objects { prefix } => {
            let prefix = prefix.map(ObjectPath::new).transpose()?;
            let objects = store.list(prefix.as_ref())?;
            if objects.is_empty() {
                println!("No objects found under {}.", cli.root.display());
            }
            for object in objects {
                println!("{:<48} {:>10} bytes", object.path, object.size);
            }
        }
    }

    Ok(())
}

/// Settings shared by every command of one invocation.
struct Session {
    store: Arc<LocalStore>,
    config: KeystoreConfig,
    container_type: String,
    store_password: Option<String>,
}

impl Session {
    fn manager(&self) -> KeystoreManager {
        KeystoreManager::with_config(self.store.clone(), self.config.clone())
    }

    fn store_password(&self) -> Result<String> {
        match &self.store_password {
            Some(password) => Ok(password.clone()),
            None => Ok(rpassword::prompt_password("Enter keystore password: ")?),
        }
    }

    /// Open the keystore at `path`, returning what is needed to store it back.
    fn open(&self, path: &str) -> Result<(ObjectPath, String, KeystoreManager)> {
        let path = ObjectPath::new(path)?;
        let password = self.store_password()?;
        let mut manager = self.manager();
        manager.open(Some(&path), &self.container_type, &password)?;
        Ok((path, password, manager))
    }
}

fn prompt_new_entry_password() -> Result<String> {
    let password = rpassword::prompt_password("Enter entry password: ")?;
    let confirm = rpassword::prompt_password("Confirm entry password: ")?;
    if password != confirm {
        return Err(Error::Config("entry passwords do not match".to_string()));
    }
    Ok(password)
}
