//! Certificates stored in keystore entries, and PEM import helpers.

pub mod certificate;
pub mod loader;

pub use certificate::{Certificate, X509Certificate, X509_KIND};
