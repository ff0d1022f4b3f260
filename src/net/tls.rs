//! TLS configuration and certificate loading.
//!
//! The certificate chain and private key are read once at startup and turned
//! into an immutable rustls server configuration. Nothing here touches the
//! files again after the configuration is built.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

/// Failure to turn the certificate/key files into a TLS configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read certificate file {}: {source}", path.display())]
    ReadCertificate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read private key file {}: {source}", path.display())]
    ReadPrivateKey {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no PEM certificates found in {}", path.display())]
    NoCertificates { path: PathBuf },

    #[error("no PEM private key found in {}", path.display())]
    NoPrivateKey { path: PathBuf },

    #[error("certificate {} and key {} are not a usable pair: {source}", cert.display(), key.display())]
    InvalidKeyPair {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: rustls::Error,
    },
}

impl ConfigLoadError {
    /// The file that could not be used.
    pub fn path(&self) -> &Path {
        match self {
            ConfigLoadError::ReadCertificate { path, .. }
            | ConfigLoadError::ReadPrivateKey { path, .. }
            | ConfigLoadError::NoCertificates { path }
            | ConfigLoadError::NoPrivateKey { path } => path,
            ConfigLoadError::InvalidKeyPair { key, .. } => key,
        }
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(
    cert_path: impl AsRef<Path>,
    key_path: impl AsRef<Path>,
) -> Result<RustlsConfig, ConfigLoadError> {
    let cert_path = cert_path.as_ref();
    let key_path = key_path.as_ref();

    let certs = read_certificates(cert_path).await?;
    let key = read_private_key(key_path).await?;

    let invalid_pair = |source| ConfigLoadError::InvalidKeyPair {
        cert: cert_path.to_path_buf(),
        key: key_path.to_path_buf(),
        source,
    };

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(invalid_pair)?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(invalid_pair)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    tracing::info!(
        cert_path = %cert_path.display(),
        key_path = %key_path.display(),
        "TLS configuration loaded"
    );

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

async fn read_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigLoadError> {
    let read_error = |source| ConfigLoadError::ReadCertificate {
        path: path.to_path_buf(),
        source,
    };

    let pem = tokio::fs::read(path).await.map_err(read_error)?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;

    if certs.is_empty() {
        return Err(ConfigLoadError::NoCertificates {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}

async fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigLoadError> {
    let read_error = |source| ConfigLoadError::ReadPrivateKey {
        path: path.to_path_buf(),
        source,
    };

    let pem = tokio::fs::read(path).await.map_err(read_error)?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(read_error)?
        .ok_or_else(|| ConfigLoadError::NoPrivateKey {
            path: path.to_path_buf(),
        })
}
