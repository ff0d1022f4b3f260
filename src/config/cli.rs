//! Command-line flags.
//!
//! Flags override values from the optional config file, which in turn
//! override the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ServerConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "webhook-server")]
#[command(about = "Serve the webhook endpoint over TLS with graceful shutdown", long_about = None)]
pub struct Cli {
    /// Address to listen on [default: 0.0.0.0:33333]
    #[arg(long)]
    pub addr: Option<String>,

    /// Path to TLS certificate file [default: cert.pem]
    #[arg(long = "tls-cert")]
    pub tls_cert: Option<String>,

    /// Path to TLS private key file [default: key.pem]
    #[arg(long = "tls-key")]
    pub tls_key: Option<String>,

    /// Seconds in-flight requests may run after a termination signal [default: 5]
    #[arg(long)]
    pub drain_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Build the effective configuration.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(addr) = &self.addr {
            config.listener.bind_address = addr.clone();
        }
        if let Some(cert) = &self.tls_cert {
            config.listener.tls.cert_path = cert.clone();
        }
        if let Some(key) = &self.tls_key {
            config.listener.tls.key_path = key.clone();
        }
        if let Some(secs) = self.drain_timeout_secs {
            config.shutdown.drain_timeout_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
