//! TLS webhook server.
//!
//! # Architecture Overview
//!
//! ```text
//!   cert.pem / key.pem ──▶ net::tls ──▶ RustlsConfig
//!                                           │
//!                                           ▼
//!   SIGINT / SIGTERM ──▶ lifecycle::signals   http::server (HttpServer)
//!                              │              Starting → Serving
//!                              ▼                  │
//!                     lifecycle::shutdown ──drain─┘
//!                     (ShutdownCoordinator)   Draining → Stopped
//!                              │
//!                              ▼
//!                         exit status
//! ```
//!
//! Exit status is non-zero when configuration, TLS material or the listener
//! fail; a drain that hits its deadline is logged and still exits 0.

use clap::Parser;
use std::process::ExitCode;

use webhook_server::config::Cli;
use webhook_server::http::routes;
use webhook_server::lifecycle;
use webhook_server::observability;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    observability::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        cert_path = %config.listener.tls.cert_path,
        key_path = %config.listener.tls.key_path,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        "webhook-server starting"
    );

    match lifecycle::run(&config, routes::router()).await {
        Ok(outcome) => {
            if let Err(e) = outcome.drain {
                tracing::warn!(error = %e, "HTTP shutdown did not finish cleanly");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "webhook-server failed");
            ExitCode::FAILURE
        }
    }
}
