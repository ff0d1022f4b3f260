//! Startup orchestration.
//!
//! # Responsibilities
//! - Load TLS material
//! - Register for termination notifications before the listener is bound
//! - Serve until drained, then report the drain outcome
//!
//! # Design Decisions
//! - Fail fast: TLS or bind errors are fatal and returned to the caller
//! - Shutdown never fails the process: a drain timeout is an outcome, not an error

use axum::Router;
use std::future::Future;
use std::io;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::http::server::{DrainOutcome, HttpServer, ServeError};
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::signals::TerminationListener;
use crate::net::tls::{load_tls_config, ConfigLoadError};

/// Fatal errors that keep the server from running.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create TLS config: {0}")]
    Tls(#[from] ConfigLoadError),

    #[error("failed to register termination handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("failed to serve: {0}")]
    Serve(#[from] ServeError),
}

/// How a run that started successfully ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub drain: DrainOutcome,
}

/// Serve `router` until SIGINT/SIGTERM, then drain.
pub async fn run(config: &ServerConfig, router: Router) -> Result<RunOutcome, StartupError> {
    let listener = TerminationListener::register().map_err(StartupError::Signals)?;
    run_with(config, router, |coordinator| coordinator.listen_for(listener)).await
}

/// Serve `router` until `signal` resolves, then drain.
pub async fn run_until<F>(
    config: &ServerConfig,
    router: Router,
    signal: F,
) -> Result<RunOutcome, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    run_with(config, router, |coordinator| coordinator.trigger_on(signal)).await
}

async fn run_with(
    config: &ServerConfig,
    router: Router,
    install_trigger: impl FnOnce(&ShutdownCoordinator),
) -> Result<RunOutcome, StartupError> {
    let tls = &config.listener.tls;
    let tls_config = load_tls_config(&tls.cert_path, &tls.key_path).await?;

    let server = HttpServer::new(tls_config);
    let coordinator = ShutdownCoordinator::spawn(server.clone(), config.shutdown.drain_timeout());
    install_trigger(&coordinator);

    if let Err(e) = server.start(&config.listener.bind_address, router).await {
        // Let the coordinator finish (a no-op drain) before reporting.
        coordinator.trigger();
        let _ = coordinator.wait().await;
        return Err(e.into());
    }

    let drain = coordinator.wait().await;
    tracing::info!("Shutdown complete");
    Ok(RunOutcome { drain })
}
