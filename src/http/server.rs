//! HTTPS server lifecycle.
//!
//! # Responsibilities
//! - Bind the listener and serve an injected router over TLS
//! - Track the lifecycle state (Starting → Serving → Draining → Stopped)
//! - Drain: stop accepting, let in-flight connections finish, force-close
//!   whatever is left at the deadline
//! - Record the drain outcome so repeated calls replay it

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::http::request::with_request_tracing;
use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::net::acceptor::CancellableAcceptor;
use crate::net::listener::{bind_listener, ListenerBindError};

/// How often the drain loop samples the open connection count.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on waiting for the serve loop to release the listener, and for
/// force-closed connection tasks to finish, once the drain has ended.
const LISTENER_RELEASE_GRACE: Duration = Duration::from_secs(1);

/// Failure of [`HttpServer::start`] other than a deliberate drain.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Bind(#[from] ListenerBindError),

    #[error("listener failed while serving: {0}")]
    Io(#[from] std::io::Error),

    #[error("server instance was already started")]
    AlreadyStarted,
}

/// A drain that had to force-close connections at its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("drain deadline of {deadline:?} exceeded; {forced} connection(s) forcibly closed")]
pub struct DrainTimeoutError {
    pub deadline: Duration,
    pub forced: usize,
}

/// Recorded result of the one drain sequence an instance runs.
pub type DrainOutcome = Result<(), DrainTimeoutError>;

/// HTTPS server with bounded, idempotent drain.
///
/// Cloning yields another handle to the same instance; `start` runs on one
/// task while `drain` is called from another.
#[derive(Clone)]
pub struct HttpServer {
    inner: Arc<Inner>,
}

struct Inner {
    tls: RustlsConfig,
    handle: Handle,
    state: StateCell,
    started: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
    /// Cancelled once `start` has returned and the listener is gone.
    released: CancellationToken,
    /// Cancelled at the drain deadline; aborts connections still handshaking.
    force_close: CancellationToken,
    drain: OnceCell<DrainOutcome>,
}

impl HttpServer {
    /// Create a server that will terminate TLS with `tls`.
    pub fn new(tls: RustlsConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                tls,
                handle: Handle::new(),
                state: StateCell::new(),
                started: AtomicBool::new(false),
                local_addr: OnceLock::new(),
                released: CancellationToken::new(),
                force_close: CancellationToken::new(),
                drain: OnceCell::new(),
            }),
        }
    }

    /// Bind `address` and serve `router` until the listener is closed.
    ///
    /// Returns `Ok(())` when the listener was closed by [`drain`](Self::drain),
    /// including a drain that happened before the listener was bound.
    pub async fn start(&self, address: &str, router: Router) -> Result<(), ServeError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(ServeError::AlreadyStarted);
        }
        let _released = self.inner.released.clone().drop_guard();

        if self.inner.state.get() == LifecycleState::Stopped {
            tracing::info!("Drained before start; not binding");
            return Ok(());
        }

        let (listener, local_addr) = match bind_listener(address) {
            Ok(bound) => bound,
            Err(e) => {
                let _ = self
                    .inner
                    .state
                    .transition(LifecycleState::Starting, LifecycleState::Stopped);
                return Err(e.into());
            }
        };
        let _ = self.inner.local_addr.set(local_addr);

        if let Err(observed) = self
            .inner
            .state
            .transition(LifecycleState::Starting, LifecycleState::Serving)
        {
            tracing::info!(state = %observed, "Drained while binding; releasing listener");
            return Ok(());
        }

        tracing::info!(address = %local_addr, "HTTPS server starting");

        let app = with_request_tracing(router);
        let force_close = self.inner.force_close.clone();
        let result = axum_server::tls_rustls::from_tcp_rustls(listener, self.inner.tls.clone())
            .map(|tls| CancellableAcceptor::new(tls, force_close))
            .handle(self.inner.handle.clone())
            .serve(app.into_make_service())
            .await;

        match result {
            Ok(()) => {
                tracing::info!("HTTPS server stopped");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "HTTPS server failed");
                let _ = self
                    .inner
                    .state
                    .transition(LifecycleState::Serving, LifecycleState::Stopped);
                Err(ServeError::Io(e))
            }
        }
    }

    /// Stop accepting connections and wait up to `deadline` for open ones.
    ///
    /// Only the first call runs the drain sequence; every call (concurrent or
    /// later) returns the outcome of that one run. Connections still open at
    /// the deadline are closed and reported through [`DrainTimeoutError`].
    pub async fn drain(&self, deadline: Duration) -> DrainOutcome {
        self.inner
            .drain
            .get_or_init(|| self.run_drain(deadline))
            .await
            .clone()
    }

    async fn run_drain(&self, deadline: Duration) -> DrainOutcome {
        use LifecycleState::*;

        let state = &self.inner.state;
        match state.transition(Starting, Stopped) {
            Ok(()) => {
                tracing::info!("Drain requested before serving; nothing to drain");
                return Ok(());
            }
            Err(Serving) => {}
            Err(observed) => {
                tracing::debug!(state = %observed, "Drain requested; nothing to drain");
                return Ok(());
            }
        }
        if let Err(observed) = state.transition(Serving, Draining) {
            // The listener failed between the two checks above.
            tracing::debug!(state = %observed, "Drain requested; nothing to drain");
            return Ok(());
        }

        let started = Instant::now();
        let handle = &self.inner.handle;
        tracing::info!(
            deadline_ms = deadline.as_millis() as u64,
            active_connections = handle.connection_count(),
            "Draining: no longer accepting connections"
        );
        handle.graceful_shutdown(Some(deadline));

        let outcome = match tokio::time::timeout(deadline, wait_idle(handle)).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let forced = handle.connection_count();
                handle.shutdown();
                self.inner.force_close.cancel();
                tracing::warn!(
                    forced_connections = forced,
                    deadline_ms = deadline.as_millis() as u64,
                    "Drain deadline reached; closing remaining connections"
                );
                Err(DrainTimeoutError { deadline, forced })
            }
        };

        if tokio::time::timeout(LISTENER_RELEASE_GRACE, self.inner.released.cancelled())
            .await
            .is_err()
        {
            tracing::warn!("Serve loop did not exit after drain");
        }
        if tokio::time::timeout(LISTENER_RELEASE_GRACE, wait_idle(handle))
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = handle.connection_count(),
                "Connections still open after drain"
            );
        }

        let _ = state.transition(Draining, Stopped);
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            forced = outcome.is_err(),
            "Drain complete"
        );
        outcome
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Wait until the server reaches `state` (or stops).
    pub async fn wait_for_state(&self, state: LifecycleState) -> LifecycleState {
        self.inner.state.wait_for(state).await
    }

    /// Address the listener is bound to, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr.get().copied()
    }

    /// Number of open client connections.
    pub fn active_connections(&self) -> usize {
        self.inner.handle.connection_count()
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .field("active_connections", &self.active_connections())
            .finish()
    }
}

async fn wait_idle(handle: &Handle) {
    while handle.connection_count() > 0 {
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
