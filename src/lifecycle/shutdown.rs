//! Shutdown coordination for the server.
//!
//! A single coordinator task waits on a [`CancellationToken`]. Whoever cancels
//! it (a termination signal, an embedding application, a test) starts the one
//! and only drain; the coordinator then resolves with the drain outcome.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::http::server::{DrainOutcome, HttpServer};
use crate::lifecycle::signals::TerminationListener;

/// Bridges termination requests into one bounded drain of an [`HttpServer`].
#[derive(Debug)]
pub struct ShutdownCoordinator {
    trigger: CancellationToken,
    task: JoinHandle<DrainOutcome>,
}

impl ShutdownCoordinator {
    /// Spawn the coordinator. It does nothing until triggered.
    pub fn spawn(server: HttpServer, drain_timeout: Duration) -> Self {
        let trigger = CancellationToken::new();
        let requested = trigger.clone();

        let task = tokio::spawn(async move {
            requested.cancelled().await;
            tracing::info!(
                drain_timeout_secs = drain_timeout.as_secs_f64(),
                active_connections = server.active_connections(),
                "Shutdown requested; draining"
            );

            let outcome = server.drain(drain_timeout).await;
            match &outcome {
                Ok(()) => tracing::info!("All connections closed before the deadline"),
                Err(e) => tracing::warn!(error = %e, "Drain timed out"),
            }
            outcome
        });

        Self { trigger, task }
    }

    /// Forward the first termination notification from `listener` as the
    /// shutdown trigger. Later notifications are logged and ignored.
    pub fn listen_for(&self, mut listener: TerminationListener) {
        let trigger = self.trigger.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = trigger.cancelled() => {}
                received = listener.recv() => match received {
                    Some(signal) => {
                        tracing::info!(%signal, "Termination signal received");
                        trigger.cancel();
                    }
                    None => {
                        tracing::warn!("Signal stream closed; shutdown must be triggered another way");
                        return;
                    }
                },
            }

            // Keep the handlers installed so a repeated signal cannot kill the
            // process halfway through the drain.
            while let Some(signal) = listener.recv().await {
                tracing::info!(%signal, "Shutdown already in progress; ignoring signal");
            }
        });
    }

    /// Trigger shutdown once `signal` resolves.
    pub fn trigger_on<F>(&self, signal: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let trigger = self.trigger.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = trigger.cancelled() => {}
                _ = signal => trigger.cancel(),
            }
        });
    }

    /// Trigger shutdown now. Idempotent.
    pub fn trigger(&self) {
        self.trigger.cancel();
    }

    /// Token that starts the drain when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.trigger.clone()
    }

    /// Wait for the drain to finish and return its outcome.
    ///
    /// Never fails: if the coordinator task itself died the failure is logged
    /// and treated as a completed drain, so the process can still exit.
    pub async fn wait(self) -> DrainOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Shutdown coordinator task failed");
                Ok(())
            }
        }
    }
}
