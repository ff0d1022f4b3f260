//! OS signal handling.
//!
//! # Responsibilities
//! - Register termination handlers (SIGTERM, SIGINT) up front
//! - Translate both into a single termination event
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed when the listener is created, not when it is
//!   first polled, so a signal that arrives during startup is not lost
//! - SIGKILL cannot be caught on any platform; a "kill" request reaches the
//!   process as SIGTERM or not at all

use std::fmt;
use std::io;

/// Which notification asked the process to stop. Both are handled the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Interrupt => f.write_str("SIGINT"),
            Termination::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Registered interest in termination notifications.
pub struct TerminationListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(not(unix))]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl TerminationListener {
    /// Install the handlers. Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Install the handlers. Must be called from within a Tokio runtime.
    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for the next termination notification.
    ///
    /// Returns `None` if the runtime's signal driver has gone away.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<Termination> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|_| Termination::Interrupt),
            received = self.terminate.recv() => received.map(|_| Termination::Terminate),
        }
    }

    /// Wait for the next termination notification.
    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Option<Termination> {
        self.ctrl_c.recv().await.map(|_| Termination::Interrupt)
    }
}

impl fmt::Debug for TerminationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminationListener").finish_non_exhaustive()
    }
}
