//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load TLS → Register signals → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Termination received → Drain (bounded) → Report outcome → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → single termination event
//!
//! State (state.rs):
//!     Starting → Serving → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - Signal handlers are registered before the listener is bound
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a deadline: forced close after it, never a retry

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::ShutdownCoordinator;
pub use signals::{Termination, TerminationListener};
pub use startup::{run, run_until, RunOutcome, StartupError};
pub use state::{LifecycleState, StateCell};
