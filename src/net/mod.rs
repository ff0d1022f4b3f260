//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → tls.rs (certificate + key → immutable rustls config)
//!     → listener.rs (bind address, non-blocking socket)
//!     → Hand off to HTTP layer (TLS handshake per accepted connection,
//!       through acceptor.rs so a drain can abort it)
//! ```
//!
//! # Design Decisions
//! - TLS material is loaded exactly once; the result is read-only
//! - Bind errors are reported before the server starts serving

pub mod acceptor;
pub mod listener;
pub mod tls;

pub use acceptor::CancellableAcceptor;
pub use listener::{bind_listener, ListenerBindError};
pub use tls::{load_tls_config, ConfigLoadError};
