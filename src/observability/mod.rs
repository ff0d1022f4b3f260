//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, stderr)
//!     → request spans from the HTTP layer (tower-http TraceLayer)
//! ```

pub mod logging;

pub use logging::init_logging;
