//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection (accepted by server.rs)
//!     → request.rs (request ID, trace span)
//!     → injected router (routes.rs by default)
//!     → response (request ID echoed)
//! ```

pub mod request;
pub mod routes;
pub mod server;

pub use request::{with_request_tracing, UuidRequestId, X_REQUEST_ID};
pub use server::{DrainOutcome, DrainTimeoutError, HttpServer, ServeError};
