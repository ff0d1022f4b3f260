//! TLS webhook server with bounded graceful shutdown.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::{DrainTimeoutError, HttpServer, ServeError};
pub use lifecycle::{LifecycleState, ShutdownCoordinator};
pub use net::ConfigLoadError;
