//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve and bind the configured `host:port` address
//! - Report bind failures distinctly from later serving failures
//!
//! The socket is bound synchronously so that a bind failure surfaces before
//! the server reports itself as serving.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use thiserror::Error;

/// Error type for listener binding.
#[derive(Debug, Error)]
pub enum ListenerBindError {
    /// The address could not be parsed or resolved.
    #[error("invalid listen address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Bind a non-blocking listener on `address`, returning it with the address
/// actually bound (which differs from `address` for port 0).
///
/// Host names are resolved; each resolved address is tried in turn and the
/// last bind failure is reported.
pub fn bind_listener(address: &str) -> Result<(TcpListener, SocketAddr), ListenerBindError> {
    let invalid = |source| ListenerBindError::InvalidAddress {
        address: address.to_string(),
        source,
    };
    let candidates: Vec<SocketAddr> = address.to_socket_addrs().map_err(invalid)?.collect();
    if candidates.is_empty() {
        return Err(invalid(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "host resolved to no addresses",
        )));
    }

    let mut last_error = None;
    for addr in candidates {
        match bind_one(addr) {
            Ok(bound) => {
                tracing::info!(address = %bound.1, requested = address, "Listener bound");
                return Ok(bound);
            }
            Err(e) => {
                tracing::debug!(address = %addr, error = %e, "Bind attempt failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| invalid(io::ErrorKind::AddrNotAvailable.into())))
}

fn bind_one(addr: SocketAddr) -> Result<(TcpListener, SocketAddr), ListenerBindError> {
    let bind_error = |source| ListenerBindError::Bind {
        address: addr,
        source,
    };

    let listener = TcpListener::bind(addr).map_err(bind_error)?;
    listener.set_nonblocking(true).map_err(bind_error)?;
    let local_addr = listener.local_addr().map_err(bind_error)?;
    Ok((listener, local_addr))
}
