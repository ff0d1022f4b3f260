//! Connection acceptor that can be aborted mid-handshake.
//!
//! axum-server stops connections through its `Handle` only once they have
//! been accepted; a client that opens a socket and never finishes the TLS
//! handshake sits inside the acceptor until rustls's own handshake timeout.
//! Wrapping the acceptor lets the drain deadline close those sockets too.

use axum_server::accept::Accept;
use std::future::Future;
use std::io;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

type AcceptFuture<St, Sv> = Pin<Box<dyn Future<Output = io::Result<(St, Sv)>> + Send>>;

/// Races the wrapped acceptor against `cancel`.
///
/// Once `cancel` fires, every pending accept fails with
/// `ConnectionAborted` and its socket is dropped.
#[derive(Clone, Debug)]
pub struct CancellableAcceptor<A> {
    inner: A,
    cancel: CancellationToken,
}

impl<A> CancellableAcceptor<A> {
    pub fn new(inner: A, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }
}

impl<A, I, S> Accept<I, S> for CancellableAcceptor<A>
where
    A: Accept<I, S>,
    A::Future: Send + 'static,
    A::Stream: Send + 'static,
    A::Service: Send + 'static,
{
    type Stream = A::Stream;
    type Service = A::Service;
    type Future = AcceptFuture<A::Stream, A::Service>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let accept = self.inner.accept(stream, service);
        let cancel = self.cancel.clone();

        Box::pin(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "connection closed before the handshake completed",
                )),
                accepted = accept => accepted,
            }
        })
    }
}
