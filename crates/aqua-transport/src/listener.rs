//! Listening TCP socket that hands out [`TcpTransport`] connections

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use aqua_core::{PollStrategy, Poller, Result, Timeout, TransportError};

use crate::TcpTransport;

/// Accepting side of a TCP connection
pub struct TcpServer {
    listener: Option<TcpListener>,
    poller: Poller,
}

impl TcpServer {
    /// Listen on all interfaces
    pub fn bind(port: u16) -> Result<Self> {
        Self::bind_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).map_err(|e| TransportError::open(addr.to_string(), e))?;
        listener.set_nonblocking(true)?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener: Some(listener),
            poller: Poller::new(PollStrategy::Yield),
        })
    }

    /// Replace the strategy used while waiting in [`accept`](Self::accept)
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub fn is_open(&self) -> bool {
        self.listener.is_some()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        let listener = self.listener.as_ref().ok_or(TransportError::ClosedHandle)?;
        Ok(listener.local_addr()?)
    }

    /// Wait for a client, `TimedOut` if none connects before the deadline
    pub fn accept(&mut self, timeout: Timeout) -> Result<TcpTransport> {
        let listener = self.listener.as_ref().ok_or(TransportError::ClosedHandle)?;

        let (stream, peer) = self.poller.poll(&timeout.start(), || match listener.accept() {
            Ok(accepted) => Ok(Some(accepted)),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        })?;

        tracing::info!("Accepted connection from {}", peer);
        TcpTransport::from_stream(stream)
    }

    pub fn close(&mut self) {
        if self.listener.take().is_some() {
            tracing::info!("Stopped listening");
        }
    }
}
