//! aqua-transport - Byte-stream transports with bounded reads
//!
//! This crate provides the transport handle abstraction, a timeout-aware
//! reader layered on top of it, a best-effort functional API, and concrete
//! handles for serial lines and TCP sockets.

pub mod functional;
mod listener;
mod mock;
mod reader;
mod serial;
mod tcp;

use aqua_core::Result;

pub use listener::TcpServer;
pub use mock::MockTransport;
pub use reader::{BoundedReader, LineTimeout, ReaderConfig};
pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
pub use tcp::{TcpConfig, TcpTransport};

/// An opened byte-stream endpoint.
///
/// Reads and writes never block: they move whatever the OS can move right
/// now. All waiting is done by [`BoundedReader`]. Every operation on a closed
/// handle fails with `TransportError::ClosedHandle`.
///
/// A handle is owned by one reader/writer at a time; nothing here guards
/// against concurrent use from several threads.
pub trait Transport: Send {
    /// Check if the handle is currently open
    fn is_open(&self) -> bool;

    /// Open (or reopen) the underlying endpoint
    fn open(&mut self) -> Result<()>;

    /// Close the endpoint; closing a closed handle is a no-op
    fn close(&mut self) -> Result<()>;

    /// Write as much of `data` as the OS accepts, returns bytes written
    fn write_once(&mut self, data: &[u8]) -> Result<usize>;

    /// Read at most `buf.len()` bytes, returns 0 when nothing is ready
    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Bytes buffered and ready to read
    fn pending(&mut self) -> Result<usize>;

    /// Discard received but unread bytes
    fn flush_rx(&mut self) -> Result<()>;

    /// Discard or push out bytes queued for transmission
    fn flush_tx(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn write_once(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write_once(data)
    }

    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_once(buf)
    }

    fn pending(&mut self) -> Result<usize> {
        (**self).pending()
    }

    fn flush_rx(&mut self) -> Result<()> {
        (**self).flush_rx()
    }

    fn flush_tx(&mut self) -> Result<()> {
        (**self).flush_tx()
    }
}
