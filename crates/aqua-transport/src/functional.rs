//! Best-effort functional API.
//!
//! These free functions never return errors. Reads report failure through an
//! unavailable [`ResultBuffer`]; everything else returns the handle so calls
//! chain, and logs what went wrong at `warn` level. This tier is
//! deliberately lossy: use [`BoundedReader`](crate::BoundedReader) when the
//! reason for a failure matters.
//!
//! ```no_run
//! use aqua_transport::{functional, SerialConfig, SerialTransport};
//!
//! let mut port = SerialTransport::unopened(SerialConfig::new("/dev/ttyUSB0", 115_200));
//! let reply = functional::read(functional::up(&mut port), 4);
//! functional::write(&mut port, &reply);
//! ```

use aqua_core::ResultBuffer;

use crate::reader::BoundedReader;
use crate::Transport;

/// Read exactly `length` bytes in a single attempt.
///
/// Unavailable if the handle is closed, the read fails, or fewer than
/// `length` bytes were obtained.
pub fn read<T: Transport + ?Sized>(transport: &mut T, length: usize) -> ResultBuffer {
    if !transport.is_open() {
        return ResultBuffer::unavailable();
    }

    let mut buffer = ResultBuffer::sized(length);
    let outcome = match buffer.as_mut_slice() {
        Ok(dst) => BoundedReader::new(transport).read_once_exact(dst),
        Err(_) => return ResultBuffer::unavailable(),
    };

    match outcome {
        Ok(()) => buffer,
        Err(e) => {
            tracing::debug!("functional read of {} bytes failed: {}", length, e);
            buffer.invalidate();
            buffer
        }
    }
}

/// Write the whole buffer once.
///
/// Does nothing when the handle is closed or the buffer is unavailable. A
/// short write or I/O failure is logged and otherwise ignored.
pub fn write<'a, T: Transport + ?Sized>(transport: &'a mut T, buffer: &ResultBuffer) -> &'a mut T {
    if !transport.is_open() {
        return transport;
    }
    let Ok(data) = buffer.as_slice() else {
        return transport;
    };

    match transport.write_once(data) {
        Ok(written) if written != data.len() => {
            tracing::warn!("short write ignored: {} of {} bytes", written, data.len());
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("write failed: {}", e),
    }
    transport
}

/// Discard received bytes; failures are logged and ignored
pub fn flush_rx<T: Transport + ?Sized>(transport: &mut T) -> &mut T {
    if transport.is_open() {
        if let Err(e) = transport.flush_rx() {
            tracing::warn!("cannot flush receive buffer: {}", e);
        }
    }
    transport
}

/// Discard queued transmit bytes; failures are logged and ignored
pub fn flush_tx<T: Transport + ?Sized>(transport: &mut T) -> &mut T {
    if transport.is_open() {
        if let Err(e) = transport.flush_tx() {
            tracing::warn!("cannot flush transmit buffer: {}", e);
        }
    }
    transport
}

/// Open the handle unless it already is
pub fn up<T: Transport + ?Sized>(transport: &mut T) -> &mut T {
    if !transport.is_open() {
        if let Err(e) = transport.open() {
            tracing::warn!("bring-up failed: {}", e);
        }
    }
    transport
}

/// Close the handle unless it already is
pub fn down<T: Transport + ?Sized>(transport: &mut T) -> &mut T {
    if transport.is_open() {
        if let Err(e) = transport.close() {
            tracing::warn!("shutdown failed: {}", e);
        }
    }
    transport
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockTransport;
    use aqua_core::InvalidAccess;

    #[test]
    fn test_read_queued_bytes() {
        let mut transport = MockTransport::new();
        transport.inject_read(b"abcdef");

        let first = read(&mut transport, 3);
        assert_eq!(first.as_slice().unwrap(), b"abc");

        let second = read(&mut transport, 3);
        assert_eq!(second.as_slice().unwrap(), b"def");
    }

    #[test]
    fn test_read_closed_is_unavailable() {
        let mut transport = MockTransport::closed();
        let buffer = read(&mut transport, 4);
        assert!(!buffer.is_available());
        assert_eq!(buffer.as_slice(), Err(InvalidAccess));
        assert_eq!(transport.read_calls(), 0);
    }

    #[test]
    fn test_read_short_is_unavailable() {
        let mut transport = MockTransport::new();
        transport.inject_read(b"ab");
        let buffer = read(&mut transport, 4);
        assert!(!buffer.is_available());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer, ResultBuffer::unavailable());
    }

    #[test]
    fn test_read_io_failure_is_unavailable() {
        let mut transport = MockTransport::new();
        transport.inject_read(b"abcd");
        transport.set_fail_io(true);
        assert!(!read(&mut transport, 4).is_available());
    }

    #[test]
    fn test_write_unavailable_is_noop() {
        let mut transport = MockTransport::new();
        write(&mut transport, &ResultBuffer::unavailable());
        assert_eq!(transport.write_calls(), 0);
        assert!(transport.written().is_empty());
    }

    #[test]
    fn test_write_closed_is_noop() {
        let mut transport = MockTransport::closed();
        write(&mut transport, &ResultBuffer::from_slice(b"data"));
        assert_eq!(transport.write_calls(), 0);
    }

    #[test]
    fn test_write_short_is_ignored() {
        let mut transport = MockTransport::new();
        transport.set_write_limit(Some(2));
        let returned = write(&mut transport, &ResultBuffer::from_slice(b"data"));
        assert!(returned.is_open());
        assert_eq!(transport.written(), b"da");
    }

    #[test]
    fn test_read_then_write_chain() {
        let mut input = MockTransport::new();
        let mut output = MockTransport::new();
        input.inject_read(b"xy");

        let buffer = read(&mut input, 2);
        write(flush_tx(&mut output), &buffer);
        assert_eq!(output.written(), b"xy");

        // A failed read turns the write into a no-op
        let buffer = read(&mut input, 2);
        write(&mut output, &buffer);
        assert_eq!(output.write_calls(), 1);
    }

    #[test]
    fn test_flush_swallows_failures() {
        let mut transport = MockTransport::new();
        transport.inject_read(b"junk");
        flush_rx(&mut transport);
        assert_eq!(transport.queued(), 0);

        transport.set_fail_io(true);
        assert!(flush_rx(&mut transport).is_open());
        assert!(flush_tx(&mut transport).is_open());
    }

    #[test]
    fn test_flush_closed_is_noop() {
        let mut transport = MockTransport::closed();
        flush_rx(&mut transport);
        flush_tx(&mut transport);
        assert_eq!(transport.flush_rx_calls(), 0);
        assert_eq!(transport.flush_tx_calls(), 0);
    }

    #[test]
    fn test_up_is_idempotent() {
        let mut transport = MockTransport::new();
        up(&mut transport);
        assert_eq!(transport.open_calls(), 0);

        let mut transport = MockTransport::closed();
        up(up(&mut transport));
        assert!(transport.is_open());
        assert_eq!(transport.open_calls(), 1);
    }

    #[test]
    fn test_up_swallows_open_failure() {
        let mut transport = MockTransport::closed();
        transport.set_fail_open(true);
        assert!(!up(&mut transport).is_open());
    }

    #[test]
    fn test_down_is_idempotent() {
        let mut transport = MockTransport::new();
        down(down(&mut transport));
        assert!(!transport.is_open());
        assert_eq!(transport.close_calls(), 1);
    }

    #[test]
    fn test_down_swallows_close_failure() {
        let mut transport = MockTransport::new();
        transport.set_fail_close(true);
        assert!(down(&mut transport).is_open());
    }
}
