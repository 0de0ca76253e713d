//! Timeout-aware reads on top of a non-blocking transport handle

use aqua_core::{CancelToken, Deadline, PollStrategy, Poller, Result, Timeout, TransportError};
use bytes::{BufMut, Bytes, BytesMut};

use crate::Transport;

/// Upper bound on the up-front allocation for a line read
const LINE_CAPACITY_HINT: usize = 256;

/// How the timeout passed to [`BoundedReader::read_line`] is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineTimeout {
    /// One deadline for the whole line, armed when the call starts
    #[default]
    WholeLine,
    /// A fresh deadline for every byte; a slow but steady sender never times out
    PerByte,
}

/// Reader configuration
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// What the poll loop does between probes
    pub poll: PollStrategy,
    /// Timeout semantics for line reads
    pub line_timeout: LineTimeout,
    /// Optional token to abort waits from another thread
    pub cancel: Option<CancelToken>,
}

/// Bounded-wait, exact-size and line-delimited reads over a [`Transport`].
///
/// The reader holds no cursor of its own: every call arms its own deadline
/// and everything it has not consumed stays in the handle. It borrows the
/// handle mutably for its lifetime, which keeps a handle to one reader at a
/// time.
pub struct BoundedReader<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    poller: Poller,
    line_timeout: LineTimeout,
}

impl<'a, T: Transport + ?Sized> BoundedReader<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self::with_config(transport, ReaderConfig::default())
    }

    pub fn with_config(transport: &'a mut T, config: ReaderConfig) -> Self {
        let mut poller = Poller::new(config.poll);
        if let Some(cancel) = config.cancel {
            poller = poller.with_cancel(cancel);
        }

        Self {
            transport,
            poller,
            line_timeout: config.line_timeout,
        }
    }

    /// Access the underlying handle
    pub fn transport(&mut self) -> &mut T {
        &mut *self.transport
    }

    fn ensure_open(&self) -> Result<()> {
        if self.transport.is_open() {
            Ok(())
        } else {
            Err(TransportError::ClosedHandle)
        }
    }

    /// Bytes currently buffered and ready to read
    pub fn pending(&mut self) -> Result<usize> {
        self.ensure_open()?;
        self.transport.pending()
    }

    /// Wait until at least `min_bytes` are ready to read.
    ///
    /// Nothing is consumed. With [`Timeout::Forever`] this blocks until the
    /// bytes arrive, however long that takes.
    pub fn wait_available(&mut self, min_bytes: usize, timeout: Timeout) -> Result<()> {
        self.ensure_open()?;
        self.wait_until(min_bytes, &timeout.start())
    }

    fn wait_until(&mut self, min_bytes: usize, deadline: &Deadline) -> Result<()> {
        let transport = &mut *self.transport;
        self.poller.poll(deadline, || {
            Ok((transport.pending()? >= min_bytes).then_some(()))
        })
    }

    /// One read attempt that must fill `dst` completely.
    ///
    /// A short read is not retried: the bytes it did get are consumed and the
    /// call fails with `ShortRead`. Waiting for enough data is the timed
    /// variant's job.
    pub fn read_once_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        if dst.is_empty() {
            return Ok(());
        }

        let actual = self.transport.read_once(dst)?;
        if actual != dst.len() {
            return Err(TransportError::ShortRead {
                expected: dst.len(),
                actual,
            });
        }
        Ok(())
    }

    /// Fill `dst` exactly.
    ///
    /// With `timeout = None` this is [`read_once_exact`](Self::read_once_exact).
    /// Otherwise it first waits for `dst.len()` bytes to be pending and then
    /// reads them in one call.
    pub fn read_exact_into(&mut self, dst: &mut [u8], timeout: Option<Timeout>) -> Result<()> {
        if let Some(timeout) = timeout {
            self.wait_available(dst.len(), timeout)?;
        }
        self.read_once_exact(dst)
    }

    /// Read exactly `size` bytes, see [`read_exact_into`](Self::read_exact_into)
    pub fn read_exact(&mut self, size: usize, timeout: Option<Timeout>) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(size);
        self.read_exact_into(&mut buf, timeout)?;
        Ok(buf.freeze())
    }

    /// Read one line terminated by `end_marker`, marker included.
    ///
    /// Bytes are pulled one at a time, so nothing past the marker is
    /// consumed. Fails with `LineTooLong` once `max_size` bytes have been
    /// read without a match, and with `TimedOut` according to the configured
    /// [`LineTimeout`]. Bytes of a failed line are consumed and dropped.
    pub fn read_line(
        &mut self,
        max_size: usize,
        end_marker: &[u8],
        timeout: Timeout,
    ) -> Result<Bytes> {
        if end_marker.is_empty() {
            return Err(TransportError::EmptyEndMarker);
        }
        self.ensure_open()?;

        let line_deadline = timeout.start();
        let mut line = BytesMut::with_capacity(max_size.min(LINE_CAPACITY_HINT));
        let mut byte = [0u8; 1];

        while line.len() < max_size {
            match self.line_timeout {
                LineTimeout::WholeLine => self.wait_until(1, &line_deadline)?,
                LineTimeout::PerByte => self.wait_until(1, &timeout.start())?,
            }
            self.read_once_exact(&mut byte)?;
            line.put_u8(byte[0]);

            if line.ends_with(end_marker) {
                return Ok(line.freeze());
            }
        }

        tracing::debug!("line exceeded {} bytes without end marker", max_size);
        Err(TransportError::LineTooLong { max: max_size })
    }

    /// Write all of `data` in one call, `ShortWrite` if the OS took less
    pub fn write_all_once(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let actual = self.transport.write_once(data)?;
        if actual != data.len() {
            return Err(TransportError::ShortWrite {
                expected: data.len(),
                actual,
            });
        }
        Ok(())
    }
}
