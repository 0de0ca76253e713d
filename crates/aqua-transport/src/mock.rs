//! Mock transport for testing

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use aqua_core::{Result, TransportError};

use crate::Transport;

/// An in-memory transport handle with scripted input.
///
/// Clones share state, so a test can keep one clone to feed bytes and inspect
/// counters while a reader owns another.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    open: bool,
    read_buffer: VecDeque<u8>,
    scheduled: Vec<(Instant, Vec<u8>)>,
    written: Vec<u8>,
    read_chunk: Option<usize>,
    write_limit: Option<usize>,
    fail_io: bool,
    fail_open: bool,
    fail_close: bool,
    open_calls: usize,
    close_calls: usize,
    read_calls: usize,
    write_calls: usize,
    flush_rx_calls: usize,
    flush_tx_calls: usize,
}

fn injected(message: &str) -> TransportError {
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string()).into()
}

impl MockTransportInner {
    /// Move scheduled bytes whose arrival time has passed into the read buffer
    fn deliver_due(&mut self) {
        if self.scheduled.is_empty() {
            return;
        }
        let now = Instant::now();
        let mut index = 0;
        while index < self.scheduled.len() {
            if self.scheduled[index].0 <= now {
                let (_, data) = self.scheduled.remove(index);
                self.read_buffer.extend(data);
            } else {
                index += 1;
            }
        }
    }

    fn check_io(&self) -> Result<()> {
        if !self.open {
            return Err(TransportError::ClosedHandle);
        }
        if self.fail_io {
            return Err(injected("injected I/O failure"));
        }
        Ok(())
    }
}

impl MockTransport {
    /// Create an open mock transport with nothing queued
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                open: true,
                ..Default::default()
            })),
        }
    }

    /// Create a mock transport that starts closed
    pub fn closed() -> Self {
        let mock = Self::new();
        mock.lock().open = false;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make bytes readable right away
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().read_buffer.extend(data);
    }

    /// Make bytes readable once `delay` has passed
    pub fn inject_read_after(&self, delay: Duration, data: &[u8]) {
        self.lock()
            .scheduled
            .push((Instant::now() + delay, data.to_vec()));
    }

    /// Cap how many bytes a single `read_once` returns
    pub fn set_read_chunk(&self, chunk: Option<usize>) {
        self.lock().read_chunk = chunk;
    }

    /// Cap how many bytes a single `write_once` accepts
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.lock().write_limit = limit;
    }

    /// Fail reads, writes, flushes and pending queries with an I/O error
    pub fn set_fail_io(&self, fail: bool) {
        self.lock().fail_io = fail;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Get all written data
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Bytes that have arrived and not been read yet
    pub fn queued(&self) -> usize {
        let mut inner = self.lock();
        inner.deliver_due();
        inner.read_buffer.len()
    }

    pub fn open_calls(&self) -> usize {
        self.lock().open_calls
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn read_calls(&self) -> usize {
        self.lock().read_calls
    }

    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    pub fn flush_rx_calls(&self) -> usize {
        self.lock().flush_rx_calls
    }

    pub fn flush_tx_calls(&self) -> usize {
        self.lock().flush_tx_calls
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn open(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.open_calls += 1;
        if inner.fail_open {
            return Err(TransportError::open("mock", "injected open failure"));
        }
        inner.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.close_calls += 1;
        if inner.fail_close {
            return Err(injected("injected close failure"));
        }
        inner.open = false;
        Ok(())
    }

    fn write_once(&mut self, data: &[u8]) -> Result<usize> {
        let mut inner = self.lock();
        inner.check_io()?;
        inner.write_calls += 1;
        let accepted = inner.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        inner.written.extend_from_slice(&data[..accepted]);
        Ok(accepted)
    }

    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        inner.check_io()?;
        inner.read_calls += 1;
        inner.deliver_due();

        let limit = inner.read_chunk.map_or(buf.len(), |chunk| chunk.min(buf.len()));
        let count = inner.read_buffer.len().min(limit);
        for (slot, byte) in buf.iter_mut().zip(inner.read_buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn pending(&mut self) -> Result<usize> {
        let mut inner = self.lock();
        inner.check_io()?;
        inner.deliver_due();
        Ok(inner.read_buffer.len())
    }

    fn flush_rx(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.check_io()?;
        inner.flush_rx_calls += 1;
        inner.deliver_due();
        inner.read_buffer.clear();
        Ok(())
    }

    fn flush_tx(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.check_io()?;
        inner.flush_tx_calls += 1;
        Ok(())
    }
}
