//! TCP stream transport

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use aqua_core::{Result, TransportError};

use crate::Transport;

/// Scratch size used when draining the receive queue
const DRAIN_CHUNK: usize = 4096;

/// TCP client configuration
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Host name or address literal
    pub host: String,
    pub port: u16,
    /// Bound on each connect attempt; `None` leaves it to the OS
    pub connect_timeout: Option<Duration>,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl TcpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            connect_timeout: Some(Duration::from_secs(5)),
            nodelay: true,
        }
    }
}

/// Non-blocking TCP stream transport
pub struct TcpTransport {
    config: Option<TcpConfig>,
    peer: String,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Resolve and connect
    pub fn connect(config: TcpConfig) -> Result<Self> {
        let mut transport = Self::unopened(config);
        Transport::open(&mut transport)?;
        Ok(transport)
    }

    /// Create a closed handle that connects on `Transport::open`
    pub fn unopened(config: TcpConfig) -> Self {
        Self {
            peer: format!("{}:{}", config.host, config.port),
            config: Some(config),
            stream: None,
        }
    }

    /// Wrap an already-connected stream (e.g. one returned by accept).
    ///
    /// Such a handle cannot be reopened after it is closed.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown peer".to_string());

        Ok(Self {
            config: None,
            peer,
            stream: Some(stream),
        })
    }

    /// Address of the remote end, as text
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::ClosedHandle)
    }

    fn dial(config: &TcpConfig) -> io::Result<TcpStream> {
        let mut last_error = None;
        for addr in (config.host.as_str(), config.port).to_socket_addrs()? {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }
}

#[cfg(unix)]
fn readable_bytes(stream: &TcpStream) -> io::Result<usize> {
    use std::os::unix::io::AsRawFd;

    let mut count: libc::c_int = 0;
    // SAFETY: FIONREAD stores one c_int through the pointer, which outlives the call
    let rc = unsafe { libc::ioctl(stream.as_raw_fd(), libc::FIONREAD, &mut count) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(count.max(0) as usize)
}

#[cfg(windows)]
fn readable_bytes(stream: &TcpStream) -> io::Result<usize> {
    use std::os::windows::io::AsRawSocket;
    use windows_sys::Win32::Networking::WinSock::{ioctlsocket, FIONREAD, SOCKET};

    let mut count: u32 = 0;
    // SAFETY: FIONREAD stores one u32 through the pointer, which outlives the call
    let rc = unsafe { ioctlsocket(stream.as_raw_socket() as SOCKET, FIONREAD, &mut count) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(count as usize)
}

impl Transport for TcpTransport {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let Some(config) = self.config.as_ref() else {
            return Err(TransportError::open(
                self.peer.as_str(),
                "accepted stream cannot be reopened",
            ));
        };

        let stream =
            Self::dial(config).map_err(|e| TransportError::open(self.peer.as_str(), e))?;
        stream.set_nonblocking(true)?;
        stream.set_nodelay(config.nodelay)?;

        tracing::info!("Connected to {}", self.peer);
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone
            let _ = stream.shutdown(Shutdown::Both);
            tracing::info!("Closed connection to {}", self.peer);
        }
        Ok(())
    }

    fn write_once(&mut self, data: &[u8]) -> Result<usize> {
        let stream = self.stream()?;
        if data.is_empty() {
            return Ok(0);
        }
        match stream.write(data) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream()?;
        if buf.is_empty() {
            return Ok(0);
        }
        match stream.read(buf) {
            Ok(0) => Err(TransportError::Disconnected),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn pending(&mut self) -> Result<usize> {
        Ok(readable_bytes(self.stream()?)?)
    }

    fn flush_rx(&mut self) -> Result<()> {
        let stream = self.stream()?;
        let mut scratch = [0u8; DRAIN_CHUNK];
        let mut drained = 0;
        loop {
            match stream.read(&mut scratch) {
                Ok(0) => break,
                Ok(n) => drained += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        tracing::debug!("Discarded {} received bytes from {}", drained, self.peer);
        Ok(())
    }

    fn flush_tx(&mut self) -> Result<()> {
        self.stream()?.flush()?;
        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        let _ = Transport::close(self);
    }
}
