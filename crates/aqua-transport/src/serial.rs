//! Serial line transport built on the serialport crate

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use aqua_core::{Result, TransportError};
use serialport::{ClearBuffer, SerialPort};

use crate::Transport;

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

/// Flow control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(data_bits: DataBits) -> Self {
        match data_bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow_control: FlowControl) -> Self {
        match flow_control {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Serial port configuration
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g. "/dev/ttyUSB0", "COM3")
    pub path: String,
    /// Baud rate (e.g. 9600, 115200)
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Upper bound on a single OS read or write call; zero returns at once
    pub io_timeout: Duration,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            ..Default::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            baud_rate: 115_200,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
            io_timeout: Duration::ZERO,
        }
    }
}

/// Serial transport for UART communication
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open and configure a serial port
    pub fn open(config: SerialConfig) -> Result<Self> {
        let mut transport = Self::unopened(config);
        Transport::open(&mut transport)?;
        Ok(transport)
    }

    /// Create a closed handle; bring it up later with `Transport::open`
    pub fn unopened(config: SerialConfig) -> Self {
        Self { config, port: None }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::ClosedHandle)
    }
}

impl Transport for SerialTransport {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }

        let config = &self.config;
        let port = serialport::new(config.path.as_str(), config.baud_rate)
            .data_bits(config.data_bits.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .flow_control(config.flow_control.into())
            .timeout(config.io_timeout)
            .open()
            .map_err(|e| TransportError::open(config.path.as_str(), e))?;

        tracing::info!(
            "Opened serial port: {} at {} baud",
            config.path,
            config.baud_rate
        );
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            tracing::info!("Closed serial port: {}", self.config.path);
        }
        Ok(())
    }

    fn write_once(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port()?;
        if data.is_empty() {
            return Ok(0);
        }
        match port.write(data) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port()?.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn pending(&mut self) -> Result<usize> {
        let count = self
            .port()?
            .bytes_to_read()
            .map_err(std::io::Error::from)?;
        Ok(count as usize)
    }

    fn flush_rx(&mut self) -> Result<()> {
        self.port()?
            .clear(ClearBuffer::Input)
            .map_err(std::io::Error::from)?;
        Ok(())
    }

    fn flush_tx(&mut self) -> Result<()> {
        self.port()?
            .clear(ClearBuffer::Output)
            .map_err(std::io::Error::from)?;
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        let _ = Transport::close(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_PORT: &str = "/dev/aqua-no-such-port";

    #[test]
    fn test_default_config() {
        let config = SerialConfig::new("/dev/ttyUSB0", 9600);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.io_timeout, Duration::ZERO);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialTransport::open(SerialConfig::new(MISSING_PORT, 9600));
        match result {
            Err(TransportError::Open { target, source }) => {
                assert_eq!(target, MISSING_PORT);
                assert!(source.downcast_ref::<serialport::Error>().is_some());
            }
            other => panic!("expected open failure, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_unopened_handle_is_closed() {
        let mut transport = SerialTransport::unopened(SerialConfig::new(MISSING_PORT, 9600));
        assert!(!transport.is_open());
        assert!(matches!(transport.pending(), Err(TransportError::ClosedHandle)));
        assert!(matches!(
            transport.read_once(&mut [0u8; 4]),
            Err(TransportError::ClosedHandle)
        ));
        assert!(matches!(transport.flush_rx(), Err(TransportError::ClosedHandle)));
        // Closing twice is harmless
        transport.close().unwrap();
        transport.close().unwrap();
    }
}
