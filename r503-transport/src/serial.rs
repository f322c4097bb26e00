//! Serial transport

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// Serial transport for R503 sensors
///
/// The module speaks 8N1 at 57600 baud out of the box.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Default baud rate
    pub const DEFAULT_BAUD_RATE: u32 = 57_600;

    /// Create new serial transport
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
            port: None,
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()?;

        // Drop anything left over from a previous session
        port.clear(ClearBuffer::All)?;

        debug!("Opened {}", self.path);

        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        trace!("Sending {} bytes: {}", data.len(), hex::encode(data));

        port.write_all(data)?;
        port.flush()?;

        Ok(())
    }

    fn receive(&mut self, len: usize) -> Result<BytesMut> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        let mut buf = BytesMut::with_capacity(len);
        let mut chunk = [0u8; 64];

        while buf.len() < len {
            let want = (len - buf.len()).min(chunk.len());
            match port.read(&mut chunk[..want]) {
                Ok(0) => {
                    warn!("Received 0 bytes");
                    return Err(Error::ConnectionClosed);
                }
                Ok(n) => buf.put_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    warn!("Read timeout after {:?}", self.read_timeout);
                    return Err(Error::ReadTimeout {
                        expected: len,
                        received: buf.len(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        trace!("Received {} bytes: {}", buf.len(), hex::encode(&buf));

        Ok(buf)
    }

    fn discard_input(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        let stale = port.bytes_to_read().unwrap_or(0);
        if stale > 0 {
            debug!("Discarding {} stale bytes on {}", stale, self.path);
        }

        port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn port_name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            debug!("Serial transport for {} dropped while open", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_transport_create() {
        let transport = SerialTransport::new("/dev/ttyUSB0");
        assert!(!transport.is_open());
        assert_eq!(transport.port_name(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_serial_transport_missing_device() {
        let mut transport = SerialTransport::new("/dev/r503-does-not-exist")
            .with_timeout(Duration::from_millis(100));

        assert!(transport.open().is_err());
        assert!(!transport.is_open());
    }

    #[test]
    fn test_send_requires_open() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0");
        assert!(matches!(transport.send(&[0x01]), Err(Error::NotConnected)));
        assert!(matches!(transport.receive(1), Err(Error::NotConnected)));
        assert!(matches!(transport.discard_input(), Err(Error::NotConnected)));
    }
}
