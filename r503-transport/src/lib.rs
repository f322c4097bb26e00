//! Transport layer for the R503 protocol
//!
//! Provides blocking serial communication with the sensor.

pub mod discovery;
pub mod error;
pub mod serial;

pub use discovery::discover_port;
pub use error::{Error, Result};
pub use serial::SerialTransport;

use bytes::BytesMut;

/// Transport trait for different communication methods
pub trait Transport: Send {
    /// Open the link to the sensor
    fn open(&mut self) -> Result<()>;

    /// Close the link
    fn close(&mut self) -> Result<()>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Send raw bytes
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive exactly `len` bytes (bounded by the read timeout)
    fn receive(&mut self, len: usize) -> Result<BytesMut>;

    /// Drop bytes that arrived but were never read, e.g. a reply that
    /// showed up after its read timed out
    fn discard_input(&mut self) -> Result<()>;

    /// Get device path
    fn port_name(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn receive(&mut self, len: usize) -> Result<BytesMut> {
        (**self).receive(len)
    }

    fn discard_input(&mut self) -> Result<()> {
        (**self).discard_input()
    }

    fn port_name(&self) -> String {
        (**self).port_name()
    }
}
