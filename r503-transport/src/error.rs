//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,
    
    #[error("Already connected")]
    AlreadyConnected,
    
    #[error("Read timeout after {received} of {expected} bytes")]
    ReadTimeout {
        expected: usize,
        received: usize,
    },
    
    #[error("Connection closed by device")]
    ConnectionClosed,
    
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("No serial devices match {0}")]
    NoSerialPorts(String),
}
