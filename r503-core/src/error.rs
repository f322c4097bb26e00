//! Error types for r503-core

/// Result type alias for r503 protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Packet is too short to be valid
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Start code is not 0xEF01
    #[error("Invalid packet header: 0x{0:04X}")]
    InvalidHeader(u16),

    /// Declared length disagrees with the bytes received
    #[error("Length mismatch: header declares {declared} bytes, got {actual} bytes")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Unknown packet identifier
    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Unknown instruction code
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Reply came from another module address
    #[error("Address mismatch: expected 0x{expected:08X}, got 0x{actual:08X}")]
    AddressMismatch {
        expected: u32,
        actual: u32,
    },

    /// Acknowledge packet carried no confirmation code, or too few parameter bytes
    #[error("Malformed acknowledge for {command}: {reason}")]
    MalformedAck {
        command: crate::command::Command,
        reason: String,
    },

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}
