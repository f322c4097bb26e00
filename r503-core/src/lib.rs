//! # r503-core
//!
//! Core protocol implementation for R503-family fingerprint sensors.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure and encoding/decoding
//! - Checksum calculation
//! - Instruction and confirmation code definitions
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod confirmation;
pub mod constants;
pub mod error;
pub mod packet;

pub use command::Command;
pub use confirmation::ConfirmationCode;
pub use error::{Error, Result};
pub use packet::{Packet, PacketType};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.2";

/// Default module address (broadcast)
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Default handshake password
pub const DEFAULT_PASSWORD: u32 = 0x0000_0000;

/// Packet header size: start code, address, type, length
pub const HEADER_SIZE: usize = 9;
