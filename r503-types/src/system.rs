//! System parameters reported by `ReadSysPara`

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Status register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u16 {
        /// Sensor is executing a command
        const BUSY = 1 << 0;
        /// A matching finger was found
        const PASS = 1 << 1;
        /// Handshake password verified
        const PASSWORD_OK = 1 << 2;
        /// Image buffer holds a valid image
        const IMAGE_VALID = 1 << 3;
    }
}

/// System status and configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemParameters {
    pub status: StatusFlags,

    /// Constant 0x0009 on genuine modules
    pub system_id: u16,

    /// Number of model slots in the flash library
    pub library_size: u16,

    /// Matching threshold [1-5]
    pub security_level: u16,

    pub device_address: u32,

    /// Data packet size in bytes (decoded from the 0-3 size code)
    pub packet_size: u16,

    pub baud_rate: u32,
}

impl SystemParameters {
    /// Decode the packet size code into bytes (32 << code)
    pub fn packet_size_from_code(code: u16) -> u16 {
        32u16 << code.min(3)
    }
}

impl fmt::Display for SystemParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sensor[addr: 0x{:08X}, library: {}, security: {}, baud: {}]",
            self.device_address, self.library_size, self.security_level, self.baud_rate
        )
    }
}
