//! Protocol constants

/// Packet start code
pub const START_CODE: u16 = 0xEF01;

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Baud rate multiplier used by `ReadSysPara`
pub const BAUD_UNIT: u32 = 9_600;

/// Default read timeout (milliseconds)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;

/// Default aura LED speed when a signal carries none
pub const DEFAULT_LED_SPEED: u8 = 0x80;

/// Slots covered by one index-table page
pub const INDEX_PAGE_SLOTS: u16 = 256;

/// Bitmap bytes in one index-table page
pub const INDEX_PAGE_BYTES: usize = 32;

/// Character buffers used for templating
pub mod buffers {
    /// First scan / search buffer
    pub const CHAR_BUFFER_1: u8 = 1;

    /// Second scan buffer
    pub const CHAR_BUFFER_2: u8 = 2;
}
