//! Packet checksum
//!
//! From the datasheet: the arithmetic sum of the packet identifier, the
//! two length bytes and every payload byte, truncated to 16 bits. The
//! start code and address are not covered.

use tracing::trace;

/// Calculate packet checksum
///
/// # Examples
///
/// ```
/// use r503_core::checksum;
///
/// // GenImg command packet: type 0x01, length 3, instruction 0x01
/// assert_eq!(checksum::calculate(0x01, 3, &[0x01]), 0x0005);
/// ```
pub fn calculate(packet_type: u8, length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = length.to_be_bytes();

    let checksum = payload
        .iter()
        .fold(
            u16::from(packet_type)
                .wrapping_add(u16::from(len_hi))
                .wrapping_add(u16::from(len_lo)),
            |sum, byte| sum.wrapping_add(u16::from(*byte)),
        );

    trace!(
        packet_type = packet_type,
        length = length,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(packet_type: u8, length: u16, payload: &[u8], expected: u16) -> bool {
    calculate(packet_type, length, payload) == expected
}
