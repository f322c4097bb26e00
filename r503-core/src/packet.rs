//! R503 packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    confirmation::ConfirmationCode,
    constants::START_CODE,
    error::{Error, Result},
    HEADER_SIZE,
};

/// Packet identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Command = 0x01,
    Data = 0x02,
    Ack = 0x07,
    EndData = 0x08,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::EndData),
            _ => Err(Error::UnknownPacketType(value)),
        }
    }
}

/// R503 protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬──────────┬──────────┐
/// │  Start   │ Address  │   Type   │  Length  │ Payload  │ Checksum │
/// │ 2 bytes  │ 4 bytes  │  1 byte  │ 2 bytes  │ N bytes  │ 2 bytes  │
/// │ (0xEF01) │ (BE u32) │          │ (BE u16) │          │ (BE u16) │
/// └──────────┴──────────┴──────────┴──────────┴──────────┴──────────┘
/// ```
///
/// `Length` counts the payload plus the checksum. All multi-byte values
/// are big-endian.
///
/// # Examples
///
/// ```
/// use r503_core::{Command, Packet, DEFAULT_ADDRESS};
///
/// let packet = Packet::command(DEFAULT_ADDRESS, Command::GenImg, &[]);
/// let encoded = packet.encode();
///
/// let decoded = Packet::decode(encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Module address
    pub address: u32,

    /// Packet identifier
    pub packet_type: PacketType,

    /// Instruction + parameters, confirmation code + results, or raw data
    pub payload: Bytes,
}

impl Packet {
    /// Checksum trailer size in bytes
    pub const CHECKSUM_SIZE: usize = 2;

    /// Maximum payload size (largest data packet)
    pub const MAX_PAYLOAD_SIZE: usize = 256;

    /// Create a packet with an arbitrary payload
    pub fn with_payload(address: u32, packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            packet_type,
            payload: payload.into(),
        }
    }

    /// Create a command packet: instruction code followed by its parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use r503_core::{Command, Packet, DEFAULT_ADDRESS};
    ///
    /// let packet = Packet::command(DEFAULT_ADDRESS, Command::Img2Tz, &[1]);
    /// assert_eq!(packet.payload.as_ref(), &[0x02, 0x01]);
    /// ```
    pub fn command(address: u32, command: Command, params: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(1 + params.len());
        payload.put_u8(command.into());
        payload.put_slice(params);

        Self::with_payload(address, PacketType::Command, payload.freeze())
    }

    /// Create an acknowledge packet (what the sensor sends back)
    pub fn ack(address: u32, code: ConfirmationCode, params: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(1 + params.len());
        payload.put_u8(code.into());
        payload.put_slice(params);

        Self::with_payload(address, PacketType::Ack, payload.freeze())
    }

    /// Value of the length field
    pub fn length(&self) -> u16 {
        (self.payload.len() + Self::CHECKSUM_SIZE) as u16
    }

    /// Calculate checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.packet_type as u8, self.length(), &self.payload)
    }

    /// Encode packet to bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use r503_core::{Command, Packet, DEFAULT_ADDRESS};
    ///
    /// let bytes = Packet::command(DEFAULT_ADDRESS, Command::GenImg, &[]).encode();
    /// assert_eq!(
    ///     bytes.as_ref(),
    ///     &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]
    /// );
    /// ```
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u16(START_CODE);
        buf.put_u32(self.address);
        buf.put_u8(self.packet_type as u8);
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        buf
    }

    /// Parse the fixed header and return how many bytes follow it
    /// (payload plus checksum).
    ///
    /// Lets a reader fetch the header first and then exactly the rest.
    pub fn remaining_len(header: &[u8]) -> Result<usize> {
        if header.len() < HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: HEADER_SIZE,
                actual: header.len(),
            });
        }

        let start = BigEndian::read_u16(&header[0..2]);
        if start != START_CODE {
            return Err(Error::InvalidHeader(start));
        }

        let declared = BigEndian::read_u16(&header[7..9]) as usize;
        if declared < Self::CHECKSUM_SIZE {
            return Err(Error::LengthMismatch {
                declared,
                actual: Self::CHECKSUM_SIZE,
            });
        }
        if declared - Self::CHECKSUM_SIZE > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: declared - Self::CHECKSUM_SIZE,
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        Ok(declared)
    }

    /// Decode packet from bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is too short for the header and checksum
    /// - Start code is wrong
    /// - Declared length disagrees with the buffer
    /// - Checksum verification fails
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        let declared = Self::remaining_len(&buf)?;

        let actual = buf.len() - HEADER_SIZE;
        if actual != declared {
            return Err(Error::LengthMismatch { declared, actual });
        }

        buf.advance(2);
        let address = buf.get_u32();
        let packet_type = PacketType::try_from(buf.get_u8())?;
        let length = buf.get_u16();

        let payload_len = length as usize - Self::CHECKSUM_SIZE;
        let payload = buf.split_to(payload_len).freeze();
        let checksum_received = buf.get_u16();

        let packet = Self {
            address,
            packet_type,
            payload,
        };

        let checksum_calculated = packet.checksum();
        if checksum_calculated != checksum_received {
            return Err(Error::ChecksumMismatch {
                expected: checksum_calculated,
                received: checksum_received,
            });
        }

        Ok(packet)
    }

    /// Confirmation code of an acknowledge packet
    pub fn confirmation(&self) -> Option<ConfirmationCode> {
        if self.packet_type != PacketType::Ack {
            return None;
        }
        self.payload.first().map(|code| ConfirmationCode::from(*code))
    }

    /// Result parameters of an acknowledge packet (everything after the
    /// confirmation code)
    pub fn params(&self) -> &[u8] {
        self.payload.get(1..).unwrap_or_default()
    }

    /// Get total packet size
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + Self::CHECKSUM_SIZE
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("address", &format!("0x{:08X}", self.address))
            .field("packet_type", &self.packet_type)
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("payload", &hex::encode(&self.payload))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{:?}](addr=0x{:08X}, len={})",
            self.packet_type,
            self.address,
            self.payload.len()
        )
    }
}
