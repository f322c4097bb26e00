//! Fingerprint sensor over a byte transport

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;
use tracing::{debug, info, trace};

use r503_core::{
    constants::{self, buffers},
    Command, ConfirmationCode, Packet, PacketType, DEFAULT_ADDRESS, DEFAULT_PASSWORD, HEADER_SIZE,
};
use r503_transport::Transport;
use r503_types::{LedSignal, SearchHit, SlotId, StatusFlags, SystemParameters};

use crate::error::{Error, Result};
use crate::link::{CharBuffer, SensorLink};

/// R503 sensor
///
/// Speaks the packet protocol over any [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use r503::{FingerprintSensor, SensorLink};
/// use r503_transport::SerialTransport;
///
/// fn main() -> r503::Result<()> {
///     let mut sensor = FingerprintSensor::new(SerialTransport::new("/dev/ttyUSB0"));
///     sensor.connect()?;
///
///     println!("{} templates stored", sensor.count_templates()?);
///
///     sensor.disconnect()?;
///     Ok(())
/// }
/// ```
pub struct FingerprintSensor<T> {
    transport: T,
    address: u32,
    password: u32,
    parameters: Option<SystemParameters>,
}

impl<T: Transport> FingerprintSensor<T> {
    /// Library size assumed until `ReadSysPara` says otherwise
    pub const FALLBACK_LIBRARY_SIZE: u16 = 200;

    /// Create a new sensor instance
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            address: DEFAULT_ADDRESS,
            password: DEFAULT_PASSWORD,
            parameters: None,
        }
    }

    /// Set module address (default: broadcast)
    pub fn with_address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }

    /// Set handshake password (default: 0)
    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.parameters.is_some() && self.transport.is_open()
    }

    /// Connect to the sensor
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The serial device cannot be opened
    /// - The sensor doesn't respond
    /// - The password is rejected
    pub fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.transport.port_name());

        if !self.transport.is_open() {
            self.transport.open()?;
        }

        self.verify_password()?;
        let parameters = self.read_system_parameters()?;

        info!("Connected: {}", parameters);

        self.parameters = Some(parameters);
        Ok(())
    }

    /// Disconnect from the sensor
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.transport.is_open() {
            return Ok(());
        }

        info!("Disconnecting from {}...", self.transport.port_name());

        self.transport.close()?;
        self.parameters = None;

        Ok(())
    }

    /// Password handshake
    pub fn verify_password(&mut self) -> Result<()> {
        debug!("Verifying password...");

        let password = self.password.to_be_bytes();
        self.execute(Command::VfyPwd, &password)?;
        Ok(())
    }

    /// Read status and basic configuration
    pub fn read_system_parameters(&mut self) -> Result<SystemParameters> {
        debug!("Reading system parameters...");

        let reply = self.execute(Command::ReadSysPara, &[])?;
        let p = Self::expect_params(Command::ReadSysPara, &reply, 16)?;

        Ok(SystemParameters {
            status: StatusFlags::from_bits_truncate(BigEndian::read_u16(&p[0..2])),
            system_id: BigEndian::read_u16(&p[2..4]),
            library_size: BigEndian::read_u16(&p[4..6]),
            security_level: BigEndian::read_u16(&p[6..8]),
            device_address: BigEndian::read_u32(&p[8..12]),
            packet_size: SystemParameters::packet_size_from_code(BigEndian::read_u16(&p[12..14])),
            baud_rate: u32::from(BigEndian::read_u16(&p[14..16])) * constants::BAUD_UNIT,
        })
    }

    fn library_size(&self) -> u16 {
        self.parameters
            .as_ref()
            .map(|p| p.library_size)
            .unwrap_or(Self::FALLBACK_LIBRARY_SIZE)
    }

    // Helper methods

    /// Send one command and wait for its acknowledge.
    ///
    /// Unread input is discarded first. A non-OK confirmation code becomes
    /// [`Error::Sensor`].
    fn execute(&mut self, command: Command, params: &[u8]) -> Result<Packet> {
        trace!("Executing {}", command);

        // Replies carry no sequence number; a late ack must not answer this command
        self.transport.discard_input()?;

        let packet = Packet::command(self.address, command, params);
        self.send_packet(&packet)?;

        let reply = self.receive_packet()?;

        if reply.packet_type != PacketType::Ack {
            return Err(Error::InvalidResponse(format!(
                "expected acknowledge for {}, got {:?}",
                command, reply.packet_type
            )));
        }

        if self.address != DEFAULT_ADDRESS && reply.address != self.address {
            return Err(r503_core::Error::AddressMismatch {
                expected: self.address,
                actual: reply.address,
            }
            .into());
        }

        let code = reply.confirmation().ok_or_else(|| r503_core::Error::MalformedAck {
            command,
            reason: "missing confirmation code".into(),
        })?;

        if code != ConfirmationCode::Ok {
            debug!("{} answered {}", command, code);
            return Err(Error::sensor(command, code));
        }

        Ok(reply)
    }

    fn expect_params<'a>(command: Command, reply: &'a Packet, len: usize) -> Result<&'a [u8]> {
        let params = reply.params();
        if params.len() < len {
            return Err(r503_core::Error::MalformedAck {
                command,
                reason: format!("expected {} parameter bytes, got {}", len, params.len()),
            }
            .into());
        }
        Ok(&params[..len])
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        trace!("Sending: {:?}", packet);

        let data = packet.encode();
        self.transport.send(&data)?;

        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Packet> {
        let header = self.transport.receive(HEADER_SIZE)?;
        let remaining = Packet::remaining_len(&header)?;
        let body = self.transport.receive(remaining)?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + remaining);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&body);

        let packet = Packet::decode(buf)?;

        trace!("Received: {:?}", packet);

        Ok(packet)
    }
}

impl<T: Transport> SensorLink for FingerprintSensor<T> {
    fn capture_image(&mut self) -> Result<()> {
        self.execute(Command::GenImg, &[])?;
        Ok(())
    }

    fn image_to_template(&mut self, buffer: CharBuffer) -> Result<()> {
        self.execute(Command::Img2Tz, &[buffer.into()])?;
        Ok(())
    }

    fn create_model(&mut self) -> Result<()> {
        self.execute(Command::RegModel, &[])?;
        Ok(())
    }

    fn store_model(&mut self, slot: SlotId) -> Result<()> {
        let [hi, lo] = slot.index().to_be_bytes();
        self.execute(Command::Store, &[buffers::CHAR_BUFFER_1, hi, lo])?;
        Ok(())
    }

    fn delete_model(&mut self, slot: SlotId) -> Result<()> {
        let [hi, lo] = slot.index().to_be_bytes();
        self.execute(Command::DeletChar, &[hi, lo, 0x00, 0x01])?;
        Ok(())
    }

    fn search(&mut self) -> Result<SearchHit> {
        let [start_hi, start_lo] = 0u16.to_be_bytes();
        let [count_hi, count_lo] = self.library_size().to_be_bytes();

        let reply = self.execute(
            Command::Search,
            &[buffers::CHAR_BUFFER_1, start_hi, start_lo, count_hi, count_lo],
        )?;
        let p = Self::expect_params(Command::Search, &reply, 4)?;

        Ok(SearchHit {
            matched_id: SlotId::new(BigEndian::read_u16(&p[0..2])),
            confidence: BigEndian::read_u16(&p[2..4]),
        })
    }

    fn read_templates(&mut self) -> Result<Vec<SlotId>> {
        let library_size = self.library_size();
        let pages = library_size.div_ceil(constants::INDEX_PAGE_SLOTS).max(1);

        let mut templates = Vec::new();
        for page in 0..pages {
            let reply = self.execute(Command::ReadIndexTable, &[page as u8])?;
            let bitmap = Self::expect_params(Command::ReadIndexTable, &reply, constants::INDEX_PAGE_BYTES)?;

            for (byte_index, byte) in bitmap.iter().enumerate() {
                for bit in 0..8u16 {
                    if byte & (1 << bit) != 0 {
                        let slot = page * constants::INDEX_PAGE_SLOTS + byte_index as u16 * 8 + bit;
                        templates.push(SlotId::new(slot));
                    }
                }
            }
        }

        debug!("Occupied slots: {:?}", templates);

        Ok(templates)
    }

    fn count_templates(&mut self) -> Result<u16> {
        let reply = self.execute(Command::TemplateNum, &[])?;
        let p = Self::expect_params(Command::TemplateNum, &reply, 2)?;
        Ok(BigEndian::read_u16(p))
    }

    fn set_led(&mut self, signal: LedSignal) -> Result<()> {
        trace!("LED -> {}", signal);

        let speed = signal.speed.unwrap_or(constants::DEFAULT_LED_SPEED);
        self.execute(
            Command::AuraLedConfig,
            &[signal.mode.into(), speed, signal.color.into(), 0x00],
        )?;
        Ok(())
    }

    fn system_parameters(&self) -> Option<SystemParameters> {
        self.parameters.clone()
    }
}
