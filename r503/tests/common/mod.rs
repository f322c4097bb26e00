//! In-memory R503 that answers real protocol frames

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;

use r503::{Command, ConfirmationCode, Config, Packet, Result, SensorLink, Timing};
use r503::{Connector, FingerprintSensor};
use r503_transport::Transport;

pub type Shared = Arc<Mutex<SensorState>>;

/// What the simulated sensor knows. A finger is identified by a number;
/// two scans of the same number always fuse into a model.
#[derive(Debug)]
pub struct SensorState {
    /// Fingers seen by successive `GenImg`s; `resting` once exhausted
    pub presented: VecDeque<Option<u16>>,
    pub resting: Option<u16>,
    pub image: Option<u16>,
    pub buffers: [Option<u16>; 2],
    pub model: Option<u16>,
    /// slot → finger
    pub library: BTreeMap<u16, u16>,
    pub library_size: u16,
    /// One-shot refusals, consumed by the next matching instruction
    pub faults: Vec<(Command, ConfirmationCode)>,
    /// Every `AuraLedConfig` as (mode, speed, color)
    pub leds: Vec<(u8, u8, u8)>,
    pub commands: Vec<Command>,
    pub opens: usize,
    /// Answer the next instruction of this kind only after the host has
    /// given up waiting
    pub late: Option<Command>,
    /// Stop answering altogether
    pub unplugged: bool,
}

impl Default for SensorState {
    fn default() -> Self {
        Self {
            presented: VecDeque::new(),
            resting: None,
            image: None,
            buffers: [None, None],
            model: None,
            library: BTreeMap::new(),
            library_size: 200,
            faults: Vec::new(),
            leds: Vec::new(),
            commands: Vec::new(),
            opens: 0,
            late: None,
            unplugged: false,
        }
    }
}

impl SensorState {
    pub fn shared() -> Shared {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Queue fingers for the next captures
    pub fn present(&mut self, fingers: impl IntoIterator<Item = Option<u16>>) {
        self.presented.extend(fingers);
    }

    pub fn fail_next(&mut self, command: Command, code: ConfirmationCode) {
        self.faults.push((command, code));
    }

    /// Instructions received, handshake excluded
    pub fn operations(&self) -> Vec<Command> {
        self.commands
            .iter()
            .copied()
            .filter(|c| !matches!(c, Command::VfyPwd | Command::ReadSysPara))
            .collect()
    }

    fn answer(&mut self, command: Command, params: &[u8]) -> (ConfirmationCode, Vec<u8>) {
        self.commands.push(command);

        if let Some(index) = self.faults.iter().position(|(c, _)| *c == command) {
            let (_, code) = self.faults.remove(index);
            return (code, Vec::new());
        }

        let ok = |data: Vec<u8>| (ConfirmationCode::Ok, data);

        match command {
            Command::VfyPwd => ok(Vec::new()),
            Command::ReadSysPara => {
                let mut p = [0u8; 16];
                BigEndian::write_u16(&mut p[2..4], 0x0009);
                BigEndian::write_u16(&mut p[4..6], self.library_size);
                BigEndian::write_u16(&mut p[6..8], 3);
                BigEndian::write_u32(&mut p[8..12], 0xFFFF_FFFF);
                BigEndian::write_u16(&mut p[12..14], 2);
                BigEndian::write_u16(&mut p[14..16], 6);
                ok(p.to_vec())
            }
            Command::GenImg => {
                let finger = self.presented.pop_front().unwrap_or(self.resting);
                match finger {
                    Some(finger) => {
                        self.image = Some(finger);
                        ok(Vec::new())
                    }
                    None => (ConfirmationCode::NoFinger, Vec::new()),
                }
            }
            Command::Img2Tz => match (self.image, params.first()) {
                (Some(finger), Some(&buffer @ (1 | 2))) => {
                    self.buffers[usize::from(buffer - 1)] = Some(finger);
                    ok(Vec::new())
                }
                _ => (ConfirmationCode::FeatureFail, Vec::new()),
            },
            Command::RegModel => match self.buffers {
                [Some(a), Some(b)] if a == b => {
                    self.model = Some(a);
                    ok(Vec::new())
                }
                _ => (ConfirmationCode::EnrollMismatch, Vec::new()),
            },
            Command::Store => {
                let slot = BigEndian::read_u16(&params[1..3]);
                match self.model {
                    Some(finger) if slot < self.library_size => {
                        self.library.insert(slot, finger);
                        ok(Vec::new())
                    }
                    _ => (ConfirmationCode::BadLocation, Vec::new()),
                }
            }
            Command::DeletChar => {
                let slot = BigEndian::read_u16(&params[0..2]);
                self.library.remove(&slot);
                ok(Vec::new())
            }
            Command::Search => {
                let hit = self.buffers[0].and_then(|finger| {
                    self.library
                        .iter()
                        .find(|(_, stored)| **stored == finger)
                        .map(|(slot, _)| *slot)
                });
                match hit {
                    Some(slot) => {
                        let mut p = [0u8; 4];
                        BigEndian::write_u16(&mut p[0..2], slot);
                        BigEndian::write_u16(&mut p[2..4], 150);
                        ok(p.to_vec())
                    }
                    None => (ConfirmationCode::NotFound, Vec::new()),
                }
            }
            Command::TemplateNum => {
                let mut p = [0u8; 2];
                BigEndian::write_u16(&mut p, self.library.len() as u16);
                ok(p.to_vec())
            }
            Command::ReadIndexTable => {
                let page = u16::from(params[0]);
                let mut bitmap = vec![0u8; 32];
                for slot in self.library.keys() {
                    if slot / 256 == page {
                        let offset = slot % 256;
                        bitmap[usize::from(offset / 8)] |= 1 << (offset % 8);
                    }
                }
                ok(bitmap)
            }
            Command::AuraLedConfig => {
                self.leds.push((params[0], params[1], params[2]));
                ok(Vec::new())
            }
            _ => (ConfirmationCode::PacketReceiveError, Vec::new()),
        }
    }
}

/// Transport backed by a [`SensorState`]
pub struct SimulatedSensor {
    state: Shared,
    rx: BytesMut,
    /// Reply still on the wire; lands before the host's next move
    in_flight: BytesMut,
    open: bool,
}

impl SimulatedSensor {
    pub fn new(state: Shared) -> Self {
        Self {
            state,
            rx: BytesMut::new(),
            in_flight: BytesMut::new(),
            open: false,
        }
    }

    fn land_in_flight(&mut self) {
        let late = self.in_flight.split();
        self.rx.extend_from_slice(&late);
    }
}

impl Transport for SimulatedSensor {
    fn open(&mut self) -> r503_transport::Result<()> {
        self.state.lock().unwrap().opens += 1;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> r503_transport::Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&mut self, data: &[u8]) -> r503_transport::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unplugged {
            return Err(r503_transport::Error::ConnectionClosed);
        }

        let packet = Packet::decode(BytesMut::from(data)).expect("host sent a malformed frame");
        let command = Command::try_from(packet.payload[0]).expect("unknown instruction");
        let (code, data) = state.answer(command, &packet.payload[1..]);
        let reply = Packet::ack(packet.address, code, &data).encode();

        let delayed = state.late == Some(command);
        if delayed {
            state.late = None;
        }
        drop(state);

        self.land_in_flight();
        if delayed {
            self.in_flight.extend_from_slice(&reply);
        } else {
            self.rx.extend_from_slice(&reply);
        }
        Ok(())
    }

    fn receive(&mut self, len: usize) -> r503_transport::Result<BytesMut> {
        if self.rx.len() < len {
            return Err(r503_transport::Error::ReadTimeout {
                expected: len,
                received: self.rx.len(),
            });
        }
        Ok(self.rx.split_to(len))
    }

    fn discard_input(&mut self) -> r503_transport::Result<()> {
        self.land_in_flight();
        self.rx.clear();
        Ok(())
    }

    fn port_name(&self) -> String {
        "sim".to_string()
    }
}

/// Connector opening a [`FingerprintSensor`] over the simulator
pub fn connector(state: &Shared) -> impl Connector + 'static {
    let state = state.clone();
    move |_: &str, config: &Config| -> Result<Box<dyn SensorLink>> {
        let mut sensor = FingerprintSensor::new(SimulatedSensor::new(state.clone()))
            .with_address(config.address)
            .with_password(config.password);
        sensor.connect()?;
        Ok(Box::new(sensor))
    }
}

pub fn config() -> Config {
    Config::with_port("/dev/ttyUSB0").with_timing(Timing::immediate())
}

pub fn batch(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not a batch: {}", other),
    }
}
