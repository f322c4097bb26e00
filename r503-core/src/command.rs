//! R503 instruction codes

use std::fmt;

use crate::error::{Error, Result};

/// Instruction codes
///
/// Names follow the R503 user manual.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // Fingerprint processing
    GenImg = 0x01,
    Img2Tz = 0x02,
    Match = 0x03,
    Search = 0x04,
    RegModel = 0x05,

    // Library management
    Store = 0x06,
    LoadChar = 0x07,
    DeletChar = 0x0C,
    Empty = 0x0D,
    TemplateNum = 0x1D,
    ReadIndexTable = 0x1F,

    // System
    ReadSysPara = 0x0F,
    VfyPwd = 0x13,
    HandShake = 0x40,

    // Peripherals
    AuraLedConfig = 0x35,
}

impl Command {
    /// Get instruction name as written in the datasheet
    pub fn name(self) -> &'static str {
        match self {
            Self::GenImg => "GenImg",
            Self::Img2Tz => "Img2Tz",
            Self::Match => "Match",
            Self::Search => "Search",
            Self::RegModel => "RegModel",
            Self::Store => "Store",
            Self::LoadChar => "LoadChar",
            Self::DeletChar => "DeletChar",
            Self::Empty => "Empty",
            Self::TemplateNum => "TemplateNum",
            Self::ReadIndexTable => "ReadIndexTable",
            Self::ReadSysPara => "ReadSysPara",
            Self::VfyPwd => "VfyPwd",
            Self::HandShake => "HandShake",
            Self::AuraLedConfig => "AuraLedConfig",
        }
    }

    /// What the instruction does, phrased for error messages
    pub fn action(self) -> &'static str {
        match self {
            Self::GenImg => "capture image",
            Self::Img2Tz => "convert image to template",
            Self::Match => "compare templates",
            Self::Search => "search library",
            Self::RegModel => "create model",
            Self::Store => "store model",
            Self::LoadChar => "load template",
            Self::DeletChar => "delete model",
            Self::Empty => "empty library",
            Self::TemplateNum => "count templates",
            Self::ReadIndexTable => "read template index",
            Self::ReadSysPara => "read system parameters",
            Self::VfyPwd => "verify password",
            Self::HandShake => "handshake",
            Self::AuraLedConfig => "set LED",
        }
    }

    /// Check if the sensor takes a finger image or scans flash for this
    /// instruction (noticeably slower than the rest)
    pub fn is_slow(self) -> bool {
        matches!(self, Self::GenImg | Self::Search | Self::Empty)
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::GenImg),
            0x02 => Ok(Self::Img2Tz),
            0x03 => Ok(Self::Match),
            0x04 => Ok(Self::Search),
            0x05 => Ok(Self::RegModel),
            0x06 => Ok(Self::Store),
            0x07 => Ok(Self::LoadChar),
            0x0C => Ok(Self::DeletChar),
            0x0D => Ok(Self::Empty),
            0x1D => Ok(Self::TemplateNum),
            0x1F => Ok(Self::ReadIndexTable),
            0x0F => Ok(Self::ReadSysPara),
            0x13 => Ok(Self::VfyPwd),
            0x40 => Ok(Self::HandShake),
            0x35 => Ok(Self::AuraLedConfig),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}
