//! Aura LED control values
//!
//! Codes follow the `AuraLedConfig` instruction of the R503 datasheet.

use std::fmt;

/// LED color code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LedColor {
    Red = 1,
    Blue = 2,
    Purple = 3,
    Green = 4,
    Yellow = 5,
    Cyan = 6,
    White = 7,
}

/// LED control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LedMode {
    Breathing = 1,
    Flashing = 2,
    On = 3,
    Off = 4,
    GraduallyOn = 5,
    GraduallyOff = 6,
}

/// One instruction to the LED ring. Never stored, only sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedSignal {
    pub color: LedColor,
    pub mode: LedMode,
    /// Breathing/flash speed; the sensor's default applies when `None`
    pub speed: Option<u8>,
}

impl LedSignal {
    pub const fn new(color: LedColor, mode: LedMode) -> Self {
        Self {
            color,
            mode,
            speed: None,
        }
    }

    pub const fn with_speed(mut self, speed: u8) -> Self {
        self.speed = Some(speed);
        self
    }

    pub const fn breathing(color: LedColor) -> Self {
        Self::new(color, LedMode::Breathing)
    }

    pub const fn flashing(color: LedColor, speed: u8) -> Self {
        Self::new(color, LedMode::Flashing).with_speed(speed)
    }

    /// Color is ignored by the firmware in `Off` mode.
    pub const fn off() -> Self {
        Self::new(LedColor::Red, LedMode::Off)
    }

    pub fn is_off(&self) -> bool {
        self.mode == LedMode::Off
    }
}

impl From<LedColor> for u8 {
    fn from(color: LedColor) -> u8 {
        color as u8
    }
}

impl From<LedMode> for u8 {
    fn from(mode: LedMode) -> u8 {
        mode as u8
    }
}

impl fmt::Display for LedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.speed {
            Some(speed) => write!(f, "{:?}/{:?}@{}", self.color, self.mode, speed),
            None => write!(f, "{:?}/{:?}", self.color, self.mode),
        }
    }
}
