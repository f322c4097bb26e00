//! Template storage slots

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage location of one model in the sensor's flash library.
///
/// Uniqueness of the stored model per slot is the firmware's business;
/// this type only guarantees the index fits the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(u16);

impl SlotId {
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u16 {
        self.0
    }
}

impl From<u16> for SlotId {
    fn from(index: u16) -> Self {
        Self(index)
    }
}

impl From<SlotId> for u16 {
    fn from(slot: SlotId) -> u16 {
        slot.0
    }
}

impl TryFrom<i64> for SlotId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| Error::Validation(format!("slot {} out of range 0..={}", value, u16::MAX)))
    }
}

impl TryFrom<f64> for SlotId {
    type Error = Error;

    /// Host attribute maps carry every number as a double.
    fn try_from(value: f64) -> Result<Self> {
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(Error::Validation(format!("slot {} is not an integer", value)));
        }
        Self::try_from(value as i64)
    }
}

impl std::str::FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid slot: {:?}", s)))?;
        Self::try_from(value)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
