//! Driver configuration
//!
//! The host hands the driver a flat attribute map; every key is optional.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use r503_core::{constants, DEFAULT_ADDRESS, DEFAULT_PASSWORD};
use r503_transport::discover_port;

use crate::error::{Error, Result};

/// Attribute naming the serial device
pub const SERIAL_PORT_ATTRIBUTE: &str = "serial_port";

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device path; discovered when absent
    pub serial_port: Option<String>,
    pub baud_rate: u32,
    /// Module address (broadcast by default)
    pub address: u32,
    /// Handshake password
    pub password: u32,
    pub read_timeout_ms: u64,
    pub timing: Timing,
}

/// Fixed waits used by the feedback and guided-enrollment paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Sleep between image captures while waiting for a finger
    pub poll_interval_ms: u64,
    /// Pause after asking the user to lift their finger
    pub removal_settle_ms: u64,
    /// How long a terminal flash stays on before the LED is cleared
    pub flash_settle_ms: u64,
    /// Length of the one-time startup breathing
    pub startup_breathing_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: constants::DEFAULT_BAUD_RATE,
            address: DEFAULT_ADDRESS,
            password: DEFAULT_PASSWORD,
            read_timeout_ms: constants::DEFAULT_READ_TIMEOUT_MS,
            timing: Timing::default(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            removal_settle_ms: 1_000,
            flash_settle_ms: 500,
            startup_breathing_ms: 3_000,
        }
    }
}

impl Timing {
    /// No waits at all (tests, simulators)
    pub fn immediate() -> Self {
        Self {
            poll_interval_ms: 0,
            removal_settle_ms: 0,
            flash_settle_ms: 0,
            startup_breathing_ms: 0,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn removal_settle(&self) -> Duration {
        Duration::from_millis(self.removal_settle_ms)
    }

    pub fn flash_settle(&self) -> Duration {
        Duration::from_millis(self.flash_settle_ms)
    }

    pub fn startup_breathing(&self) -> Duration {
        Duration::from_millis(self.startup_breathing_ms)
    }
}

impl Config {
    /// Create a configuration pinned to one serial device
    pub fn with_port(port: impl Into<String>) -> Self {
        Self {
            serial_port: Some(port.into()),
            ..Self::default()
        }
    }

    /// Set timing
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// List every problem with a raw attribute map. Empty means valid.
    pub fn validate(attributes: &Map<String, Value>) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(value) = attributes.get(SERIAL_PORT_ATTRIBUTE) {
            if !value.is_string() {
                errors.push(format!("{} must be a string", SERIAL_PORT_ATTRIBUTE));
            }
        }

        errors
    }

    /// Build a configuration from the host's attribute map
    pub fn from_attributes(attributes: &Map<String, Value>) -> Result<Self> {
        let errors = Self::validate(attributes);
        if !errors.is_empty() {
            return Err(Error::Configuration(errors.join("; ")));
        }

        let config: Self = serde_json::from_value(Value::Object(attributes.clone()))
            .map_err(|e| Error::Configuration(e.to_string()))?;

        debug!("Parsed configuration: {:?}", config);

        Ok(config)
    }

    /// Serial device to use: the configured one, else the first discovered.
    pub fn resolve_port(&self) -> Result<String> {
        if let Some(port) = &self.serial_port {
            return Ok(port.clone());
        }

        let port = discover_port().map_err(|e| {
            Error::Configuration(format!(
                "No serial port configured and none discovered: {}",
                e
            ))
        })?;

        info!("Discovered serial port {}", port);
        Ok(port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
