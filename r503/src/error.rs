//! High-level error types

use r503_core::{Command, ConfirmationCode};
use r503_types::SlotId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] r503_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] r503_transport::Error),
    
    /// Sensor answered with a non-OK confirmation code
    #[error("Failed to {}: {code}", .command.action())]
    Sensor {
        command: Command,
        code: ConfirmationCode,
    },

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("Configuration error: {0}")]
    Configuration(String),
    
    #[error("Sensor not connected")]
    NotConnected,
    
    #[error("Invalid response from sensor: {0}")]
    InvalidResponse(String),

    /// Result could not be turned into reply fields
    #[error("Failed to encode result: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Operation invoked in a state that forbids it. Never touches hardware.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Enrollment not active. Run 'start_enrollment' first.")]
    NotActive,

    #[error("Enrollment already active for slot {slot} at step {step}. Run 'reset_enrollment' first.")]
    AlreadyActive { slot: SlotId, step: u8 },

    #[error("Both scans must be captured before creating a model (currently at step {step}).")]
    ScansIncomplete { step: u8 },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument for '{command}': {reason}")]
    InvalidArgument { command: String, reason: String },
}

/// Fault taxonomy used to decide how far an error may travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Serial or framing failure; retry at the caller's discretion
    Transport,
    /// Sensor refused the operation
    Protocol,
    /// Operation not allowed in the current state
    Usage,
    /// No usable serial device; fatal at startup
    Configuration,
}

impl Error {
    pub(crate) fn sensor(command: Command, code: ConfirmationCode) -> Self {
        Self::Sensor { command, code }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Sensor { .. } | Self::Encoding(_) => FaultKind::Protocol,
            Self::Usage(_) => FaultKind::Usage,
            Self::Configuration(_) | Self::Transport(r503_transport::Error::NoSerialPorts(_)) => {
                FaultKind::Configuration
            }
            Self::Core(_) | Self::Transport(_) | Self::NotConnected | Self::InvalidResponse(_) => {
                FaultKind::Transport
            }
        }
    }

    /// Only configuration faults are allowed to abort the driver.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != FaultKind::Configuration
    }

    /// Confirmation code when the sensor itself refused the operation
    pub fn sensor_code(&self) -> Option<ConfirmationCode> {
        match self {
            Self::Sensor { code, .. } => Some(*code),
            _ => None,
        }
    }
}
