//! # r503
//!
//! Driver for the R503 optical fingerprint sensor over a serial link.
//!
//! ## Features
//!
//! - Step-wise two-scan enrollment driven one command at a time
//! - Passive readings poll and explicit one-shot match
//! - LED ring feedback for every stage
//! - Command batches as ordered JSON maps
//!
//! ## Quick Start
//!
//! ```no_run
//! use r503::{Config, Driver};
//! use serde_json::json;
//!
//! fn main() -> r503::Result<()> {
//!     let mut driver = Driver::new(Config::with_port("/dev/ttyUSB0"))?;
//!
//!     // Enroll step by step
//!     let batch = serde_json::from_value(json!({"start_enrollment": 5, "capture": true}))
//!         .unwrap_or_default();
//!     let reply = driver.do_command(&batch)?;
//!     println!("{:?}", reply);
//!
//!     // Poll for a finger
//!     let readings = driver.readings();
//!     println!("finger detected: {}", readings.finger_detected);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod driver;
pub mod enrollment;
pub mod error;
pub mod feedback;
pub mod link;
pub mod matching;
pub mod sensor;

// Re-exports
pub use config::{Config, Timing};
pub use dispatcher::{dispatch, DeviceCommand, Reply};
pub use driver::{Connector, Driver, SerialConnector};
pub use enrollment::{enroll_finger, CaptureOutcome, EnrollmentSession, EnrollmentState, ScanStep};
pub use error::{Error, FaultKind, Result, UsageError};
pub use feedback::{Feedback, FeedbackKind};
pub use link::{CharBuffer, SensorLink};
pub use sensor::FingerprintSensor;

// Re-export types
pub use r503_core::{Command, ConfirmationCode, Packet};
pub use r503_types::{
    LedColor, LedMode, LedSignal, MatchResult, Readings, SearchHit, SlotId, StatusFlags,
    SystemParameters,
};
