//! Type definitions for r503

pub mod error;
pub mod led;
pub mod match_result;
pub mod readings;
pub mod slot;
pub mod system;

pub use error::{Error, Result};
pub use led::{LedColor, LedMode, LedSignal};
pub use match_result::{MatchResult, SearchHit};
pub use readings::Readings;
pub use slot::SlotId;
pub use system::{StatusFlags, SystemParameters};
