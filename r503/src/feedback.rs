//! LED feedback
//!
//! Every signal is best effort: a failed `set_led` is logged and dropped,
//! it never decides whether an enrollment or match goes ahead.

use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use r503_types::{LedColor, LedSignal};

use crate::config::Timing;
use crate::link::SensorLink;

/// Flash speed for every flashing signal
pub const FLASH_SPEED: u8 = 100;

/// Abstract outcomes shown on the LED ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Waiting for a finger
    Waiting,
    /// Sensor is working on something
    Busy,
    Success,
    Failure,
    Off,
}

impl FeedbackKind {
    pub fn signal(self) -> LedSignal {
        match self {
            Self::Waiting => LedSignal::breathing(LedColor::Purple),
            Self::Busy => LedSignal::breathing(LedColor::Blue),
            Self::Success => LedSignal::flashing(LedColor::Blue, FLASH_SPEED),
            Self::Failure => LedSignal::flashing(LedColor::Red, FLASH_SPEED),
            Self::Off => LedSignal::off(),
        }
    }
}

/// Maps outcomes to LED commands
#[derive(Debug, Clone)]
pub struct Feedback {
    flash_settle: Duration,
    startup_breathing: Duration,
}

impl Feedback {
    pub fn new(timing: &Timing) -> Self {
        Self {
            flash_settle: timing.flash_settle(),
            startup_breathing: timing.startup_breathing(),
        }
    }

    /// Issue exactly one `set_led` for `kind`
    pub fn signal(&self, link: &mut dyn SensorLink, kind: FeedbackKind) {
        trace!("Feedback: {:?}", kind);
        Self::send(link, kind.signal());
    }

    /// Flash `color`, hold it briefly, then switch the LED off
    pub fn flash_and_clear(&self, link: &mut dyn SensorLink, color: LedColor) {
        Self::send(link, LedSignal::flashing(color, FLASH_SPEED));
        pause(self.flash_settle);
        Self::send(link, LedSignal::off());
    }

    /// Extended breathing shown once after the sensor comes up
    pub fn startup(&self, link: &mut dyn SensorLink) {
        Self::send(link, FeedbackKind::Waiting.signal());
        pause(self.startup_breathing);
        Self::send(link, LedSignal::off());
    }

    fn send(link: &mut dyn SensorLink, signal: LedSignal) {
        if let Err(e) = link.set_led(signal) {
            warn!("LED signal {} failed: {}", signal, e);
        }
    }
}

impl Default for Feedback {
    fn default() -> Self {
        Self::new(&Timing::default())
    }
}

pub(crate) fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
