//! Two-scan enrollment
//!
//! A finger is enrolled by templating two separate scans of it, fusing the
//! templates into a model and storing the model in a slot. The session can
//! be driven one step per call (`start` → `capture_step` ×2 →
//! `create_model` → `store_model`), or all at once with [`enroll_finger`].
//!
//! ```text
//!            start            capture ok           capture ok
//!   Idle ─────────▶ AwaitingScan1 ─────▶ AwaitingScan2 ─────▶ ScansCaptured
//!    ▲                                                          │  ▲
//!    │ store ok / reset                          create_model ok │  │ create_model fails
//!    └──────────────────────────────────────────── ModelReady ◀─┘──┘
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use r503_core::ConfirmationCode;
use r503_types::{LedColor, SlotId};

use crate::config::Timing;
use crate::error::{Result, UsageError};
use crate::feedback::{pause, Feedback, FeedbackKind};
use crate::link::{CharBuffer, SensorLink};

/// Which of the two scans is being taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    First,
    Second,
}

impl ScanStep {
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    /// Character buffer the scan is templated into
    pub fn buffer(self) -> CharBuffer {
        match self {
            Self::First => CharBuffer::One,
            Self::Second => CharBuffer::Two,
        }
    }
}

/// Enrollment progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrollmentState {
    #[default]
    Idle,
    AwaitingScan1,
    AwaitingScan2,
    /// Both scans templated; step stays at 2
    ScansCaptured,
    /// Model fused, waiting for `store_model`
    ModelReady,
}

impl EnrollmentState {
    /// Current step; `None` exactly when idle
    pub fn step(self) -> Option<ScanStep> {
        match self {
            Self::Idle => None,
            Self::AwaitingScan1 => Some(ScanStep::First),
            Self::AwaitingScan2 | Self::ScansCaptured | Self::ModelReady => Some(ScanStep::Second),
        }
    }
}

/// Result of a successful `capture_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub step: ScanStep,
    pub scans_complete: bool,
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} completed.", self.step.number())?;
        if self.scans_complete {
            write!(f, " Both scans captured. Call 'create_model'.")
        } else {
            write!(f, " Remove finger and place again for step 2.")
        }
    }
}

/// The single enrollment a driver may have in flight.
///
/// Owned by the driver and lent to each command; a slot is fixed from
/// `start` until the session is stored or reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentSession {
    slot: Option<SlotId>,
    state: EnrollmentState,
}

impl EnrollmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.state != EnrollmentState::Idle
    }

    /// Slot given to `start`
    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    pub fn step(&self) -> Option<ScanStep> {
        self.state.step()
    }

    pub fn state(&self) -> EnrollmentState {
        self.state
    }

    /// Begin enrolling into `slot`.
    ///
    /// Rejected while another enrollment is active so its scans are not lost.
    pub fn start(&mut self, slot: SlotId) -> Result<()> {
        if let (Some(active), Some(step)) = (self.slot, self.step()) {
            return Err(UsageError::AlreadyActive {
                slot: active,
                step: step.number(),
            }
            .into());
        }

        info!("Enrollment started for slot {}", slot);

        self.slot = Some(slot);
        self.state = EnrollmentState::AwaitingScan1;
        Ok(())
    }

    /// Capture and template the scan for the current step.
    ///
    /// The user must lift and re-place their finger between the two scans;
    /// nothing here checks that. Failures leave the state untouched.
    pub fn capture_step(
        &mut self,
        link: &mut dyn SensorLink,
        feedback: &Feedback,
    ) -> Result<CaptureOutcome> {
        let step = self.step().ok_or(UsageError::NotActive)?;

        feedback.signal(link, FeedbackKind::Waiting);

        if let Err(e) = link.capture_image() {
            warn!("Image capture failed at step {}: {}", step.number(), e);
            feedback.signal(link, FeedbackKind::Failure);
            return Err(e);
        }

        if let Err(e) = link.image_to_template(step.buffer()) {
            warn!("Templating failed at step {}: {}", step.number(), e);
            feedback.signal(link, FeedbackKind::Failure);
            return Err(e);
        }

        feedback.signal(link, FeedbackKind::Off);

        let outcome = CaptureOutcome {
            step,
            scans_complete: step == ScanStep::Second,
        };
        self.state = match step {
            ScanStep::First => EnrollmentState::AwaitingScan2,
            ScanStep::Second => EnrollmentState::ScansCaptured,
        };

        debug!("{}", outcome);
        Ok(outcome)
    }

    /// Fuse both scans into a model.
    ///
    /// On failure the session is held at step 2 so the second scan can be
    /// retaken with another `capture_step`.
    pub fn create_model(&mut self, link: &mut dyn SensorLink, feedback: &Feedback) -> Result<()> {
        match self.state {
            EnrollmentState::Idle => return Err(UsageError::NotActive.into()),
            EnrollmentState::AwaitingScan1 | EnrollmentState::AwaitingScan2 => {
                let step = self.step().map(ScanStep::number).unwrap_or_default();
                return Err(UsageError::ScansIncomplete { step }.into());
            }
            EnrollmentState::ScansCaptured | EnrollmentState::ModelReady => {}
        }

        feedback.signal(link, FeedbackKind::Busy);

        match link.create_model() {
            Ok(()) => {
                info!("Model created for slot {:?}", self.slot);
                feedback.signal(link, FeedbackKind::Off);
                self.state = EnrollmentState::ModelReady;
                Ok(())
            }
            Err(e) => {
                warn!("Model creation failed: {}", e);
                feedback.signal(link, FeedbackKind::Failure);
                self.state = EnrollmentState::ScansCaptured;
                Err(e)
            }
        }
    }

    /// Store the model at `slot`.
    ///
    /// `slot` may differ from the one given to `start`; the caller decides.
    /// Success ends the session, failure leaves it as it was.
    pub fn store_model(
        &mut self,
        link: &mut dyn SensorLink,
        feedback: &Feedback,
        slot: SlotId,
    ) -> Result<SlotId> {
        if !self.is_active() {
            return Err(UsageError::NotActive.into());
        }

        if self.slot != Some(slot) {
            debug!("Storing at slot {} instead of {:?}", slot, self.slot);
        }

        feedback.signal(link, FeedbackKind::Busy);

        match link.store_model(slot) {
            Ok(()) => {
                info!("Model stored at slot {}", slot);
                feedback.signal(link, FeedbackKind::Success);
                self.reset();
                Ok(slot)
            }
            Err(e) => {
                warn!("Storing model at slot {} failed: {}", slot, e);
                feedback.signal(link, FeedbackKind::Failure);
                Err(e)
            }
        }
    }

    /// Back to idle from any state
    pub fn reset(&mut self) {
        if self.is_active() {
            debug!("Enrollment reset from {:?}", self.state);
        }
        self.slot = None;
        self.state = EnrollmentState::Idle;
    }
}

/// Run the whole enrollment in one blocking call.
///
/// Polls for a finger, templates it, waits for it to be lifted, repeats for
/// the second scan, then creates and stores the model. Ends with a blue
/// flash on success or a red one on any failure.
pub fn enroll_finger(
    link: &mut dyn SensorLink,
    feedback: &Feedback,
    timing: &Timing,
    slot: SlotId,
) -> Result<()> {
    let result = guided_enrollment(link, feedback, timing, slot);

    match &result {
        Ok(()) => feedback.flash_and_clear(link, LedColor::Blue),
        Err(e) => {
            warn!("Enrollment into slot {} failed: {}", slot, e);
            feedback.flash_and_clear(link, LedColor::Red);
        }
    }

    result
}

fn guided_enrollment(
    link: &mut dyn SensorLink,
    feedback: &Feedback,
    timing: &Timing,
    slot: SlotId,
) -> Result<()> {
    for step in [ScanStep::First, ScanStep::Second] {
        match step {
            ScanStep::First => info!("Place finger on sensor..."),
            ScanStep::Second => info!("Place same finger again..."),
        }
        feedback.signal(link, FeedbackKind::Waiting);

        wait_for_finger(link, timing)?;
        info!("Image taken");

        info!("Templating...");
        link.image_to_template(step.buffer())?;

        if step == ScanStep::First {
            info!("Remove finger");
            feedback.signal(link, FeedbackKind::Off);
            pause(timing.removal_settle());
            wait_for_removal(link, timing)?;
        }
    }

    info!("Creating model...");
    feedback.signal(link, FeedbackKind::Busy);
    link.create_model()?;

    info!("Storing model #{}...", slot);
    link.store_model(slot)?;

    Ok(())
}

fn wait_for_finger(link: &mut dyn SensorLink, timing: &Timing) -> Result<()> {
    loop {
        match link.capture_image() {
            Ok(()) => return Ok(()),
            Err(e) if e.sensor_code() == Some(ConfirmationCode::NoFinger) => {
                pause(timing.poll_interval())
            }
            Err(e) => return Err(e),
        }
    }
}

fn wait_for_removal(link: &mut dyn SensorLink, timing: &Timing) -> Result<()> {
    loop {
        match link.capture_image() {
            Err(e) if e.sensor_code() == Some(ConfirmationCode::NoFinger) => return Ok(()),
            Err(e) if e.sensor_code().is_none() => return Err(e),
            _ => pause(timing.poll_interval()),
        }
    }
}
