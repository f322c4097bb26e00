//! One-shot match pipeline: capture → template → search
//!
//! Shared by the passive readings poll and the explicit match command;
//! only the LED handling around it differs.

use tracing::{debug, info, trace};

use r503_core::ConfirmationCode;
use r503_types::{LedColor, MatchResult, Readings, SearchHit};

use crate::error::Result;
use crate::feedback::{Feedback, FeedbackKind};
use crate::link::{CharBuffer, SensorLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    NoFinger,
    TemplateFailed(ConfirmationCode),
    NoMatch,
    Matched(SearchHit),
}

/// Sensor refusals become outcomes; transport faults propagate.
fn attempt_match(link: &mut dyn SensorLink) -> Result<Attempt> {
    if let Err(e) = link.capture_image() {
        return match e.sensor_code() {
            Some(_) => Ok(Attempt::NoFinger),
            None => Err(e),
        };
    }

    if let Err(e) = link.image_to_template(CharBuffer::One) {
        return match e.sensor_code() {
            Some(code) => Ok(Attempt::TemplateFailed(code)),
            None => Err(e),
        };
    }

    match link.search() {
        Ok(hit) => Ok(Attempt::Matched(hit)),
        Err(e) => match e.sensor_code() {
            Some(_) => Ok(Attempt::NoMatch),
            None => Err(e),
        },
    }
}

/// Passive poll for the readings loop.
///
/// No finger is the normal idle case and is not an error. The LED is left
/// showing the outcome.
pub fn poll(link: &mut dyn SensorLink, feedback: &Feedback) -> Result<Readings> {
    let readings = match attempt_match(link)? {
        Attempt::NoFinger => {
            trace!("No finger");
            feedback.signal(link, FeedbackKind::Off);
            Readings::no_finger()
        }
        Attempt::TemplateFailed(code) => {
            debug!("Templating failed: {}", code);
            feedback.signal(link, FeedbackKind::Failure);
            Readings::not_matched()
        }
        Attempt::NoMatch => {
            debug!("No match");
            feedback.signal(link, FeedbackKind::Failure);
            Readings::not_matched()
        }
        Attempt::Matched(hit) => {
            debug!("Matched slot {} (confidence {})", hit.matched_id, hit.confidence);
            feedback.signal(link, FeedbackKind::Success);
            Readings::matched(hit)
        }
    };

    Ok(readings)
}

/// Explicit match command: breathe while scanning, then flash the verdict
/// and clear the LED.
pub fn match_once(link: &mut dyn SensorLink, feedback: &Feedback) -> Result<MatchResult> {
    feedback.signal(link, FeedbackKind::Waiting);

    let attempt = match attempt_match(link) {
        Ok(attempt) => attempt,
        Err(e) => {
            feedback.flash_and_clear(link, LedColor::Red);
            return Err(e);
        }
    };

    let result = match attempt {
        Attempt::NoFinger => MatchResult::NoFinger,
        Attempt::TemplateFailed(code) => MatchResult::TemplateFailed { code: code.code() },
        Attempt::NoMatch => MatchResult::NoMatch,
        Attempt::Matched(hit) => MatchResult::from(hit),
    };

    let color = if result.is_match() {
        LedColor::Blue
    } else {
        LedColor::Red
    };
    feedback.flash_and_clear(link, color);

    info!("Match result: {:?}", result);

    Ok(result)
}
