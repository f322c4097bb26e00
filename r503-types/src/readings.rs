//! Passive poll readings

use serde::Serialize;

use crate::{match_result::SearchHit, slot::SlotId};

/// One passive poll result.
///
/// Absent fields are omitted on serialization, so a missing finger is
/// exactly `{"finger_detected": false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readings {
    pub finger_detected: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_id: Option<SlotId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Readings {
    pub fn no_finger() -> Self {
        Self {
            finger_detected: false,
            matched: None,
            matched_id: None,
            confidence: None,
            error: None,
        }
    }

    pub fn not_matched() -> Self {
        Self {
            finger_detected: true,
            matched: Some(false),
            ..Self::no_finger()
        }
    }

    pub fn matched(hit: SearchHit) -> Self {
        Self {
            finger_detected: true,
            matched: Some(true),
            matched_id: Some(hit.matched_id),
            confidence: Some(hit.confidence),
            error: None,
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::no_finger()
        }
    }
}
