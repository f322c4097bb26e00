//! Outcomes of a fingerprint search

use serde::Serialize;

use crate::slot::SlotId;

/// Best library match reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub matched_id: SlotId,
    pub confidence: u16,
}

/// Result of one explicit match attempt
///
/// Serializes with a `status` tag, e.g. `{"status": "match", "matched_id": 3, "confidence": 120}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    NoFinger,
    TemplateFailed { code: u8 },
    NoMatch,
    Match { matched_id: SlotId, confidence: u16 },
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

impl From<SearchHit> for MatchResult {
    fn from(hit: SearchHit) -> Self {
        Self::Match {
            matched_id: hit.matched_id,
            confidence: hit.confidence,
        }
    }
}
