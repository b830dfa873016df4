use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NO_EVIDENCE_INDEX: i64 = -1;

/// A literal excerpt of a content unit, or the "no evidence found" sentinel
/// (`text == None`, both indices `-1`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvidenceSpan {
    pub content_id: String,
    pub text: Option<String>,
    pub start_index: i64,
    pub end_index: i64,
}

impl EvidenceSpan {
    pub fn not_found(content_id: &str) -> Self {
        EvidenceSpan {
            content_id: content_id.to_string(),
            text: None,
            start_index: NO_EVIDENCE_INDEX,
            end_index: NO_EVIDENCE_INDEX,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.text.is_none()
    }
}

/// Evidence stored against a graded attempt item.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct EvidenceRecord {
    pub attempt_item_id: String,
    pub span: EvidenceSpan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_sentinel_has_negative_indices() {
        let span = EvidenceSpan::not_found("unit-1");

        assert!(span.is_sentinel());
        assert_eq!(span.start_index, -1);
        assert_eq!(span.end_index, -1);
    }
}
