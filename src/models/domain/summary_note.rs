use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::content_unit::OrderRange;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SummaryNote {
    pub id: String,
    pub document_id: String,
    pub summary_content_id: String, // first content unit of the chunk
    pub source_range: OrderRange,
    pub label: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SummaryNote {
    pub fn new_summary_note(
        document_id: &str,
        summary_content_id: &str,
        source_range: OrderRange,
        text: &str,
    ) -> Self {
        SummaryNote {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            summary_content_id: summary_content_id.to_string(),
            label: source_range.label(),
            source_range,
            text: text.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}
