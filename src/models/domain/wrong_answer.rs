use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per `(user_id, attempt_item_id)`; repeat mistakes bump the count.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct WrongAnswerRecord {
    pub user_id: String,
    pub attempt_item_id: String,
    pub mistake_count: i64,
    pub last_wrong_at: DateTime<Utc>,
}

impl WrongAnswerRecord {
    pub fn first_mistake(user_id: &str, attempt_item_id: &str) -> Self {
        WrongAnswerRecord {
            user_id: user_id.to_string(),
            attempt_item_id: attempt_item_id.to_string(),
            mistake_count: 1,
            last_wrong_at: Utc::now(),
        }
    }

    pub fn record_repeat(&mut self) {
        self.mistake_count += 1;
        self.last_wrong_at = Utc::now();
    }
}
