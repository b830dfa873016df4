use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GradingResult {
    pub is_correct: bool,
    pub score: i64, // always within [0, 100]
    pub feedback: String,
    pub explanation: String,
}

/// How a grade was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradedBy {
    ExactMatch,
    Model,
    Heuristic,
}

/// A grading result stored against one attempt item.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GradingRecord {
    pub attempt_item_id: String,
    pub user_id: String,
    pub result: GradingResult,
    pub graded_by: GradedBy,
    pub graded_at: DateTime<Utc>,
}

pub fn clamp_score(score: i64) -> i64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}
