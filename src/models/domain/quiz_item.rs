use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::evidence::EvidenceSpan;

pub const MULTIPLE_CHOICE_OPTION_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizItem {
    pub id: String,
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>, // unit the question was generated from
    pub quiz_type: QuizType,
    pub question: String,
    pub choices: Vec<String>, // exactly four for multiple choice, empty otherwise
    pub answer: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_span: Option<EvidenceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, Copy)]
#[serde(rename_all = "snake_case")]
pub enum QuizType {
    MultipleChoice, // four options, one answer
    Ox,             // true/false statement
    ShortAnswer,
    Essay,
}

impl QuizType {
    /// Lenient mapping from whatever the model wrote into `quiz_type`.
    pub fn from_wire(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();

        match normalized.as_str() {
            "multiple_choice" | "multiplechoice" | "mc" | "mcq" | "choice" => {
                Some(QuizType::MultipleChoice)
            }
            "ox" | "o/x" | "true_false" | "truefalse" | "tf" | "bool" => Some(QuizType::Ox),
            "short_answer" | "shortanswer" | "short" => Some(QuizType::ShortAnswer),
            "essay" | "long_answer" | "descriptive" => Some(QuizType::Essay),
            _ => None,
        }
    }

    /// Objective types are graded by exact match, subjective types by judgment.
    pub fn is_objective(&self) -> bool {
        matches!(self, QuizType::MultipleChoice | QuizType::Ox)
    }
}

/// Canonical `"O"` / `"X"` for the many ways a true/false answer gets written.
pub fn normalize_ox_answer(answer: &str) -> Option<&'static str> {
    match answer.trim().to_lowercase().as_str() {
        "o" | "○" | "true" | "t" | "yes" | "참" | "맞음" => Some("O"),
        "x" | "×" | "false" | "f" | "no" | "거짓" | "틀림" => Some("X"),
        _ => None,
    }
}

impl std::fmt::Display for QuizType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizType::MultipleChoice => write!(f, "multiple_choice"),
            QuizType::Ox => write!(f, "ox"),
            QuizType::ShortAnswer => write!(f, "short_answer"),
            QuizType::Essay => write!(f, "essay"),
        }
    }
}

impl QuizItem {
    /// Checks the choice invariant for the item's type.
    pub fn is_well_formed(&self) -> bool {
        match self.quiz_type {
            QuizType::MultipleChoice => {
                self.choices.len() == MULTIPLE_CHOICE_OPTION_COUNT
                    && self.choices.iter().all(|c| !c.trim().is_empty())
                    && self.choices.iter().any(|c| c == &self.answer)
            }
            _ => self.choices.is_empty(),
        }
    }
}
