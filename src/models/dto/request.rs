use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::generation::LearningPurpose;
use crate::models::domain::quiz_item::QuizType;

fn default_question_types() -> Vec<QuizType> {
    vec![QuizType::MultipleChoice]
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    /// Restricts generation to these units; empty means the whole document.
    #[serde(default)]
    pub content_ids: Vec<String>,

    #[validate(range(min = 1, max = 50))]
    pub question_count: usize,

    #[serde(default = "default_question_types")]
    pub question_types: Vec<QuizType>,

    #[serde(default)]
    pub purpose: LearningPurpose,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeAnswerRequest {
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,

    pub quiz_type: QuizType,

    #[validate(length(min = 1))]
    pub question: String,

    pub reference_answer: String,

    pub candidate_answer: String,

    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItemRequest {
    #[validate(length(min = 1))]
    pub attempt_item_id: String,

    #[validate(length(min = 1))]
    pub content_id: String,

    #[validate(length(min = 1))]
    pub question: String,

    pub correct_answer: String,

    #[serde(default)]
    pub user_answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExtractEvidenceRequest {
    #[validate(length(min = 1, max = 200), nested)]
    pub items: Vec<EvidenceItemRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(default)]
    pub content_ids: Vec<String>,

    #[validate(length(min = 1, max = 50))]
    #[serde(default)]
    pub target_language: Option<String>,

    /// Re-translate units that already carry a translation.
    #[serde(default)]
    pub overwrite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_quiz_request_defaults_types_and_purpose() {
        let request: GenerateQuizRequest =
            serde_json::from_str(r#"{"questionCount": 5}"#).expect("request should parse");

        assert_eq!(request.question_types, vec![QuizType::MultipleChoice]);
        assert_eq!(request.purpose, LearningPurpose::General);
        assert!(request.content_ids.is_empty());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn generate_quiz_request_rejects_zero_questions() {
        let request: GenerateQuizRequest =
            serde_json::from_str(r#"{"questionCount": 0}"#).expect("request should parse");
        assert!(request.validate().is_err());
    }

    #[test]
    fn grade_request_parses_camel_case() {
        let request: GradeAnswerRequest = serde_json::from_str(
            r#"{"userId":"u1","quizType":"short_answer","question":"Q?","referenceAnswer":"A","candidateAnswer":"B"}"#,
        )
        .expect("request should parse");

        assert_eq!(request.quiz_type, QuizType::ShortAnswer);
        assert!(request.explanation.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn evidence_request_requires_items() {
        let request = ExtractEvidenceRequest { items: vec![] };
        assert!(request.validate().is_err());
    }

    #[test]
    fn evidence_request_validates_each_item() {
        let request: ExtractEvidenceRequest = serde_json::from_str(
            r#"{"items":[
                {"attemptItemId":"a1","contentId":"c1","question":"Q?","correctAnswer":"A"},
                {"attemptItemId":"","contentId":"c1","question":"Q?","correctAnswer":"A"}
            ]}"#,
        )
        .expect("request should parse");

        assert!(request.validate().is_err());
        assert!(request.items[0].validate().is_ok());
    }
}
