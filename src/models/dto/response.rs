use serde::Serialize;

use crate::models::domain::{
    evidence::EvidenceSpan,
    grading::{GradedBy, GradingResult},
    QuizItem, WrongAnswerRecord,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizationResponse {
    pub success: bool,
    pub artifact_count: usize,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGenerationResponse {
    pub success: bool,
    pub artifact_count: usize,
    /// Items synthesized without the generation service.
    pub fallback_count: usize,
    pub items: Vec<QuizItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResponse {
    pub success: bool,
    pub result: GradingResult,
    pub graded_by: GradedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrong_answer: Option<WrongAnswerRecord>,
}

/// One evidence lookup. `success == false` with a `reason` is a normal
/// negative answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceResponse {
    pub attempt_item_id: String,
    pub success: bool,
    pub evidence: Option<EvidenceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitBatchResponse<T: Serialize> {
    pub success: bool,
    pub processed_count: usize,
    /// Units that ended with a sentinel or fallback value.
    pub degraded_count: usize,
    pub results: Vec<T>,
}

pub type EvidenceBatchResponse = UnitBatchResponse<EvidenceResponse>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub content_id: String,
    pub translated: bool,
}

pub type TranslationBatchResponse = UnitBatchResponse<TranslationResult>;
