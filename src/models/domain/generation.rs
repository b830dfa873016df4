use serde::{Deserialize, Serialize};

use crate::models::domain::content_unit::OrderRange;

/// The kinds of work the generation service is asked to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Summarize,
    GenerateQuiz,
    Grade,
    FindEvidence,
    Translate,
}

impl TaskKind {
    /// Sampling temperature used for each task. Extraction runs at zero.
    pub fn temperature(&self) -> f32 {
        match self {
            TaskKind::Summarize => 0.3,
            TaskKind::GenerateQuiz => 0.7,
            TaskKind::Grade => 0.3,
            TaskKind::FindEvidence => 0.0,
            TaskKind::Translate => 0.3,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Summarize => write!(f, "summarize"),
            TaskKind::GenerateQuiz => write!(f, "generate_quiz"),
            TaskKind::Grade => write!(f, "grade"),
            TaskKind::FindEvidence => write!(f, "find_evidence"),
            TaskKind::Translate => write!(f, "translate"),
        }
    }
}

/// Learning purpose of a quiz request; selects the category taxonomy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningPurpose {
    #[default]
    General,
    Research,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SamplingParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A single request to the generation service.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationTask {
    pub kind: TaskKind,
    pub target_range: Option<OrderRange>,
    pub options: SamplingParams,
}

impl GenerationTask {
    pub fn new(kind: TaskKind, model: &str, max_tokens: u32) -> Self {
        GenerationTask {
            kind,
            target_range: None,
            options: SamplingParams {
                model: model.to_string(),
                temperature: kind.temperature(),
                max_tokens,
            },
        }
    }

    pub fn with_range(mut self, range: OrderRange) -> Self {
        self.target_range = Some(range);
        self
    }
}

/// Which parser tier recovered a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseTier {
    Strict,
    Fenced,
    FieldPattern,
    LineScan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Ok,
    Repaired,
    Rejected,
}

/// Transient record of one generation round trip. Only its validated
/// projection is ever persisted.
#[derive(Clone, Debug)]
pub struct GeneratedArtifact<T> {
    pub task_kind: TaskKind,
    pub raw_text: String,
    pub prompt_digest: String,
    pub parse_tier: Option<ParseTier>,
    pub parsed_payload: Option<T>,
    pub validation_status: ValidationStatus,
}

impl<T> GeneratedArtifact<T> {
    pub fn new(task_kind: TaskKind, raw_text: String, prompt_digest: String) -> Self {
        GeneratedArtifact {
            task_kind,
            raw_text,
            prompt_digest,
            parse_tier: None,
            parsed_payload: None,
            validation_status: ValidationStatus::Ok,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorKind {
    Unavailable,
    Malformed,
}

/// Result of a generation step that separates a normal negative answer
/// (`Rejected`) from an abnormal upstream condition.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationOutcome<T> {
    Ok(T),
    Rejected(String),
    UpstreamError(UpstreamErrorKind, String),
}

impl<T> GenerationOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, GenerationOutcome::Ok(_))
    }
}
