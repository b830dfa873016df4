use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::TaskKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Pending,
    Generating,
    Parsing,
    Validating,
    Persisting,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            PipelineStage::Pending => 0,
            PipelineStage::Generating => 1,
            PipelineStage::Parsing => 2,
            PipelineStage::Validating => 3,
            PipelineStage::Persisting => 4,
            PipelineStage::Done | PipelineStage::Failed => 5,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Pending => write!(f, "pending"),
            PipelineStage::Generating => write!(f, "generating"),
            PipelineStage::Parsing => write!(f, "parsing"),
            PipelineStage::Validating => write!(f, "validating"),
            PipelineStage::Persisting => write!(f, "persisting"),
            PipelineStage::Done => write!(f, "done"),
            PipelineStage::Failed => write!(f, "failed"),
        }
    }
}

/// Progress of one pipeline invocation.
///
/// Per-unit pipelines loop through generating, parsing and validating once
/// per unit, so moving back to `Generating` from a later non-terminal stage
/// is allowed. Nothing leaves a terminal stage.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub id: String,
    pub task_kind: TaskKind,
    pub document_id: String,
    pub stage: PipelineStage,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl PipelineRun {
    pub fn start(task_kind: TaskKind, document_id: &str) -> Self {
        let run = Self {
            id: Uuid::new_v4().to_string(),
            task_kind,
            document_id: document_id.to_string(),
            stage: PipelineStage::Pending,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        };
        log::info!("Run {} ({}) started for document {}", run.id, task_kind, document_id);
        run
    }

    pub fn advance(&mut self, next: PipelineStage) -> AppResult<()> {
        let allowed = !self.stage.is_terminal()
            && !next.is_terminal()
            && (next.rank() > self.stage.rank() || next == PipelineStage::Generating);
        if !allowed {
            return Err(AppError::InternalError(format!(
                "Run {} cannot move from {} to {}",
                self.id, self.stage, next
            )));
        }

        log::debug!("Run {} {} -> {}", self.id, self.stage, next);
        self.stage = next;
        Ok(())
    }

    pub fn finish(&mut self) -> AppResult<()> {
        if self.stage.is_terminal() {
            return Err(AppError::InternalError(format!(
                "Run {} is already {}",
                self.id, self.stage
            )));
        }

        self.stage = PipelineStage::Done;
        self.finished_at = Some(Utc::now());
        log::info!(
            "Run {} ({}) done in {}ms",
            self.id,
            self.task_kind,
            self.elapsed_ms()
        );
        Ok(())
    }

    /// Marks the run failed. A run that already finished keeps its stage.
    pub fn fail(&mut self, error: &AppError) {
        if self.stage.is_terminal() {
            return;
        }

        log::error!(
            "Run {} ({}) failed during {}: {}",
            self.id,
            self.task_kind,
            self.stage,
            error
        );
        self.stage = PipelineStage::Failed;
        self.error = Some(error.to_string());
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}
