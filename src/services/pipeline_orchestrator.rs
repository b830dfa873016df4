//! The pipelines: generation, parsing, validation and persistence wired
//! together with the failure policy of each task.
//!
//! * Summarization is fail-fast: any chunk failure discards the whole run.
//! * Quiz generation never fails on the generator: fallback items fill in.
//! * Grading falls back to heuristics for subjective types.
//! * Evidence and translation are per unit: a failed unit gets a sentinel or
//!   fallback value and the loop moves on.
//!
//! Persistence failures are fatal everywhere.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use ::validator::Validate;

use crate::{
    config::Config,
    constants::messages,
    errors::{AppError, AppResult},
    models::{
        domain::{
            generation::{
                GeneratedArtifact, GenerationOutcome, GenerationTask, UpstreamErrorKind,
                ValidationStatus,
            },
            grading::{GradedBy, GradingRecord},
            ContentUnit, EvidenceRecord, EvidenceSpan, QuizType, SummaryNote, TaskKind,
        },
        dto::{
            request::{
                EvidenceItemRequest, ExtractEvidenceRequest, GenerateQuizRequest,
                GradeAnswerRequest, TranslateRequest,
            },
            response::{
                EvidenceBatchResponse, EvidenceResponse, GradingResponse,
                QuizGenerationResponse, SummarizationResponse, TranslationBatchResponse,
                TranslationResult, UnitBatchResponse,
            },
        },
    },
    repositories::{ContentUnitRepository, PersistenceGateway},
    services::{
        chunker::{self, Chunk},
        fallback,
        generation_client::{ChatMessage, GenerationClient},
        lease::LeaseRegistry,
        pipeline_run::{PipelineRun, PipelineStage},
        prompt_builder::PromptBuilder,
        response_parser,
        validator::{self, EvidenceQualityGate, QualityGate, QuizContext},
    },
};

pub struct PipelineOrchestrator {
    client: Arc<dyn GenerationClient>,
    gateway: Arc<dyn PersistenceGateway>,
    content_units: Arc<dyn ContentUnitRepository>,
    leases: LeaseRegistry,
    evidence_gate: Arc<dyn QualityGate>,
    config: Arc<Config>,
}

impl PipelineOrchestrator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        gateway: Arc<dyn PersistenceGateway>,
        content_units: Arc<dyn ContentUnitRepository>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            client,
            gateway,
            content_units,
            leases: LeaseRegistry::new(),
            evidence_gate: Arc::new(EvidenceQualityGate::from_config(&config)),
            config,
        }
    }

    pub fn with_quality_gate(mut self, gate: Arc<dyn QualityGate>) -> Self {
        self.evidence_gate = gate;
        self
    }

    pub fn leases(&self) -> &LeaseRegistry {
        &self.leases
    }

    fn task(&self, kind: TaskKind, max_tokens: u32) -> GenerationTask {
        GenerationTask::new(kind, &self.config.generation_model, max_tokens)
    }

    /// One generation round trip. The artifact carries the raw text and the
    /// prompt fingerprint; callers fill in what parsing and validation find.
    async fn request_text<T>(
        &self,
        task: &GenerationTask,
        messages: Vec<ChatMessage>,
    ) -> AppResult<GeneratedArtifact<T>> {
        let digest = PromptBuilder::fingerprint(&messages);
        let raw = self.client.generate(messages, task.options.clone()).await?;

        log::debug!(
            "{} response: {} chars, prompt {}, range {}",
            task.kind,
            raw.chars().count(),
            &digest[..12],
            task.target_range
                .map(|r| r.label())
                .unwrap_or_else(|| "-".to_string())
        );
        Ok(GeneratedArtifact::new(task.kind, raw, digest))
    }

    async fn load_units(&self, document_id: &str) -> AppResult<Vec<ContentUnit>> {
        let units = self.content_units.find_by_document(document_id).await?;
        if units.is_empty() {
            return Err(AppError::NotFound(format!(
                "Document '{}' has no content units",
                document_id
            )));
        }
        Ok(units)
    }

    fn close_run<T>(run: &mut PipelineRun, result: &AppResult<T>) {
        match result {
            Ok(_) => {
                if let Err(e) = run.finish() {
                    log::warn!("{}", e);
                }
            }
            Err(e) => run.fail(e),
        }
    }

    pub async fn summarize_document(&self, document_id: &str) -> AppResult<SummarizationResponse> {
        let _lease = self.leases.acquire(document_id, TaskKind::Summarize)?;
        let mut run = PipelineRun::start(TaskKind::Summarize, document_id);

        let result = self.run_summarization(document_id, &mut run).await;
        Self::close_run(&mut run, &result);
        result
    }

    async fn run_summarization(
        &self,
        document_id: &str,
        run: &mut PipelineRun,
    ) -> AppResult<SummarizationResponse> {
        let units = self.load_units(document_id).await?;
        let chunks = chunker::chunk_units(units, self.config.summary_chunk_size)?;
        log::info!(
            "Summarizing document {} in {} chunks",
            document_id,
            chunks.len()
        );

        let mut notes = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let label = chunk.range.label();
            let note = self
                .summarize_chunk(document_id, chunk, run)
                .await
                .map_err(|e| e.with_context(&format!("chunk {}", label)))?;
            notes.push(note);
        }

        run.advance(PipelineStage::Persisting)?;
        let labels = notes.iter().map(|n| n.label.clone()).collect();
        let artifact_count = notes.len();
        self.gateway.save_summaries(document_id, notes).await?;

        Ok(SummarizationResponse {
            success: true,
            artifact_count,
            labels,
        })
    }

    async fn summarize_chunk(
        &self,
        document_id: &str,
        chunk: &Chunk,
        run: &mut PipelineRun,
    ) -> AppResult<SummaryNote> {
        run.advance(PipelineStage::Generating)?;
        let task = self
            .task(TaskKind::Summarize, self.config.summary_max_tokens)
            .with_range(chunk.range);
        let mut artifact = self
            .request_text::<String>(&task, PromptBuilder::summarize(chunk))
            .await?;

        run.advance(PipelineStage::Parsing)?;
        let parsed = response_parser::parse_summary(&artifact.raw_text)?;
        artifact.parse_tier = Some(parsed.tier);

        run.advance(PipelineStage::Validating)?;
        let note = SummaryNote::new_summary_note(
            document_id,
            chunk.first_unit_id(),
            chunk.range,
            &parsed.value,
        );
        artifact.parsed_payload = Some(parsed.value);
        log::debug!(
            "Chunk {} summarized via {:?} (prompt {})",
            note.label,
            artifact.parse_tier,
            &artifact.prompt_digest[..12]
        );
        Ok(note)
    }

    pub async fn generate_quiz(
        &self,
        document_id: &str,
        request: GenerateQuizRequest,
    ) -> AppResult<QuizGenerationResponse> {
        request.validate()?;
        let _lease = self.leases.acquire(document_id, TaskKind::GenerateQuiz)?;
        let mut run = PipelineRun::start(TaskKind::GenerateQuiz, document_id);

        let result = self.run_quiz_generation(document_id, request, &mut run).await;
        Self::close_run(&mut run, &result);
        result
    }

    async fn run_quiz_generation(
        &self,
        document_id: &str,
        request: GenerateQuizRequest,
        run: &mut PipelineRun,
    ) -> AppResult<QuizGenerationResponse> {
        let units = self.load_units(document_id).await?;
        let chunk = Chunk::from_units(chunker::select_units(units, &request.content_ids))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "None of the requested content units belong to document '{}'",
                    document_id
                ))
            })?;

        let count = request.question_count;
        let types = if request.question_types.is_empty() {
            vec![QuizType::MultipleChoice]
        } else {
            request.question_types.clone()
        };

        run.advance(PipelineStage::Generating)?;
        let task = self
            .task(TaskKind::GenerateQuiz, self.config.quiz_max_tokens)
            .with_range(chunk.range);
        let messages = PromptBuilder::generate_quiz(&chunk.units, count, &types, request.purpose);

        let generated = match self.request_text(&task, messages).await {
            Ok(mut artifact) => {
                run.advance(PipelineStage::Parsing)?;
                match response_parser::parse_quiz_items(&artifact.raw_text) {
                    Ok(parsed) => {
                        artifact.parse_tier = Some(parsed.tier);
                        artifact.parsed_payload = Some(parsed.value.0);
                        Ok(artifact)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        run.advance(PipelineStage::Validating)?;
        let mut items = match generated {
            Ok(mut artifact) => {
                let wires = artifact.parsed_payload.take().unwrap_or_default();
                let normalized = validator::normalize_quiz_items(
                    wires,
                    &QuizContext {
                        document_id,
                        units: &chunk.units,
                        purpose: request.purpose,
                    },
                );
                artifact.validation_status = normalized.status();
                log::debug!(
                    "Quiz artifact {:?}/{:?}: {} kept, {} repaired, {} dropped",
                    artifact.parse_tier,
                    artifact.validation_status,
                    normalized.items.len(),
                    normalized.repaired,
                    normalized.dropped
                );
                normalized.items
            }
            Err(e) if e.is_generation_failure() => {
                log::warn!(
                    "Quiz generation for document {} failed, using fallback items: {}",
                    document_id,
                    e
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        items.truncate(count);
        let fallback_count = count - items.len();
        if fallback_count > 0 {
            items.extend(fallback::build_fallback_quiz(
                document_id,
                &chunk.units,
                &types,
                fallback_count,
                items.len(),
            ));
        }

        run.advance(PipelineStage::Persisting)?;
        self.gateway
            .save_quiz_items(document_id, items.clone())
            .await?;

        Ok(QuizGenerationResponse {
            success: true,
            artifact_count: items.len(),
            fallback_count,
            items,
        })
    }

    pub async fn grade_answer(
        &self,
        attempt_item_id: &str,
        request: GradeAnswerRequest,
    ) -> AppResult<GradingResponse> {
        request.validate()?;
        let _lease = self.leases.acquire(attempt_item_id, TaskKind::Grade)?;
        let mut run = PipelineRun::start(TaskKind::Grade, attempt_item_id);

        let result = self.run_grading(attempt_item_id, request, &mut run).await;
        Self::close_run(&mut run, &result);
        result
    }

    async fn run_grading(
        &self,
        attempt_item_id: &str,
        request: GradeAnswerRequest,
        run: &mut PipelineRun,
    ) -> AppResult<GradingResponse> {
        let explanation = request.explanation.as_deref();

        let (result, graded_by) = if request.quiz_type.is_objective() {
            run.advance(PipelineStage::Validating)?;
            let result = fallback::grade_objective(
                request.quiz_type,
                &request.reference_answer,
                &request.candidate_answer,
                explanation,
            );
            (result, GradedBy::ExactMatch)
        } else {
            run.advance(PipelineStage::Generating)?;
            let task = self.task(TaskKind::Grade, self.config.grading_max_tokens);
            let messages = PromptBuilder::grade_answer(
                request.quiz_type,
                &request.question,
                &request.reference_answer,
                &request.candidate_answer,
                explanation,
            );

            let graded = match self.request_text::<()>(&task, messages).await {
                Ok(artifact) => {
                    run.advance(PipelineStage::Parsing)?;
                    response_parser::parse_grading(&artifact.raw_text)
                }
                Err(e) => Err(e),
            };

            run.advance(PipelineStage::Validating)?;
            match graded {
                Ok(parsed) => {
                    let (result, status) = validator::normalize_grading(parsed.value);
                    if status == ValidationStatus::Repaired {
                        log::debug!("Grading for {} was repaired", attempt_item_id);
                    }
                    (result, GradedBy::Model)
                }
                Err(e) if e.is_generation_failure() => {
                    log::warn!(
                        "Model grading for {} failed, using heuristic: {}",
                        attempt_item_id,
                        e
                    );
                    let result = fallback::grade_without_model(
                        request.quiz_type,
                        &request.reference_answer,
                        &request.candidate_answer,
                        explanation,
                    );
                    (result, GradedBy::Heuristic)
                }
                Err(e) => return Err(e),
            }
        };

        run.advance(PipelineStage::Persisting)?;
        // Mistakes go first; a stored grading rejects any retry.
        let wrong_answer = if result.is_correct {
            None
        } else {
            Some(
                self.gateway
                    .upsert_wrong_answer(&request.user_id, attempt_item_id)
                    .await?,
            )
        };

        self.gateway
            .save_grading(GradingRecord {
                attempt_item_id: attempt_item_id.to_string(),
                user_id: request.user_id.clone(),
                result: result.clone(),
                graded_by,
                graded_at: Utc::now(),
            })
            .await?;

        Ok(GradingResponse {
            success: true,
            result,
            graded_by,
            wrong_answer,
        })
    }

    pub async fn extract_evidence(
        &self,
        document_id: &str,
        request: ExtractEvidenceRequest,
    ) -> AppResult<EvidenceBatchResponse> {
        request.validate()?;
        let _lease = self.leases.acquire(document_id, TaskKind::FindEvidence)?;
        let mut run = PipelineRun::start(TaskKind::FindEvidence, document_id);

        let result = self.run_evidence(document_id, request, &mut run).await;
        Self::close_run(&mut run, &result);
        result
    }

    async fn run_evidence(
        &self,
        document_id: &str,
        request: ExtractEvidenceRequest,
        run: &mut PipelineRun,
    ) -> AppResult<EvidenceBatchResponse> {
        let units: HashMap<String, ContentUnit> = self
            .content_units
            .find_by_document(document_id)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let mut results = Vec::with_capacity(request.items.len());
        let mut degraded_count = 0;

        for item in &request.items {
            run.advance(PipelineStage::Generating)?;
            let outcome = match units.get(&item.content_id) {
                Some(unit) => self.find_evidence(item, unit, run).await?,
                None => GenerationOutcome::Rejected(messages::CONTENT_UNIT_MISSING.to_string()),
            };

            let (response, span) = evidence_response(item, outcome);
            if !response.success {
                degraded_count += 1;
            }

            run.advance(PipelineStage::Persisting)?;
            self.gateway
                .save_evidence(EvidenceRecord {
                    attempt_item_id: item.attempt_item_id.clone(),
                    span,
                    reason: response.reason.clone(),
                    updated_at: Utc::now(),
                })
                .await?;
            results.push(response);
        }

        Ok(UnitBatchResponse {
            success: true,
            processed_count: results.len(),
            degraded_count,
            results,
        })
    }

    /// Only persistence-class errors escape; every generation problem becomes
    /// an outcome for this item.
    async fn find_evidence(
        &self,
        item: &EvidenceItemRequest,
        unit: &ContentUnit,
        run: &mut PipelineRun,
    ) -> AppResult<GenerationOutcome<EvidenceSpan>> {
        let task = self.task(TaskKind::FindEvidence, self.config.evidence_max_tokens);
        let messages = PromptBuilder::find_evidence(
            &unit.text,
            &item.question,
            &item.correct_answer,
            item.user_answer.as_deref(),
        );

        let artifact = match self.request_text::<()>(&task, messages).await {
            Ok(artifact) => artifact,
            Err(e) if e.is_generation_failure() => {
                log::warn!("Evidence for {} unavailable: {}", item.attempt_item_id, e);
                return Ok(GenerationOutcome::UpstreamError(
                    UpstreamErrorKind::Unavailable,
                    e.to_string(),
                ));
            }
            Err(e) => return Err(e),
        };

        run.advance(PipelineStage::Parsing)?;
        let parsed = match response_parser::parse_evidence(&artifact.raw_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Evidence for {} unparseable: {}", item.attempt_item_id, e);
                return Ok(GenerationOutcome::UpstreamError(
                    UpstreamErrorKind::Malformed,
                    e.to_string(),
                ));
            }
        };

        run.advance(PipelineStage::Validating)?;
        log::debug!(
            "Evidence for {} parsed by {:?}",
            item.attempt_item_id,
            parsed.tier
        );
        Ok(validator::validate_evidence(
            parsed.value,
            unit,
            self.evidence_gate.as_ref(),
        ))
    }

    pub async fn translate_document(
        &self,
        document_id: &str,
        request: TranslateRequest,
    ) -> AppResult<TranslationBatchResponse> {
        request.validate()?;
        let _lease = self.leases.acquire(document_id, TaskKind::Translate)?;
        let mut run = PipelineRun::start(TaskKind::Translate, document_id);

        let result = self.run_translation(document_id, request, &mut run).await;
        Self::close_run(&mut run, &result);
        result
    }

    async fn run_translation(
        &self,
        document_id: &str,
        request: TranslateRequest,
        run: &mut PipelineRun,
    ) -> AppResult<TranslationBatchResponse> {
        let units = chunker::select_units(
            self.load_units(document_id).await?,
            &request.content_ids,
        );
        let target_language = request
            .target_language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.translation_target_language.as_str())
            .to_string();

        let mut results = Vec::new();
        let mut degraded_count = 0;

        for unit in units
            .iter()
            .filter(|u| request.overwrite || u.needs_translation())
        {
            run.advance(PipelineStage::Generating)?;
            let translated = match self.translate_unit(unit, &target_language, run).await {
                Ok(text) => Some(text),
                Err(e) if e.is_generation_failure() => {
                    log::warn!("Translation of unit {} failed, keeping original: {}", unit.id, e);
                    None
                }
                Err(e) => return Err(e),
            };

            if translated.is_none() {
                degraded_count += 1;
            }

            run.advance(PipelineStage::Persisting)?;
            let text = translated.as_deref().unwrap_or(&unit.text);
            self.gateway
                .save_translation(&unit.id, text, translated.is_none())
                .await?;
            results.push(TranslationResult {
                content_id: unit.id.clone(),
                translated: translated.is_some(),
            });
        }

        Ok(UnitBatchResponse {
            success: true,
            processed_count: results.len(),
            degraded_count,
            results,
        })
    }

    async fn translate_unit(
        &self,
        unit: &ContentUnit,
        target_language: &str,
        run: &mut PipelineRun,
    ) -> AppResult<String> {
        let task = self.task(TaskKind::Translate, self.config.translation_max_tokens);
        let messages = PromptBuilder::translate(&unit.text, target_language);
        let artifact = self.request_text::<String>(&task, messages).await?;

        run.advance(PipelineStage::Parsing)?;
        let parsed = response_parser::parse_translation(&artifact.raw_text)?;
        Ok(parsed.value)
    }
}

/// Maps an evidence outcome to the per-item response and the span to store.
fn evidence_response(
    item: &EvidenceItemRequest,
    outcome: GenerationOutcome<EvidenceSpan>,
) -> (EvidenceResponse, EvidenceSpan) {
    let attempt_item_id = item.attempt_item_id.clone();
    match outcome {
        GenerationOutcome::Ok(span) => (
            EvidenceResponse {
                attempt_item_id,
                success: true,
                evidence: Some(span.clone()),
                reason: None,
            },
            span,
        ),
        GenerationOutcome::Rejected(reason) => (
            EvidenceResponse {
                attempt_item_id,
                success: false,
                evidence: None,
                reason: Some(reason),
            },
            EvidenceSpan::not_found(&item.content_id),
        ),
        GenerationOutcome::UpstreamError(_, _) => (
            EvidenceResponse {
                attempt_item_id,
                success: false,
                evidence: None,
                reason: Some(messages::EVIDENCE_UNAVAILABLE.to_string()),
            },
            EvidenceSpan::not_found(&item.content_id),
        ),
    }
}
