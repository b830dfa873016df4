//! Turns parsed wire payloads into well-typed domain records: fills missing
//! fields, clamps ranges, and rejects low-quality evidence.

use chrono::Utc;

use crate::{
    config::Config,
    constants::{categories, messages},
    models::{
        domain::{
            generation::{GenerationOutcome, LearningPurpose, ValidationStatus},
            grading::{clamp_score, GradingResult},
            quiz_item::{normalize_ox_answer, MULTIPLE_CHOICE_OPTION_COUNT},
            ContentUnit, EvidenceSpan, QuizItem, QuizType,
        },
        dto::wire::{EvidenceWire, GradingWire, QuizWire},
    },
};

/// Lead-ins that make a short excerpt useless as evidence.
pub const DEFAULT_GENERIC_PREFIXES: [&str; 14] = [
    "this study",
    "this paper",
    "these results",
    "this work",
    "this research",
    "this article",
    "these findings",
    "the authors",
    "in this paper",
    "our results",
    "이 연구",
    "본 연구",
    "이 논문",
    "본 논문",
];

/// Floor for accepted evidence, whatever gate is configured.
pub const EVIDENCE_MIN_CHARS: usize = 15;

/// Excerpts at least this long pass even with a generic lead-in.
pub const GENERIC_PREFIX_MAX_CHARS: usize = 50;

/// One rule in the evidence quality gate.
pub trait QualityGate: Send + Sync {
    /// Returns the rejection reason, or `None` when the text passes.
    fn reject_reason(&self, text: &str) -> Option<String>;
}

pub struct MinLengthGate {
    pub min_chars: usize,
}

impl QualityGate for MinLengthGate {
    fn reject_reason(&self, text: &str) -> Option<String> {
        (text.trim().chars().count() < self.min_chars)
            .then(|| messages::EVIDENCE_TOO_SHORT.to_string())
    }
}

pub struct GenericLeadInGate {
    prefixes: Vec<String>,
    max_chars: usize,
}

impl GenericLeadInGate {
    pub fn new<I, S>(prefixes: I, max_chars: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            max_chars,
        }
    }
}

impl QualityGate for GenericLeadInGate {
    fn reject_reason(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.chars().count() >= self.max_chars {
            return None;
        }
        let lower = trimmed.to_lowercase();
        self.prefixes
            .iter()
            .any(|prefix| lower.starts_with(prefix.as_str()))
            .then(|| messages::EVIDENCE_TOO_GENERIC.to_string())
    }
}

/// Runs its gates in order; the first rejection wins.
pub struct EvidenceQualityGate {
    gates: Vec<Box<dyn QualityGate>>,
}

impl EvidenceQualityGate {
    pub fn new(gates: Vec<Box<dyn QualityGate>>) -> Self {
        Self { gates }
    }

    pub fn from_config(config: &Config) -> Self {
        let prefixes = DEFAULT_GENERIC_PREFIXES
            .iter()
            .map(|p| p.to_string())
            .chain(config.evidence_generic_prefixes.iter().cloned());

        Self::new(vec![
            Box::new(MinLengthGate {
                min_chars: config.evidence_min_length.max(EVIDENCE_MIN_CHARS),
            }),
            Box::new(GenericLeadInGate::new(prefixes, GENERIC_PREFIX_MAX_CHARS)),
        ])
    }
}

impl Default for EvidenceQualityGate {
    fn default() -> Self {
        Self::new(vec![
            Box::new(MinLengthGate {
                min_chars: EVIDENCE_MIN_CHARS,
            }),
            Box::new(GenericLeadInGate::new(
                DEFAULT_GENERIC_PREFIXES,
                GENERIC_PREFIX_MAX_CHARS,
            )),
        ])
    }
}

impl QualityGate for EvidenceQualityGate {
    fn reject_reason(&self, text: &str) -> Option<String> {
        self.gates.iter().find_map(|gate| gate.reject_reason(text))
    }
}

/// Checks evidence against the gate and pins it to the referenced unit.
///
/// When the excerpt occurs literally in the unit, the indices are recomputed
/// from its actual character position. Otherwise the model's indices are kept
/// if they fit inside the unit, and replaced by `-1` if they do not.
pub fn validate_evidence(
    wire: EvidenceWire,
    unit: &ContentUnit,
    gate: &dyn QualityGate,
) -> GenerationOutcome<EvidenceSpan> {
    let text = match wire.evidence.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => return GenerationOutcome::Rejected(messages::EVIDENCE_NOT_FOUND.to_string()),
    };

    if text.chars().count() < EVIDENCE_MIN_CHARS {
        return GenerationOutcome::Rejected(messages::EVIDENCE_TOO_SHORT.to_string());
    }

    if let Some(reason) = gate.reject_reason(&text) {
        return GenerationOutcome::Rejected(reason);
    }

    let text_chars = text.chars().count() as i64;
    let unit_chars = unit.text.chars().count() as i64;
    let (start_index, end_index) = match unit.text.find(&text) {
        Some(byte_start) => {
            let start = unit.text[..byte_start].chars().count() as i64;
            (start, start + text_chars)
        }
        None => {
            log::warn!(
                "Evidence for unit {} is not a literal excerpt; keeping model indices if in bounds",
                unit.id
            );
            match (wire.start_index, wire.end_index) {
                (Some(start), Some(end)) if 0 <= start && start < end && end <= unit_chars => {
                    (start, end)
                }
                _ => (-1, -1),
            }
        }
    };

    GenerationOutcome::Ok(EvidenceSpan {
        content_id: unit.id.clone(),
        text: Some(text),
        start_index,
        end_index,
    })
}

pub fn normalize_grading(wire: GradingWire) -> (GradingResult, ValidationStatus) {
    let mut repaired = false;

    let score = match wire.score {
        Some(score) => {
            let clamped = clamp_score(score);
            repaired |= clamped != score;
            clamped
        }
        None => {
            repaired = true;
            0
        }
    };

    let is_correct = wire.is_correct.unwrap_or_else(|| {
        repaired = true;
        false
    });

    let mut text_or_default = |value: Option<String>, default: &str| match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => {
            repaired = true;
            default.to_string()
        }
    };
    let feedback = text_or_default(wire.feedback, messages::DEFAULT_GRADING_FEEDBACK);
    let explanation = text_or_default(wire.explanation, messages::DEFAULT_GRADING_EXPLANATION);

    let status = if repaired {
        ValidationStatus::Repaired
    } else {
        ValidationStatus::Ok
    };

    (
        GradingResult {
            is_correct,
            score,
            feedback,
            explanation,
        },
        status,
    )
}

/// What the quiz normalizer needs to know about the request.
pub struct QuizContext<'a> {
    pub document_id: &'a str,
    pub units: &'a [ContentUnit],
    pub purpose: LearningPurpose,
}

#[derive(Debug, Default)]
pub struct QuizNormalization {
    pub items: Vec<QuizItem>,
    pub repaired: usize,
    pub dropped: usize,
}

impl QuizNormalization {
    pub fn status(&self) -> ValidationStatus {
        if self.repaired > 0 || self.dropped > 0 {
            ValidationStatus::Repaired
        } else {
            ValidationStatus::Ok
        }
    }
}

/// Normalizes every item; items that cannot satisfy their type's invariant
/// are dropped (and counted) instead of failing the batch.
pub fn normalize_quiz_items(wires: Vec<QuizWire>, ctx: &QuizContext<'_>) -> QuizNormalization {
    let mut outcome = QuizNormalization::default();

    for (position, wire) in wires.into_iter().enumerate() {
        match normalize_quiz_item(wire, position, ctx) {
            Some((item, repaired)) => {
                if repaired {
                    outcome.repaired += 1;
                }
                outcome.items.push(item);
            }
            None => outcome.dropped += 1,
        }
    }

    outcome
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Wraps any index, including negative ones, into `0..len`.
pub fn wrap_content_index(index: i64, len: usize) -> usize {
    index.rem_euclid(len as i64) as usize
}

fn normalize_quiz_item(
    wire: QuizWire,
    position: usize,
    ctx: &QuizContext<'_>,
) -> Option<(QuizItem, bool)> {
    let mut repaired = false;
    let number = position + 1;

    let quiz_type = match wire.quiz_type.as_deref().and_then(QuizType::from_wire) {
        Some(t) => t,
        None => {
            repaired = true;
            QuizType::MultipleChoice
        }
    };

    let question = non_blank(wire.quiz_question).unwrap_or_else(|| {
        repaired = true;
        format!("Question {}", number)
    });

    let explanation = non_blank(wire.quiz_explanation).unwrap_or_else(|| {
        repaired = true;
        messages::DEFAULT_QUIZ_EXPLANATION.to_string()
    });

    let content_id = if ctx.units.is_empty() {
        None
    } else {
        let raw_index = wire.content_index.unwrap_or(position as i64);
        let index = wrap_content_index(raw_index, ctx.units.len());
        if wire.content_index != Some(index as i64) {
            repaired = true;
        }
        Some(ctx.units[index].id.clone())
    };

    let category = wire
        .category
        .as_deref()
        .and_then(|c| categories::resolve_category(ctx.purpose, c))
        .map(str::to_string);

    let answer = non_blank(wire.quiz_answer).unwrap_or_default();
    let raw_choices: Vec<String> = wire
        .quiz_choices
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    let (choices, answer) = match quiz_type {
        QuizType::MultipleChoice => {
            let choices: Vec<String> = raw_choices.into_iter().filter(|c| !c.is_empty()).collect();
            if choices.len() != MULTIPLE_CHOICE_OPTION_COUNT {
                log::debug!(
                    "Dropping multiple-choice item {} with {} choices",
                    number,
                    choices.len()
                );
                return None;
            }
            let resolved = resolve_choice(&choices, &answer)?;
            if resolved != answer {
                repaired = true;
            }
            (choices, resolved)
        }
        QuizType::Ox => {
            if !raw_choices.is_empty() {
                repaired = true;
            }
            let normalized = normalize_ox_answer(&answer)?;
            if normalized != answer {
                repaired = true;
            }
            (Vec::new(), normalized.to_string())
        }
        QuizType::ShortAnswer | QuizType::Essay => {
            if answer.is_empty() {
                return None;
            }
            if !raw_choices.is_empty() {
                repaired = true;
            }
            (Vec::new(), answer)
        }
    };

    Some((
        QuizItem {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: ctx.document_id.to_string(),
            content_id,
            quiz_type,
            question,
            choices,
            answer,
            explanation,
            category,
            evidence: None,
            evidence_span: None,
            created_at: Some(Utc::now()),
        },
        repaired,
    ))
}

/// Maps a model's answer onto one of the four choices: verbatim,
/// case-insensitively, as a letter `A`-`D`, as a 1-based number, or as the
/// only choice containing the answer text.
fn resolve_choice(choices: &[String], answer: &str) -> Option<String> {
    if let Some(exact) = choices.iter().find(|c| c.as_str() == answer) {
        return Some(exact.clone());
    }
    if let Some(folded) = choices.iter().find(|c| c.eq_ignore_ascii_case(answer)) {
        return Some(folded.clone());
    }

    let marker: String = answer
        .trim_matches(|c: char| c == '(' || c == ')' || c == '.' || c.is_whitespace())
        .to_string();
    let index = match marker.to_ascii_uppercase().as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=choices.len()).contains(n))
            .map(|n| n - 1),
    };

    if let Some(choice) = index.and_then(|i| choices.get(i)) {
        return Some(choice.clone());
    }

    let needle = answer.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let mut containing = choices.iter().filter(|c| c.to_lowercase().contains(&needle));
    match (containing.next(), containing.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}
