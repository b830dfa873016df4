//! Deterministic stand-ins used when generation fails or is not needed.
//!
//! Nothing here calls the generation service, so every result is available
//! even while the upstream is down.

use chrono::Utc;

use crate::{
    constants::messages,
    models::domain::{
        grading::{clamp_score, GradingResult},
        quiz_item::{normalize_ox_answer, MULTIPLE_CHOICE_OPTION_COUNT},
        ContentUnit, QuizItem, QuizType,
    },
};

const EXCERPT_MAX_CHARS: usize = 120;
const ESSAY_TARGET_CHARS: f64 = 50.0;
const ESSAY_KEYWORD_BONUS: f64 = 50.0;
const ESSAY_PASS_SCORE: i64 = 60;
const SHORT_ANSWER_PASS_ACCURACY: f64 = 0.5;

/// Exact match after trimming; OX answers are compared in canonical form.
pub fn grade_objective(
    quiz_type: QuizType,
    reference_answer: &str,
    candidate_answer: &str,
    explanation: Option<&str>,
) -> GradingResult {
    let is_correct = match quiz_type {
        QuizType::Ox => match (
            normalize_ox_answer(reference_answer),
            normalize_ox_answer(candidate_answer),
        ) {
            (Some(reference), Some(candidate)) => reference == candidate,
            _ => reference_answer.trim() == candidate_answer.trim(),
        },
        _ => reference_answer.trim() == candidate_answer.trim(),
    };

    GradingResult {
        is_correct,
        score: if is_correct { 100 } else { 0 },
        feedback: if is_correct {
            messages::EXACT_MATCH_CORRECT_FEEDBACK.to_string()
        } else {
            messages::EXACT_MATCH_WRONG_FEEDBACK.to_string()
        },
        explanation: explanation_or_default(explanation),
    }
}

/// Token-overlap estimate for short answers.
///
/// A candidate token counts when it contains, or is contained in, any
/// reference token. Accuracy is matches over the longer token list.
pub fn grade_short_answer(
    reference_answer: &str,
    candidate_answer: &str,
    explanation: Option<&str>,
) -> GradingResult {
    let reference = tokens(reference_answer);
    let candidate = tokens(candidate_answer);

    let longest = candidate.len().max(reference.len());
    let accuracy = if longest == 0 {
        0.0
    } else {
        let matches = candidate
            .iter()
            .filter(|c| {
                reference
                    .iter()
                    .any(|r| c.contains(r.as_str()) || r.contains(c.as_str()))
            })
            .count();
        matches as f64 / longest as f64
    };

    heuristic_result(
        accuracy > SHORT_ANSWER_PASS_ACCURACY,
        (accuracy * 100.0).round() as i64,
        explanation,
    )
}

/// Length and keyword estimate for essays.
pub fn grade_essay(
    reference_answer: &str,
    candidate_answer: &str,
    explanation: Option<&str>,
) -> GradingResult {
    let candidate = candidate_answer.trim();
    let reference = reference_answer.trim();

    let length_score = (100.0 * candidate.chars().count() as f64 / ESSAY_TARGET_CHARS).min(100.0);
    let keyword_score = if !reference.is_empty() && candidate.contains(reference) {
        ESSAY_KEYWORD_BONUS
    } else {
        0.0
    };
    let score = ((length_score + keyword_score) / 2.0).round() as i64;

    heuristic_result(score > ESSAY_PASS_SCORE, score, explanation)
}

/// Picks the deterministic grader for the question type.
pub fn grade_without_model(
    quiz_type: QuizType,
    reference_answer: &str,
    candidate_answer: &str,
    explanation: Option<&str>,
) -> GradingResult {
    match quiz_type {
        QuizType::MultipleChoice | QuizType::Ox => {
            grade_objective(quiz_type, reference_answer, candidate_answer, explanation)
        }
        QuizType::ShortAnswer => grade_short_answer(reference_answer, candidate_answer, explanation),
        QuizType::Essay => grade_essay(reference_answer, candidate_answer, explanation),
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn explanation_or_default(explanation: Option<&str>) -> String {
    explanation
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(messages::DEFAULT_GRADING_EXPLANATION)
        .to_string()
}

fn heuristic_result(is_correct: bool, score: i64, explanation: Option<&str>) -> GradingResult {
    GradingResult {
        is_correct,
        score: clamp_score(score),
        feedback: messages::FALLBACK_GRADING_FEEDBACK.to_string(),
        explanation: explanation_or_default(explanation),
    }
}

/// Builds `count` template items from the source units, cycling through the
/// requested types and units. `start_offset` continues numbering when the
/// items top up a partially generated quiz.
pub fn build_fallback_quiz(
    document_id: &str,
    units: &[ContentUnit],
    question_types: &[QuizType],
    count: usize,
    start_offset: usize,
) -> Vec<QuizItem> {
    let default_types = [QuizType::MultipleChoice];
    let types = if question_types.is_empty() {
        &default_types[..]
    } else {
        question_types
    };

    (0..count)
        .map(|i| {
            let n = start_offset + i;
            let unit = (!units.is_empty()).then(|| &units[n % units.len()]);
            let quiz_type = types[n % types.len()];
            let excerpt = unit
                .map(|u| excerpt(&u.text))
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| format!("Key point {}", n + 1));

            fallback_item(document_id, unit, quiz_type, n, excerpt)
        })
        .collect()
}

fn fallback_item(
    document_id: &str,
    unit: Option<&ContentUnit>,
    quiz_type: QuizType,
    n: usize,
    excerpt: String,
) -> QuizItem {
    let number = n + 1;
    let (question, choices, answer) = match quiz_type {
        QuizType::MultipleChoice => {
            let mut choices: Vec<String> = (1..MULTIPLE_CHOICE_OPTION_COUNT)
                .map(|k| format!("This statement does not appear in the source ({})", k))
                .collect();
            choices.insert(n % MULTIPLE_CHOICE_OPTION_COUNT, excerpt.clone());
            (
                format!("Question {}: Which statement appears in the source paragraph?", number),
                choices,
                excerpt,
            )
        }
        QuizType::Ox => (
            format!("Question {}: True or false? \"{}\"", number, excerpt),
            Vec::new(),
            "O".to_string(),
        ),
        QuizType::ShortAnswer => (
            format!("Question {}: State the key point of the source paragraph.", number),
            Vec::new(),
            excerpt,
        ),
        QuizType::Essay => (
            format!("Question {}: Explain the source paragraph in your own words.", number),
            Vec::new(),
            excerpt,
        ),
    };

    QuizItem {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        content_id: unit.map(|u| u.id.clone()),
        quiz_type,
        question,
        choices,
        answer,
        explanation: messages::DEFAULT_QUIZ_EXPLANATION.to_string(),
        category: None,
        evidence: None,
        evidence_span: None,
        created_at: Some(Utc::now()),
    }
}

/// First sentence of the text, capped at a fixed number of characters.
fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    let sentence_end = trimmed
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?' | '。'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());

    trimmed[..sentence_end]
        .chars()
        .take(EXCERPT_MAX_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::grading::{MAX_SCORE, MIN_SCORE};

    fn units(count: usize) -> Vec<ContentUnit> {
        (0..count)
            .map(|i| {
                ContentUnit::new(
                    "doc-1",
                    i as i64,
                    &format!("Paragraph {} explains a concept. It has a second sentence.", i),
                )
            })
            .collect()
    }

    #[test]
    fn objective_grading_is_exact_match_after_trim() {
        let right = grade_objective(QuizType::MultipleChoice, "Paris", " Paris ", None);
        let wrong = grade_objective(QuizType::MultipleChoice, "Paris", "paris", None);

        assert!(right.is_correct);
        assert_eq!(right.score, 100);
        assert!(!wrong.is_correct);
        assert_eq!(wrong.score, 0);
        assert_eq!(wrong.explanation, messages::DEFAULT_GRADING_EXPLANATION);
    }

    #[test]
    fn ox_grading_accepts_equivalent_spellings() {
        assert!(grade_objective(QuizType::Ox, "O", "true", None).is_correct);
        assert!(!grade_objective(QuizType::Ox, "O", "X", None).is_correct);
    }

    #[test]
    fn short_answer_partial_overlap() {
        // "attention" matches, "mechanism" and "is" do not: 1 / 3
        let result = grade_short_answer("self-attention", "attention mechanism is", None);
        assert_eq!(result.score, 33);
        assert!(!result.is_correct);
        assert_eq!(result.feedback, messages::FALLBACK_GRADING_FEEDBACK);
    }

    #[test]
    fn short_answer_full_overlap_is_correct() {
        let result = grade_short_answer("Gradient Descent", "gradient descent", Some("Optimizer"));
        assert_eq!(result.score, 100);
        assert!(result.is_correct);
        assert_eq!(result.explanation, "Optimizer");
    }

    #[test]
    fn short_answer_both_empty_scores_zero() {
        let result = grade_short_answer("", "   ", None);
        assert_eq!(result.score, 0);
        assert!(!result.is_correct);
    }

    #[test]
    fn essay_rewards_length_and_keyword() {
        let reference = "backpropagation";
        let long_answer =
            "Backpropagation computes gradients layer by layer; backpropagation uses the chain rule.";
        let result = grade_essay(reference, long_answer, None);
        // length 100, keyword 50 -> 75
        assert_eq!(result.score, 75);
        assert!(result.is_correct);

        let short = grade_essay(reference, "too short", None);
        // 9 chars -> length 18, no keyword -> 9
        assert_eq!(short.score, 9);
        assert!(!short.is_correct);
    }

    #[test]
    fn grade_without_model_dispatches_by_type() {
        let essay = grade_without_model(QuizType::Essay, "x", "", None);
        assert_eq!(essay.score, 0);

        let objective = grade_without_model(QuizType::Ox, "X", "x", None);
        assert!(objective.is_correct);
    }

    #[test]
    fn heuristic_grading_is_deterministic() {
        let cases = [
            (QuizType::ShortAnswer, "Softmax normalization", "softmax normalizes scores"),
            (QuizType::ShortAnswer, "gradient descent", ""),
            (QuizType::ShortAnswer, "", "anything at all"),
            (
                QuizType::Essay,
                "learning rate",
                "The learning rate controls the step size of each update.",
            ),
            (QuizType::Essay, "momentum", "short"),
            (QuizType::MultipleChoice, "Adam", " Adam "),
            (QuizType::Ox, "O", "true"),
            (QuizType::Ox, "X", "참"),
        ];

        for (quiz_type, reference, candidate) in cases {
            let first = grade_without_model(quiz_type, reference, candidate, Some("why"));
            let second = grade_without_model(quiz_type, reference, candidate, Some("why"));
            assert_eq!(first, second, "{} {:?} vs {:?}", quiz_type, reference, candidate);

            if quiz_type == QuizType::ShortAnswer {
                assert_eq!(
                    grade_short_answer(reference, candidate, None),
                    grade_short_answer(reference, candidate, None)
                );
            }
            if quiz_type == QuizType::Essay {
                assert_eq!(
                    grade_essay(reference, candidate, None),
                    grade_essay(reference, candidate, None)
                );
            }
            assert!((MIN_SCORE..=MAX_SCORE).contains(&first.score));
        }
    }

    #[test]
    fn scenario_d_fallback_quiz_has_requested_multiple_choice_items() {
        let source = units(3);
        let items = build_fallback_quiz("doc-1", &source, &[QuizType::MultipleChoice], 5, 0);

        assert_eq!(items.len(), 5);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.quiz_type, QuizType::MultipleChoice);
            assert_eq!(item.choices.len(), 4);
            assert!(item.choices.contains(&item.answer));
            assert_eq!(item.choices[i % 4], item.answer);
            assert!(item.is_well_formed());
            assert_eq!(item.content_id.as_deref(), Some(source[i % 3].id.as_str()));
        }
    }

    #[test]
    fn fallback_cycles_types_and_respects_offset() {
        let source = units(2);
        let items = build_fallback_quiz(
            "doc-1",
            &source,
            &[QuizType::Ox, QuizType::ShortAnswer],
            3,
            1,
        );

        assert_eq!(items[0].quiz_type, QuizType::ShortAnswer);
        assert_eq!(items[1].quiz_type, QuizType::Ox);
        assert_eq!(items[1].answer, "O");
        assert_eq!(items[0].answer, "Paragraph 1 explains a concept.");
        assert!(items[0].question.starts_with("Question 2"));
        assert!(items.iter().all(QuizItem::is_well_formed));
    }

    #[test]
    fn fallback_without_units_still_produces_items() {
        let items = build_fallback_quiz("doc-1", &[], &[QuizType::Essay], 2, 0);

        assert_eq!(items.len(), 2);
        assert!(items[0].content_id.is_none());
        assert_eq!(items[0].answer, "Key point 1");
    }

    #[test]
    fn excerpt_is_truncated_to_limit() {
        let long = "a".repeat(300);
        assert_eq!(excerpt(&long).chars().count(), EXCERPT_MAX_CHARS);
        assert_eq!(excerpt("First. Second."), "First.");
    }
}
