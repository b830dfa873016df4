//! Recovers structured payloads from raw model text.
//!
//! Tiers are tried in order and the first success wins:
//! 1. strict parse of the whole text
//! 2. fenced code block, then balanced `{...}` / `[...]` spans
//! 3. per-field regex (evidence and grading only)
//! 4. line scan for a quoted excerpt (evidence only)

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::generation::ParseTier,
        dto::wire::{parse_bool_word, EvidenceWire, GradingWire, QuizWireSet, WireFormat},
    },
};

/// Quoted strings shorter than this are not treated as evidence by the line scan.
const LINE_SCAN_MIN_QUOTE_LEN: usize = 11;
const LINE_SCAN_FIELD_NAMES: [&str; 5] = ["evidence", "excerpt", "quote", "근거", "source"];
const MAX_SPAN_CANDIDATES: usize = 16;
const MAX_SPAN_OPENERS: usize = 64;
const TEXT_FIELDS: [&str; 5] = ["summary", "notes", "translation", "text", "content"];

static EVIDENCE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"evidence"\s*:\s*(?:(null)|"((?:[^"\\]|\\.)*)")"#)
        .expect("EVIDENCE_FIELD is a valid regex pattern")
});
static START_INDEX_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"start_?index"\s*:\s*"?(-?\d+)"#)
        .expect("START_INDEX_FIELD is a valid regex pattern")
});
static END_INDEX_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"end_?index"\s*:\s*"?(-?\d+)"#)
        .expect("END_INDEX_FIELD is a valid regex pattern")
});
static IS_CORRECT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"is_?correct"\s*:\s*"?(true|false)"?"#)
        .expect("IS_CORRECT_FIELD is a valid regex pattern")
});
static SCORE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"score"\s*:\s*"?(-?\d+(?:\.\d+)?)"#)
        .expect("SCORE_FIELD is a valid regex pattern")
});
static FEEDBACK_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"feedback"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("FEEDBACK_FIELD is a valid regex pattern")
});
static EXPLANATION_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)"explanation"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("EXPLANATION_FIELD is a valid regex pattern")
});
static QUOTED_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["“]([^"“”]+)["”]"#).expect("QUOTED_TEXT is a valid regex pattern")
});

#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub tier: ParseTier,
}

impl<T> Parsed<T> {
    fn new(value: T, tier: ParseTier) -> Self {
        Parsed { value, tier }
    }
}

fn unparseable(kind: &str, raw: &str) -> AppError {
    AppError::MalformedResponse(format!(
        "no {} payload recoverable from response: {}",
        kind,
        preview(raw)
    ))
}

/// First 120 characters of a response, for logs and error messages.
pub fn preview(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(120) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

pub fn parse_evidence(raw: &str) -> AppResult<Parsed<EvidenceWire>> {
    parse_structured::<EvidenceWire>(raw)
        .or_else(|| evidence_from_fields(raw).map(|w| Parsed::new(w, ParseTier::FieldPattern)))
        .or_else(|| evidence_from_lines(raw).map(|w| Parsed::new(w, ParseTier::LineScan)))
        .ok_or_else(|| unparseable("evidence", raw))
}

pub fn parse_grading(raw: &str) -> AppResult<Parsed<GradingWire>> {
    parse_structured::<GradingWire>(raw)
        .or_else(|| grading_from_fields(raw).map(|w| Parsed::new(w, ParseTier::FieldPattern)))
        .ok_or_else(|| unparseable("grading", raw))
}

pub fn parse_quiz_items(raw: &str) -> AppResult<Parsed<QuizWireSet>> {
    parse_structured::<QuizWireSet>(raw).ok_or_else(|| unparseable("quiz", raw))
}

/// Summaries are free text; JSON or fenced wrappers are peeled off when present.
pub fn parse_summary(raw: &str) -> AppResult<Parsed<String>> {
    parse_free_text(raw, "summary")
}

pub fn parse_translation(raw: &str) -> AppResult<Parsed<String>> {
    parse_free_text(raw, "translation")
}

fn parse_free_text(raw: &str, kind: &str) -> AppResult<Parsed<String>> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(text) = text_from_value(&value) {
            return Ok(Parsed::new(text, ParseTier::Strict));
        }
    }

    if let Some(block) = fenced_blocks(trimmed).into_iter().next() {
        let text = serde_json::from_str::<Value>(block)
            .ok()
            .and_then(|v| text_from_value(&v))
            .unwrap_or_else(|| block.to_string());
        if !text.trim().is_empty() {
            return Ok(Parsed::new(text.trim().to_string(), ParseTier::Fenced));
        }
    }

    if trimmed.is_empty() {
        return Err(AppError::MalformedResponse(format!(
            "{} response was empty",
            kind
        )));
    }
    Ok(Parsed::new(trimmed.to_string(), ParseTier::Strict))
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Object(map) => TEXT_FIELDS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string()),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

/// Tiers 1 and 2.
fn parse_structured<T: WireFormat>(raw: &str) -> Option<Parsed<T>> {
    let trimmed = raw.trim();

    if let Some(value) = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(T::from_payload)
    {
        return Some(Parsed::new(value, ParseTier::Strict));
    }

    fenced_blocks(trimmed)
        .into_iter()
        .chain(balanced_spans(trimmed))
        .find_map(|candidate| {
            serde_json::from_str::<Value>(candidate)
                .ok()
                .and_then(T::from_payload)
        })
        .map(|value| Parsed::new(value, ParseTier::Fenced))
}

/// Contents of every ``` fenced block, language tag removed.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        // skip the language tag, e.g. "json\n"
        let body_start = match after_fence.find('\n') {
            Some(newline) if !after_fence[..newline].contains('{') => newline + 1,
            _ => 0,
        };
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(close) => {
                blocks.push(body[..close].trim());
                rest = &body[close + 3..];
            }
            None => break,
        }
    }

    blocks
}

/// Balanced `{...}` or `[...]` spans in order of their opening bracket.
fn balanced_spans(text: &str) -> Vec<&str> {
    text.char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .take(MAX_SPAN_OPENERS)
        .filter_map(|(start, _)| balanced_span_at(text, start))
        .take(MAX_SPAN_CANDIDATES)
        .collect()
}

fn balanced_span_at(text: &str, start: usize) -> Option<&str> {
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(c) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Undoes JSON string escaping for a regex-captured string body.
fn unescape(captured: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", captured))
        .unwrap_or_else(|_| captured.replace("\\\"", "\""))
}

fn capture_i64(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn capture_string(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
}

/// Tier 3 for evidence.
fn evidence_from_fields(raw: &str) -> Option<EvidenceWire> {
    let caps = EVIDENCE_FIELD.captures(raw)?;
    let evidence = match caps.get(1) {
        Some(_) => None, // explicit null
        None => caps.get(2).map(|m| unescape(m.as_str())),
    };

    Some(EvidenceWire {
        evidence,
        start_index: capture_i64(&START_INDEX_FIELD, raw),
        end_index: capture_i64(&END_INDEX_FIELD, raw),
    })
}

/// Tier 4 for evidence: indices are unknown.
fn evidence_from_lines(raw: &str) -> Option<EvidenceWire> {
    raw.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            LINE_SCAN_FIELD_NAMES.iter().any(|name| lower.contains(name))
        })
        .find_map(|line| {
            QUOTED_TEXT
                .captures_iter(line)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .find(|quoted| quoted.chars().count() >= LINE_SCAN_MIN_QUOTE_LEN)
                .map(str::to_string)
        })
        .map(|text| EvidenceWire {
            evidence: Some(text),
            start_index: None,
            end_index: None,
        })
}

/// Tier 3 for grading. Needs at least one of `isCorrect` or `score`.
fn grading_from_fields(raw: &str) -> Option<GradingWire> {
    let is_correct = IS_CORRECT_FIELD
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_bool_word(m.as_str()));
    let score = SCORE_FIELD
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|f| f.round() as i64);

    if is_correct.is_none() && score.is_none() {
        return None;
    }

    Some(GradingWire {
        is_correct,
        score,
        feedback: capture_string(&FEEDBACK_FIELD, raw),
        explanation: capture_string(&EXPLANATION_FIELD, raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_a_valid_json_is_parsed_by_tier_one() {
        let raw = r#"{"evidence":"The model achieves 92% accuracy on the benchmark.","startIndex":10,"endIndex":58}"#;

        let parsed = parse_evidence(raw).expect("valid evidence json");

        assert_eq!(parsed.tier, ParseTier::Strict);
        assert_eq!(
            parsed.value.evidence.as_deref(),
            Some("The model achieves 92% accuracy on the benchmark.")
        );
        assert_eq!(parsed.value.start_index, Some(10));
        assert_eq!(parsed.value.end_index, Some(58));
    }

    #[test]
    fn scenario_b_fenced_grading_is_parsed_by_tier_two() {
        let raw = "```json\n{\"isCorrect\":true,\"score\":150,\"feedback\":\"good\"}\n```";

        let parsed = parse_grading(raw).expect("fenced grading json");

        assert_eq!(parsed.tier, ParseTier::Fenced);
        assert_eq!(parsed.value.is_correct, Some(true));
        assert_eq!(parsed.value.score, Some(150));
        assert_eq!(parsed.value.feedback.as_deref(), Some("good"));
    }

    #[test]
    fn scenario_c_prose_with_field_is_parsed_by_tier_three() {
        let raw = r#"Sure, here: "evidence": "short""#;

        let parsed = parse_evidence(raw).expect("field pattern evidence");

        assert_eq!(parsed.tier, ParseTier::FieldPattern);
        assert_eq!(parsed.value.evidence.as_deref(), Some("short"));
        assert_eq!(parsed.value.start_index, None);
    }

    #[test]
    fn json_wrapped_in_prose_uses_balanced_span() {
        let raw = r#"Here is the grade you asked for: {"isCorrect": false, "score": 35, "feedback": "Missing {key} idea"} Hope it helps!"#;

        let parsed = parse_grading(raw).expect("embedded grading json");

        assert_eq!(parsed.tier, ParseTier::Fenced);
        assert_eq!(parsed.value.score, Some(35));
        assert_eq!(parsed.value.feedback.as_deref(), Some("Missing {key} idea"));
    }

    #[test]
    fn trailing_comma_falls_through_to_field_patterns() {
        let raw = r#"{"evidence": "Attention weights are \"normalized\" by softmax.", "startIndex": 3, "endIndex": 50,}"#;

        let parsed = parse_evidence(raw).expect("near-json evidence");

        assert_eq!(parsed.tier, ParseTier::FieldPattern);
        assert_eq!(
            parsed.value.evidence.as_deref(),
            Some("Attention weights are \"normalized\" by softmax.")
        );
        assert_eq!(parsed.value.start_index, Some(3));
        assert_eq!(parsed.value.end_index, Some(50));
    }

    #[test]
    fn line_scan_recovers_quoted_evidence_without_indices() {
        let raw = "I could not format JSON.\nEvidence: “The dataset contains 10,000 labelled images.”\nThanks.";

        let parsed = parse_evidence(raw).expect("line scanned evidence");

        assert_eq!(parsed.tier, ParseTier::LineScan);
        assert_eq!(
            parsed.value.evidence.as_deref(),
            Some("The dataset contains 10,000 labelled images.")
        );
        assert_eq!(parsed.value.start_index, None);
    }

    #[test]
    fn line_scan_ignores_short_quotes() {
        let raw = "evidence: \"too short\"";
        assert!(matches!(
            parse_evidence(raw),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn explicit_null_evidence_is_parsed() {
        let parsed = parse_evidence(r#"{"evidence": null, "startIndex": -1, "endIndex": -1}"#)
            .expect("null evidence");

        assert_eq!(parsed.tier, ParseTier::Strict);
        assert!(parsed.value.evidence.is_none());
        assert_eq!(parsed.value.start_index, Some(-1));
    }

    #[test]
    fn valid_json_never_leaves_tier_one() {
        let raw = r#"{"isCorrect": true, "score": 80, "feedback": "```json is not a fence here```"}"#;
        let parsed = parse_grading(raw).expect("valid grading");
        assert_eq!(parsed.tier, ParseTier::Strict);
    }

    #[test]
    fn grading_without_known_fields_is_unparseable() {
        let result = parse_grading("The answer looks mostly right to me.");
        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
    }

    #[test]
    fn grading_field_patterns_accept_quoted_values() {
        let raw = r#"{"isCorrect": "false", "score": "72.4", "explanation": "Partly right" oops"#;
        let parsed = parse_grading(raw).expect("near-json grading");

        assert_eq!(parsed.tier, ParseTier::FieldPattern);
        assert_eq!(parsed.value.is_correct, Some(false));
        assert_eq!(parsed.value.score, Some(72));
        assert_eq!(parsed.value.explanation.as_deref(), Some("Partly right"));
    }

    #[test]
    fn quiz_array_inside_fence_with_prose() {
        let raw = "Here you go:\n```json\n[{\"quiz_type\":\"ox\",\"quiz_question\":\"Q\",\"quiz_answer\":\"O\",\"quiz_explanation\":\"E\",\"content_index\":0}]\n```\nGood luck!";

        let parsed = parse_quiz_items(raw).expect("fenced quiz array");

        assert_eq!(parsed.tier, ParseTier::Fenced);
        assert_eq!(parsed.value.0.len(), 1);
    }

    #[test]
    fn quiz_unlabelled_fence_is_extracted() {
        let raw = "```\n[{\"quiz_question\":\"Q\"}]\n```";
        let parsed = parse_quiz_items(raw).expect("unlabelled fence");
        assert_eq!(parsed.value.0.len(), 1);
    }

    #[test]
    fn quiz_garbage_is_unparseable() {
        assert!(parse_quiz_items("I cannot help with that.").is_err());
        assert!(parse_quiz_items("[1, 2").is_err());
    }

    #[test]
    fn summary_plain_text_is_kept() {
        let parsed = parse_summary("  - point one\n- point two  ").expect("summary");
        assert_eq!(parsed.value, "- point one\n- point two");
    }

    #[test]
    fn summary_unwraps_json_and_fences() {
        let json = parse_summary(r#"{"summary": "- fact"}"#).expect("json summary");
        assert_eq!(json.value, "- fact");

        let fenced = parse_summary("```markdown\n- fenced fact\n```").expect("fenced summary");
        assert_eq!(fenced.value, "- fenced fact");
        assert_eq!(fenced.tier, ParseTier::Fenced);
    }

    #[test]
    fn translation_unwraps_translation_field() {
        let parsed = parse_translation(r#"{"translation": "어텐션은 가중 평균이다."}"#)
            .expect("translation");
        assert_eq!(parsed.value, "어텐션은 가중 평균이다.");
    }

    #[test]
    fn empty_summary_is_malformed() {
        assert!(matches!(
            parse_summary("   \n "),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn balanced_span_respects_strings_and_nesting() {
        let text = r#"x {"a": "}", "b": [1, {"c": 2}]} y"#;
        let spans = balanced_spans(text);
        assert_eq!(spans[0], r#"{"a": "}", "b": [1, {"c": 2}]}"#);
    }

    #[test]
    fn bracket_heavy_output_only_tries_leading_openers() {
        let unclosed = "[".repeat(20_000);
        assert!(balanced_spans(&unclosed).is_empty());

        let late = format!("{}{}", "[".repeat(MAX_SPAN_OPENERS), r#"{"a": 1}"#);
        assert!(balanced_spans(&late).is_empty());

        let early = format!("{}{}", "] ".repeat(100), r#"[{"a": 1}]"#);
        assert_eq!(balanced_spans(&early), vec![r#"[{"a": 1}]"#, r#"{"a": 1}"#]);
    }

    #[test]
    fn preview_truncates_long_text() {
        let long = "a".repeat(300);
        assert_eq!(preview(&long).chars().count(), 121);
        assert_eq!(preview(" short "), "short");
    }
}
