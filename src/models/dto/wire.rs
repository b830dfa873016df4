//! Wire shapes the generation service is asked to emit.
//!
//! Nothing the model writes is trusted: every field is optional and coerced
//! leniently (numbers written as strings, floats for ints, and so on). The
//! validator turns these into domain records.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A payload shape recoverable from a JSON value.
pub trait WireFormat: Sized {
    /// Returns `None` when the value does not have this payload's shape.
    fn from_payload(value: Value) -> Option<Self>;
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EvidenceWire {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub evidence: Option<String>,
    #[serde(
        default,
        rename = "startIndex",
        alias = "start_index",
        deserialize_with = "lenient_opt_i64"
    )]
    pub start_index: Option<i64>,
    #[serde(
        default,
        rename = "endIndex",
        alias = "end_index",
        deserialize_with = "lenient_opt_i64"
    )]
    pub end_index: Option<i64>,
}

impl WireFormat for EvidenceWire {
    fn from_payload(value: Value) -> Option<Self> {
        let has_field = value.as_object().is_some_and(|o| o.contains_key("evidence"));
        if !has_field {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GradingWire {
    #[serde(
        default,
        rename = "isCorrect",
        alias = "is_correct",
        deserialize_with = "lenient_opt_bool"
    )]
    pub is_correct: Option<bool>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub feedback: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub explanation: Option<String>,
}

impl WireFormat for GradingWire {
    fn from_payload(value: Value) -> Option<Self> {
        let has_field = value.as_object().is_some_and(|o| {
            o.contains_key("isCorrect") || o.contains_key("is_correct") || o.contains_key("score")
        });
        if !has_field {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct QuizWire {
    #[serde(default, alias = "type", deserialize_with = "lenient_opt_string")]
    pub quiz_type: Option<String>,
    #[serde(default, alias = "question", deserialize_with = "lenient_opt_string")]
    pub quiz_question: Option<String>,
    #[serde(default, alias = "choices", deserialize_with = "lenient_opt_string_vec")]
    pub quiz_choices: Option<Vec<String>>,
    #[serde(default, alias = "answer", deserialize_with = "lenient_opt_string")]
    pub quiz_answer: Option<String>,
    #[serde(default, alias = "explanation", deserialize_with = "lenient_opt_string")]
    pub quiz_explanation: Option<String>,
    #[serde(default, alias = "contentIndex", deserialize_with = "lenient_opt_i64")]
    pub content_index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub category: Option<String>,
}

/// The quiz payload: a bare array, or an object wrapping one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuizWireSet(pub Vec<QuizWire>);

const QUIZ_WRAPPER_KEYS: [&str; 4] = ["quizzes", "questions", "items", "quiz"];

impl WireFormat for QuizWireSet {
    fn from_payload(value: Value) -> Option<Self> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => QUIZ_WRAPPER_KEYS
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(items)) => Some(items),
                    _ => None,
                })?,
            _ => return None,
        };

        Some(QuizWireSet(
            items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ))
    }
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => parse_bool_word(s),
        _ => None,
    }
}

pub fn parse_bool_word(word: &str) -> Option<bool> {
    match word.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "correct" | "o" => Some(true),
        "false" | "no" | "incorrect" | "x" => Some(false),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

fn lenient_opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_bool))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_string))
}

fn lenient_opt_string_vec<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(items.iter().filter_map(value_as_string).collect()),
        // some models double-encode the array as a string
        Some(Value::String(s)) => serde_json::from_str::<Vec<Value>>(&s)
            .ok()
            .map(|items| items.iter().filter_map(value_as_string).collect()),
        _ => None,
    })
}
