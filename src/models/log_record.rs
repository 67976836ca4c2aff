//! Per-spec log records written by each runner worker.
//!
//! Workers are not strict about types: capabilities may be an object, verdict
//! flags may be numbers and errors may be objects. Deserialization normalizes
//! all of these so the aggregator only sees one shape.

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value as JsonValue};

use crate::error::AppResult;

/// One parsed per-spec log file.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub spec_file: String,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub capabilities: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: Option<Number>,
    #[serde(default)]
    pub start: Option<JsonValue>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub passed: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub failed: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub skipped: bool,
    #[serde(default)]
    pub tests: Vec<TestOccurrence>,
}

impl LogRecord {
    /// Parse a log file's content.
    pub fn parse(content: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Kind of entry in a suite's test list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccurrenceKind {
    /// Setup/teardown hook
    Hook,
    #[default]
    Test,
}

/// One raw test entry inside a log record.
#[derive(Debug, Clone, Deserialize)]
pub struct TestOccurrence {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_kind")]
    pub kind: OccurrenceKind,
    #[serde(default)]
    pub duration: Option<Number>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub passed: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub failed: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub skipped: bool,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default, deserialize_with = "lenient_errors")]
    pub errors: Vec<String>,
}

impl TestOccurrence {
    pub fn is_hook(&self) -> bool {
        self.kind == OccurrenceKind::Hook
    }
}

/// Strings stay as-is, anything else becomes its compact JSON text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s,
        other => other.to_string(),
    })
}

/// Truthiness of booleans, numbers, strings and null.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Bool(b) => b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Null => false,
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    })
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<OccurrenceKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) if s == "hook" => OccurrenceKind::Hook,
        _ => OccurrenceKind::Test,
    })
}

/// Errors are strings; objects contribute their `message` when present.
fn lenient_errors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<JsonValue>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .map(|value| match value {
            JsonValue::String(s) => s,
            JsonValue::Object(ref map) => match map.get("message") {
                Some(JsonValue::String(message)) => message.clone(),
                _ => value.to_string(),
            },
            other => other.to_string(),
        })
        .collect())
}
