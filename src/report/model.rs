//! Behave JSON report model
//!
//! The report is produced by the external runner and only ever read here.
//! Deserialization is lenient: missing names become empty strings, a missing
//! status is `undefined`, and durations / error messages stay raw JSON until
//! they are summarized.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors produced while reading a report artifact
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ReportError {
    #[error("Results file not found: {0}")]
    Missing(String),

    #[error("Failed to read results file: {0}")]
    Unreadable(String),

    #[error("Results file is empty")]
    Empty,

    #[error("Invalid JSON in results: {0}")]
    Malformed(String),

    #[error("Unexpected results format: {0}")]
    UnexpectedShape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    #[default]
    Undefined,
    Untested,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepOutcome {
    #[serde(default)]
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<Value>,
}

impl StepOutcome {
    /// Duration in seconds if the report carries a number
    pub fn seconds(&self) -> Option<f64> {
        self.duration.as_ref().and_then(Value::as_f64)
    }

    /// Error text with list messages joined by newlines
    pub fn error_text(&self) -> Option<String> {
        match self.error_message.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(lines) => Some(
                lines
                    .iter()
                    .map(|line| match line {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub keyword: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default)]
    pub result: StepOutcome,
}

impl StepResult {
    /// `keyword name`, or just the name when the keyword is blank
    pub fn display_text(&self) -> String {
        let keyword = self.keyword.trim();
        let name = self.name.trim();
        if keyword.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", keyword, name).trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioResult {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default)]
    pub steps: Vec<StepResult>,
}

impl ScenarioResult {
    /// Backgrounds and other element types are not scenarios
    pub fn is_scenario(&self) -> bool {
        self.kind == "scenario" || self.kind == "scenario_outline"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(default)]
    pub elements: Vec<ScenarioResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsReport {
    pub features: Vec<FeatureResult>,
}

impl ResultsReport {
    pub fn parse(content: &str) -> Result<Self, ReportError> {
        if content.trim().is_empty() {
            return Err(ReportError::Empty);
        }
        let raw: Value =
            serde_json::from_str(content).map_err(|e| ReportError::Malformed(e.to_string()))?;
        if !raw.is_array() {
            return Err(ReportError::UnexpectedShape(
                "top-level value is not an array".to_string(),
            ));
        }
        serde_json::from_value(raw).map_err(|e| ReportError::UnexpectedShape(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        if !path.exists() {
            return Err(ReportError::Missing(path.display().to_string()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ReportError::Unreadable(e.to_string()))?;
        Self::parse(&content)
    }
}

/// Accept strings, treat null as empty, and stringify anything else
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
