//! Triage error types

use crate::config::LoadError;
use crate::engine::result::RunRecord;
use crate::report::ReportError;

/// Errors returned by run and analysis operations
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cannot find test runner executable (tried {0})")]
    ToolNotFound(String),

    /// The run was killed at the deadline; its sidecar was still written
    #[error("Test run timed out after {seconds}s")]
    Timeout {
        seconds: u64,
        record: Box<RunRecord>,
    },

    #[error("Malformed report: {0}")]
    MalformedReport(#[from] ReportError),

    #[error("Run not found: {0}")]
    NotFound(String),

    #[error("No results found. Run tests first.")]
    NoRuns,

    #[error("Invalid run_id format: {0:?}")]
    InvalidRunId(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No failure found for scenario '{0}'")]
    FailureNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<LoadError> for TriageError {
    fn from(e: LoadError) -> Self {
        TriageError::Config(e.to_string())
    }
}

impl From<regex::Error> for TriageError {
    fn from(e: regex::Error) -> Self {
        TriageError::Config(format!("invalid regex: {}", e))
    }
}

impl TriageError {
    /// Run metadata captured before the error, if any
    pub fn record(&self) -> Option<&RunRecord> {
        match self {
            TriageError::Timeout { record, .. } => Some(record.as_ref()),
            _ => None,
        }
    }

    /// Stable snake_case name for structured output
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::InvalidPath(_) => "invalid_path",
            TriageError::ToolNotFound(_) => "tool_not_found",
            TriageError::Timeout { .. } => "timeout",
            TriageError::MalformedReport(_) => "malformed_report",
            TriageError::NotFound(_) => "not_found",
            TriageError::NoRuns => "no_runs",
            TriageError::InvalidRunId(_) => "invalid_run_id",
            TriageError::InvalidArgument(_) => "invalid_argument",
            TriageError::FailureNotFound(_) => "failure_not_found",
            TriageError::Io(_) => "io",
            TriageError::Json(_) => "json",
            TriageError::Config(_) => "config",
        }
    }
}
