//! Run and analysis result types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lookup::{RelatedCodeSnippet, StepDefinitionMatch};
use crate::report::{FailureRecord, ReportError, Summary};

/// Metadata for one runner invocation, persisted as the `_meta.json` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub results_path: PathBuf,
    /// `None` when the run was killed at its deadline
    pub exit_code: Option<i32>,
    pub stdout_tail: Option<String>,
    pub stderr_tail: Option<String>,
    pub dry_run: bool,
    pub timed_out: bool,
    pub created_at: DateTime<Utc>,
}

/// Returned by a run that finished before its deadline
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    #[serde(flatten)]
    pub record: RunRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<ReportError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.record.exit_code == Some(0)
            && self.summary.as_ref().map(|s| s.failed == 0).unwrap_or(true)
    }
}

/// Stored results for a run: the summary, or why there is none, plus metadata
#[derive(Debug, Clone, Serialize)]
pub struct RunResults {
    pub run_id: String,
    pub results_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<ReportError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunRecord>,
}

impl RunResults {
    pub fn stdout_tail(&self) -> Option<&str> {
        self.metadata.as_ref()?.stdout_tail.as_deref()
    }

    pub fn stderr_tail(&self) -> Option<&str> {
        self.metadata.as_ref()?.stderr_tail.as_deref()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureDetails {
    pub run_id: String,
    pub results_path: PathBuf,
    pub stdout_tail: Option<String>,
    pub stderr_tail: Option<String>,
    pub failures: Vec<FailureRecord>,
    pub screenshot_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureAnalysis {
    pub run_id: String,
    pub results_path: PathBuf,
    pub scenario: String,
    pub error: String,
    pub failed_step: Option<String>,
    pub step_definition: Option<StepDefinitionMatch>,
    pub related_code: Vec<RelatedCodeSnippet>,
}
