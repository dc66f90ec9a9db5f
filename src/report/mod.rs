//! Results report parsing and summarization
//!
//! - `model` - Serde model of the runner's JSON report
//! - `summary` - Scenario status precedence, durations and failure records

pub mod model;
pub mod summary;

pub use model::{
    FeatureResult, ReportError, ResultsReport, ScenarioResult, StepOutcome, StepResult, StepStatus,
};
pub use summary::{scenario_status, summarize, FailureRecord, ScenarioStatus, Summary};
