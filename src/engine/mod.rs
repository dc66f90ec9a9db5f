//! Run lifecycle engine
//!
//! This module contains:
//! - `run_manager` - Launches runs and answers run/failure queries
//! - `run_store` - Run ids, metadata sidecars, retention and screenshots
//! - `tool` - Test runner resolution and timed invocation
//! - `error` - Triage error types
//! - `result` - Run, results and analysis payloads

pub mod error;
pub mod result;
pub mod run_manager;
pub mod run_store;
pub mod tool;

pub use error::TriageError;
pub use result::{FailureAnalysis, FailureDetails, RunOutcome, RunRecord, RunResults};
pub use run_manager::{RunManager, RunRequest, DRY_RUN_NOTE};
pub use run_store::{generate_run_id, validate_run_id, RunStore};
pub use tool::{ProcessOutcome, ToolCommand, ToolLocator, ToolSource};
