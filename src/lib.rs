//! # Testing Triage
//!
//! Runs a Gherkin test suite through Behave, keeps the JSON reports it
//! produces, and explains failures by tracing each failed step back to the
//! step definition that implements it.
//!
//! ## Features
//!
//! - **Run retention** - Reports and run metadata are kept per run id, with
//!   the oldest runs evicted by modification time
//! - **Summaries** - Scenario pass/fail/skip counts, durations, and failure
//!   records with the first failing step
//! - **Failure analysis** - Step text to step definition, and on to the page
//!   objects and services it uses
//! - **Feature catalog** - Scenario listings and coverage counts per category
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use testing_triage::{RunManager, RunRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = RunManager::discover(".")?;
//!
//!     let outcome = manager
//!         .start_run(RunRequest::new().tags("@smoke").timeout_seconds(120))
//!         .await?;
//!     println!("exit code: {:?}", outcome.record.exit_code);
//!
//!     if let Some(summary) = &outcome.summary {
//!         for failure in &summary.failures {
//!             let analysis = manager.analyze_failure(&failure.name, None)?;
//!             println!("{:#?}", analysis.step_definition);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod lookup;
pub mod report;

// Re-export main types
pub use catalog::{CatalogReader, Coverage, FeatureCatalog, FeatureCatalogEntry, FeatureFilter};
pub use config::{LoadError, RoleConfig, StepSyntax, ToolConfig, TriageConfig};
pub use engine::{
    FailureAnalysis, FailureDetails, RunManager, RunOutcome, RunRecord, RunRequest, RunResults,
    RunStore, TriageError,
};
pub use lookup::{
    CodeRole, ConventionRole, RelatedCodeFinder, RelatedCodeSnippet, StepDefinitionLocator,
    StepDefinitionMatch,
};
pub use report::{summarize, FailureRecord, ReportError, ResultsReport, Summary};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::catalog::{FeatureCatalog, FeatureFilter};
    pub use crate::config::TriageConfig;
    pub use crate::engine::{
        FailureAnalysis, FailureDetails, RunManager, RunOutcome, RunRequest, RunResults,
        TriageError,
    };
    pub use crate::report::{FailureRecord, ReportError, Summary};
}
