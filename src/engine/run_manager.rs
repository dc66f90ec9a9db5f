//! Run lifecycle manager
//!
//! Owns the configuration and every collaborator needed to launch the test
//! runner, retain what it produced, and answer run- and failure-level
//! queries. Constructed explicitly and passed around; there is no global
//! state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::catalog::{CatalogReader, Coverage, FeatureCatalog, FeatureFilter};
use crate::config::TriageConfig;
use crate::engine::error::TriageError;
use crate::engine::result::{FailureAnalysis, FailureDetails, RunOutcome, RunRecord, RunResults};
use crate::engine::run_store::{generate_run_id, validate_run_id, RunStore};
use crate::engine::tool::{run_with_timeout, ProcessOutcome, ToolLocator};
use crate::lookup::{CodeRole, RelatedCodeFinder, StepDefinitionLocator};
use crate::report::{summarize, FailureRecord, ResultsReport, Summary};

pub const DRY_RUN_NOTE: &str = "Dry run does not produce results JSON.";

/// Filters and limits for one runner invocation
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Tag expression, e.g. `@smoke`
    pub tags: Option<String>,
    /// Feature file or directory, relative to the project root or absolute
    pub feature_path: Option<String>,
    /// Scenario name filter
    pub scenario: Option<String>,
    pub dry_run: bool,
    /// Falls back to the configured timeout
    pub timeout_seconds: Option<u64>,
}

impl RunRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn feature_path(mut self, path: impl Into<String>) -> Self {
        self.feature_path = Some(path.into());
        self
    }

    pub fn scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario = Some(name.into());
        self
    }

    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

pub struct RunManager {
    config: TriageConfig,
    store: RunStore,
    catalog: CatalogReader,
    locator: StepDefinitionLocator,
    related: RelatedCodeFinder,
}

impl RunManager {
    pub fn new(mut config: TriageConfig) -> Result<Self, TriageError> {
        let root = config.project_root.canonicalize().map_err(|e| {
            TriageError::Config(format!(
                "project root {}: {}",
                config.project_root.display(),
                e
            ))
        })?;
        config.project_root = root;

        let store = RunStore::new(config.reports_path(), config.keep_results);
        let catalog = CatalogReader::new(&config.project_root, config.features_path());
        let locator =
            StepDefinitionLocator::new(&config.project_root, config.steps_path(), &config.steps)?;
        let related = RelatedCodeFinder::from_configs(&config.project_root, &config.roles);

        Ok(Self {
            config,
            store,
            catalog,
            locator,
            related,
        })
    }

    /// Load `triage.yaml` from `root` (if any) and build a manager
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, TriageError> {
        Self::new(TriageConfig::discover(root)?)
    }

    /// Replace the configured naming-convention roles
    pub fn with_roles(mut self, roles: Vec<Box<dyn CodeRole>>) -> Self {
        self.related = RelatedCodeFinder::new(&self.config.project_root, roles);
        self
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn project_root(&self) -> &Path {
        &self.config.project_root
    }

    /// Resolve a feature path filter, rejecting anything missing or outside
    /// the project root
    pub fn validate_feature_path(&self, value: &str) -> Result<PathBuf, TriageError> {
        let candidate = Path::new(value);
        let candidate = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.project_root().join(candidate)
        };

        let resolved = candidate
            .canonicalize()
            .map_err(|_| TriageError::InvalidPath(format!("Path '{}' does not exist", value)))?;
        if !resolved.starts_with(self.project_root()) {
            return Err(TriageError::InvalidPath(format!(
                "Path '{}' is outside project root",
                value
            )));
        }
        Ok(resolved)
    }

    #[instrument(skip(self, request), fields(dry_run = request.dry_run))]
    pub async fn start_run(&self, request: RunRequest) -> Result<RunOutcome, TriageError> {
        let feature_path = request
            .feature_path
            .as_deref()
            .map(|p| self.validate_feature_path(p))
            .transpose()?;

        let tool = ToolLocator::new(&self.config.tool, self.project_root())
            .resolve()
            .await?;

        let run_id = generate_run_id();
        let results_path = self.store.results_path(&run_id);
        self.store.ensure_dir()?;

        let mut args = vec![
            "--format".to_string(),
            "json".to_string(),
            "--outfile".to_string(),
            results_path.display().to_string(),
        ];
        if let Some(tags) = &request.tags {
            args.extend(["--tags".to_string(), tags.clone()]);
        }
        if let Some(path) = &feature_path {
            args.push(path.display().to_string());
        }
        if let Some(scenario) = &request.scenario {
            args.extend(["--name".to_string(), scenario.clone()]);
        }
        if request.dry_run {
            args.push("--dry-run".to_string());
        }

        let timeout_seconds = request
            .timeout_seconds
            .unwrap_or(self.config.timeout_seconds);
        info!(run_id = %run_id, timeout_seconds, "Starting test run");

        let outcome = run_with_timeout(
            &tool,
            &args,
            self.project_root(),
            Duration::from_secs(timeout_seconds),
        )
        .await?;

        let (exit_code, stdout, stderr, timed_out) = match outcome {
            ProcessOutcome::Exited {
                code,
                stdout,
                stderr,
            } => (Some(code), stdout, stderr, false),
            ProcessOutcome::TimedOut { stdout, stderr } => (None, stdout, stderr, true),
        };

        let record = RunRecord {
            run_id: run_id.clone(),
            results_path: results_path.clone(),
            exit_code,
            stdout_tail: tail(&stdout, self.config.stdout_tail_chars),
            stderr_tail: tail(&stderr, self.config.stderr_tail_chars),
            dry_run: request.dry_run,
            timed_out,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.write_meta(&record) {
            warn!(run_id = %run_id, "Failed to persist run metadata: {}", e);
        }

        if timed_out {
            warn!(run_id = %run_id, timeout_seconds, "Test run timed out");
            return Err(TriageError::Timeout {
                seconds: timeout_seconds,
                record: Box::new(record),
            });
        }

        self.store.evict();
        info!(run_id = %run_id, exit_code = ?exit_code, "Test run finished");

        if request.dry_run && !results_path.exists() {
            return Ok(RunOutcome {
                record,
                summary: None,
                report_error: None,
                note: Some(DRY_RUN_NOTE.to_string()),
            });
        }

        let (summary, report_error) = load_summary(&results_path);
        Ok(RunOutcome {
            record,
            summary,
            report_error,
            note: None,
        })
    }

    pub fn get_results(&self, run_id: &str) -> Result<RunResults, TriageError> {
        let run_id = validate_run_id(run_id)?;
        let results_path = self.store.results_path(run_id);
        if !results_path.exists() && !self.store.meta_path(run_id).exists() {
            return Err(TriageError::NotFound(run_id.to_string()));
        }

        let (summary, report_error) = load_summary(&results_path);
        Ok(RunResults {
            run_id: run_id.to_string(),
            results_path,
            summary,
            report_error,
            metadata: self.store.read_meta(run_id),
        })
    }

    pub fn get_latest_results(&self) -> Result<RunResults, TriageError> {
        let run_id = self.store.latest_run_id().ok_or(TriageError::NoRuns)?;
        self.get_results(&run_id)
    }

    fn results_for(&self, run_id: Option<&str>) -> Result<(RunResults, Summary), TriageError> {
        let results = match run_id {
            Some(run_id) => self.get_results(run_id)?,
            None => self.get_latest_results()?,
        };
        match (&results.summary, &results.report_error) {
            (Some(summary), _) => {
                let summary = summary.clone();
                Ok((results, summary))
            }
            (None, Some(e)) => Err(TriageError::MalformedReport(e.clone())),
            (None, None) => Err(TriageError::NotFound(results.run_id)),
        }
    }

    /// Failures of a run (latest by default), optionally narrowed by a
    /// case-insensitive scenario-name substring, with screenshots attached
    pub fn failure_details(
        &self,
        scenario_filter: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<FailureDetails, TriageError> {
        let (results, summary) = self.results_for(run_id)?;

        let failures: Vec<FailureRecord> = summary
            .failures
            .into_iter()
            .filter(|f| scenario_filter.map_or(true, |needle| name_matches(&f.name, needle)))
            .map(|mut failure| {
                failure.screenshot_path = self.store.find_screenshot(&failure.name);
                failure
            })
            .collect();

        Ok(FailureDetails {
            stdout_tail: results.stdout_tail().map(String::from),
            stderr_tail: results.stderr_tail().map(String::from),
            run_id: results.run_id,
            results_path: results.results_path,
            failures,
            screenshot_dir: self.store.screenshot_dir(),
        })
    }

    /// Trace the first failure matching `scenario_name` to its step
    /// definition and the page/service classes around it
    pub fn analyze_failure(
        &self,
        scenario_name: &str,
        run_id: Option<&str>,
    ) -> Result<FailureAnalysis, TriageError> {
        if scenario_name.trim().is_empty() {
            return Err(TriageError::InvalidArgument(
                "scenario_name is required".to_string(),
            ));
        }

        let (results, summary) = self.results_for(run_id)?;
        let failure = summary
            .failures
            .into_iter()
            .find(|f| name_matches(&f.name, scenario_name))
            .ok_or_else(|| TriageError::FailureNotFound(scenario_name.to_string()))?;

        let step_definition = failure
            .failed_step
            .as_deref()
            .and_then(|step| self.locator.locate(step));
        let related_code = step_definition
            .as_ref()
            .map(|def| self.related.find_related(&def.context_lines))
            .unwrap_or_default();

        Ok(FailureAnalysis {
            run_id: results.run_id,
            results_path: results.results_path,
            scenario: failure.name,
            error: failure.error,
            failed_step: failure.failed_step,
            step_definition,
            related_code,
        })
    }

    pub fn list_features(&self, filter: FeatureFilter) -> FeatureCatalog {
        self.catalog.list_features(filter)
    }

    pub fn coverage(&self) -> Coverage {
        self.catalog.coverage()
    }
}

fn load_summary(
    results_path: &Path,
) -> (Option<Summary>, Option<crate::report::ReportError>) {
    match ResultsReport::load(results_path) {
        Ok(report) => (Some(summarize(&report)), None),
        Err(e) => (None, Some(e)),
    }
}

fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(&needle.to_lowercase())
}

/// Last `limit` characters of `text`; `None` when there is no output
fn tail(text: &str, limit: usize) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let count = text.chars().count();
    if count <= limit {
        return Some(text.to_string());
    }
    Some(text.chars().skip(count - limit).collect())
}
