//! Pass/fail summary over a results report

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::model::{ResultsReport, ScenarioResult, StepStatus};

/// Longest error text kept per failure, in characters
pub const MAX_ERROR_CHARS: usize = 1000;

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

/// One failed scenario, derived fresh from a report on every query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub feature: String,
    pub name: String,
    pub error: String,
    pub failed_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_scenarios: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_seconds: f64,
    pub failures: Vec<FailureRecord>,
}

impl Summary {
    fn record(&mut self, status: ScenarioStatus) {
        self.total_scenarios += 1;
        match status {
            ScenarioStatus::Passed => self.passed += 1,
            ScenarioStatus::Failed => self.failed += 1,
            ScenarioStatus::Skipped => self.skipped += 1,
        }
    }
}

pub fn summarize(report: &ResultsReport) -> Summary {
    let mut summary = Summary::default();
    let mut duration = 0.0_f64;

    for feature in &report.features {
        for scenario in feature.elements.iter().filter(|e| e.is_scenario()) {
            duration += scenario
                .steps
                .iter()
                .filter_map(|step| step.result.seconds())
                .sum::<f64>();

            let status = scenario_status(scenario);
            summary.record(status);

            if status == ScenarioStatus::Failed {
                summary.failures.push(FailureRecord {
                    feature: feature.name.clone(),
                    name: scenario.name.clone(),
                    error: error_message(scenario),
                    failed_step: failed_step(scenario),
                    screenshot_path: None,
                });
            }
        }
    }

    summary.duration_seconds = round_hundredths(duration);
    summary
}

/// Steps are checked in order: the first `failed` step makes the scenario
/// failed, the first step that is neither `passed` nor `failed` makes it
/// skipped. A scenario without steps is skipped.
pub fn scenario_status(scenario: &ScenarioResult) -> ScenarioStatus {
    if scenario.steps.is_empty() {
        return ScenarioStatus::Skipped;
    }

    for step in &scenario.steps {
        match step.result.status {
            StepStatus::Passed => continue,
            StepStatus::Failed => return ScenarioStatus::Failed,
            _ => return ScenarioStatus::Skipped,
        }
    }
    ScenarioStatus::Passed
}

fn first_failed(scenario: &ScenarioResult) -> Option<&super::model::StepResult> {
    scenario
        .steps
        .iter()
        .find(|step| step.result.status == StepStatus::Failed)
}

fn error_message(scenario: &ScenarioResult) -> String {
    let text = first_failed(scenario)
        .and_then(|step| step.result.error_text())
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    truncate_chars(&text, MAX_ERROR_CHARS)
}

fn failed_step(scenario: &ScenarioResult) -> Option<String> {
    first_failed(scenario).map(|step| step.display_text())
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

// Formatting rounds the exact binary value, so 1.005 + 2.0 lands on 3.0
// rather than drifting up through a multiply-by-100.
fn round_hundredths(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
