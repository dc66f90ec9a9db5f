#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use testing_triage::{ToolConfig, TriageConfig};

pub const ARGS_FILE: &str = "runner_args.txt";
pub const FIXTURE_FILE: &str = "fixture_report.json";

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// How the fake runner behaves when invoked
pub struct FakeRunner {
    /// Copied to `--outfile` unless this is a dry run
    pub report: Option<String>,
    pub exit_code: i32,
    pub sleep_seconds: u32,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self {
            report: Some(booking_report()),
            exit_code: 0,
            sleep_seconds: 0,
        }
    }
}

impl FakeRunner {
    /// Write the runner script into `root` and return its path
    pub fn install(&self, root: &Path) -> PathBuf {
        let fixture = root.join(FIXTURE_FILE);
        match &self.report {
            Some(report) => {
                fs::write(&fixture, report).expect("Failed to write report fixture");
            }
            None => {
                let _ = fs::remove_file(&fixture);
            }
        }

        let script = format!(
            r#"#!/bin/sh
printf '%s\n' "$@" > "{args}"
out=""
dry=0
while [ $# -gt 0 ]; do
  case "$1" in
    --outfile) out="$2"; shift 2 ;;
    --dry-run) dry=1; shift ;;
    *) shift ;;
  esac
done
echo "fake runner started"
echo "fake runner warning" >&2
sleep {sleep}
if [ "$dry" = 0 ] && [ -f "{fixture}" ]; then
  cp "{fixture}" "$out"
fi
echo "fake runner finished"
exit {code}
"#,
            args = root.join(ARGS_FILE).display(),
            sleep = self.sleep_seconds,
            fixture = fixture.display(),
            code = self.exit_code,
        );
        write_file(root, "fake_behave.sh", &script)
    }
}

/// Config rooted at `root` that only ever resolves `sh <script>`
pub fn triage_config(root: &Path, script: &Path) -> TriageConfig {
    let mut config = TriageConfig::for_root(root);
    config.tool = ToolConfig {
        command: Some(vec!["sh".to_string(), script.display().to_string()]),
        module: None,
        env_var: "TRIAGE_TEST_UNSET_RUNNER_VAR".to_string(),
        executable: "definitely-not-a-behave-binary".to_string(),
        ..ToolConfig::default()
    };
    config
}

/// Arguments the fake runner received on its last invocation
pub fn runner_args(root: &Path) -> Vec<String> {
    fs::read_to_string(root.join(ARGS_FILE))
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

/// Features, step definitions, a page object and a service for a small
/// booking suite
pub fn write_booking_project(root: &Path) {
    write_file(
        root,
        "features/api/booking.feature",
        r#"@api
Feature: Booking API

  @smoke
  Scenario: Create booking
    Given a room is available
    When I create a booking for "John" "Doe"
    Then the booking is confirmed

  Scenario: Delete booking
    Given a booking exists
    When I delete the booking
"#,
    );
    write_file(
        root,
        "features/ui/login.feature",
        r#"@ui
Feature: Login page

  @smoke @regression
  Scenario Outline: Login with <user>
    Given I open the login page
    When I log in as "<user>"
"#,
    );
    write_file(
        root,
        "steps/booking_steps.py",
        r#"from behave import given, when, then

from pages.booking_page import BookingPage
from services.booking_service import BookingService


@given("a room is available")
def step_room_available(context):
    pass


@when('I create a booking for "{firstname}" "{lastname}"')
def step_create_booking(context, firstname, lastname):
    page = BookingPage(context.driver)
    service = BookingService()
    context.response = service.create(firstname, lastname)
    page.open()


@then("the booking is confirmed")
def step_booking_confirmed(context):
    assert context.response.status_code == 200
"#,
    );
    write_file(
        root,
        "pages/booking_page.py",
        r#"from pages.base_page import BasePage


class BookingPage(BasePage):
    URL = "/booking"

    def open(self):
        self.driver.get(self.URL)
"#,
    );
    write_file(
        root,
        "services/booking_service.py",
        r#"import requests


class BookingService:
    def create(self, firstname, lastname):
        return requests.post("/booking", json={"firstname": firstname, "lastname": lastname})
"#,
    );
}

/// One passed and one failed scenario across two features
pub fn booking_report() -> String {
    r#"[
  {
    "name": "Booking API",
    "elements": [
      {
        "type": "scenario",
        "name": "Create booking",
        "steps": [
          {"keyword": "Given", "name": "a room is available", "result": {"status": "passed", "duration": 0.5}},
          {"keyword": "When", "name": "I create a booking for \"John\" \"Doe\"", "result": {"status": "failed", "duration": 1.25, "error_message": ["AssertionError: expected 200", "got 500"]}},
          {"keyword": "Then", "name": "the booking is confirmed", "result": {"status": "skipped"}}
        ]
      }
    ]
  },
  {
    "name": "Login page",
    "elements": [
      {
        "type": "background",
        "name": "",
        "steps": [
          {"keyword": "Given", "name": "the app is up", "result": {"status": "passed", "duration": 0.1}}
        ]
      },
      {
        "type": "scenario_outline",
        "name": "Login with admin",
        "steps": [
          {"keyword": "Given", "name": "I open the login page", "result": {"status": "passed", "duration": 0.75}},
          {"keyword": "When", "name": "I log in as \"admin\"", "result": {"status": "passed", "duration": 0.5}}
        ]
      }
    ]
  }
]"#
    .to_string()
}
