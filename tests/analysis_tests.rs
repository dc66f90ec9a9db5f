mod common;

use common::*;
use std::path::PathBuf;
use testing_triage::lookup::ConventionRole;
use testing_triage::{CodeRole, RunManager, RunRequest, TriageError};

async fn manager_after_run(root: &std::path::Path) -> RunManager {
    write_booking_project(root);
    let script = FakeRunner::default().install(root);
    let manager = RunManager::new(triage_config(root, &script)).unwrap();
    manager.start_run(RunRequest::new()).await.unwrap();
    manager
}

#[tokio::test]
async fn test_analyze_traces_step_to_definition_and_related_code() {
    let dir = create_test_dir();
    let manager = manager_after_run(dir.path()).await;

    let analysis = manager.analyze_failure("create booking", None).unwrap();

    assert_eq!(analysis.scenario, "Create booking");
    assert!(analysis.error.starts_with("AssertionError"));
    assert_eq!(
        analysis.failed_step.as_deref(),
        Some(r#"When I create a booking for "John" "Doe""#)
    );

    let definition = analysis.step_definition.unwrap();
    assert_eq!(definition.file, PathBuf::from("steps/booking_steps.py"));
    assert_eq!(definition.pattern_line, 12);
    assert_eq!(definition.line, 13);
    assert_eq!(definition.function.as_deref(), Some("step_create_booking"));
    assert!(definition
        .snippet
        .contains("13: def step_create_booking(context, firstname, lastname):"));

    let related = &analysis.related_code;
    assert_eq!(related.len(), 2);
    assert_eq!(related[0].name, "BookingPage");
    assert_eq!(related[0].file, PathBuf::from("pages/booking_page.py"));
    assert_eq!(related[0].line, 4);
    assert!(related[0].snippet.contains("4: class BookingPage(BasePage):"));
    assert_eq!(related[1].name, "BookingService");
    assert_eq!(related[1].file, PathBuf::from("services/booking_service.py"));
    assert_eq!(related[1].line, 4);
}

#[tokio::test]
async fn test_analyze_unknown_scenario() {
    let dir = create_test_dir();
    let manager = manager_after_run(dir.path()).await;

    let err = manager.analyze_failure("Checkout", None).unwrap_err();
    assert!(matches!(err, TriageError::FailureNotFound(_)));

    // Passed scenarios are not failures.
    let err = manager.analyze_failure("Login with admin", None).unwrap_err();
    assert!(matches!(err, TriageError::FailureNotFound(_)));

    let err = manager.analyze_failure("  ", None).unwrap_err();
    assert!(matches!(err, TriageError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_analyze_without_step_definition() {
    let dir = create_test_dir();
    let manager = manager_after_run(dir.path()).await;
    std::fs::remove_dir_all(dir.path().join("steps")).unwrap();

    let analysis = manager.analyze_failure("Create booking", None).unwrap();
    assert!(analysis.failed_step.is_some());
    assert!(analysis.step_definition.is_none());
    assert!(analysis.related_code.is_empty());
}

#[tokio::test]
async fn test_analyze_missing_related_files_are_skipped() {
    let dir = create_test_dir();
    let manager = manager_after_run(dir.path()).await;
    std::fs::remove_file(dir.path().join("pages/booking_page.py")).unwrap();

    let analysis = manager.analyze_failure("Create booking", None).unwrap();
    assert_eq!(analysis.related_code.len(), 1);
    assert_eq!(analysis.related_code[0].name, "BookingService");
}

#[tokio::test]
async fn test_analyze_with_custom_roles() {
    let dir = create_test_dir();
    let manager = manager_after_run(dir.path()).await;
    write_file(
        dir.path(),
        "clients/booking_service.py",
        "\n\nclass BookingService:\n    pass\n",
    );

    let roles: Vec<Box<dyn CodeRole>> = vec![Box::new(ConventionRole::new(
        "Service", "clients", "py",
    ))];
    let manager = manager.with_roles(roles);

    let analysis = manager.analyze_failure("Create booking", None).unwrap();
    assert_eq!(analysis.related_code.len(), 1);
    assert_eq!(
        analysis.related_code[0].file,
        PathBuf::from("clients/booking_service.py")
    );
    assert_eq!(analysis.related_code[0].line, 3);
}

#[tokio::test]
async fn test_analyze_by_run_id() {
    let dir = create_test_dir();
    let manager = manager_after_run(dir.path()).await;
    let run_id = manager.get_latest_results().unwrap().run_id;

    let analysis = manager
        .analyze_failure("Create booking", Some(&run_id))
        .unwrap();
    assert_eq!(analysis.run_id, run_id);

    let err = manager
        .analyze_failure("Create booking", Some("../secrets"))
        .unwrap_err();
    assert!(matches!(err, TriageError::InvalidRunId(_)));
}
