mod common;

use common::*;
use std::path::PathBuf;
use testing_triage::{FeatureFilter, RunManager, TriageConfig};

fn manager(root: &std::path::Path) -> RunManager {
    write_booking_project(root);
    RunManager::new(TriageConfig::for_root(root)).unwrap()
}

#[test]
fn test_list_features_by_category() {
    let dir = create_test_dir();
    let manager = manager(dir.path());

    let all = manager.list_features(FeatureFilter::All);
    let keys: Vec<&str> = all.features.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["api/booking", "ui/login"]);

    let booking = &all.features["api/booking"];
    assert_eq!(booking.name, "Booking API");
    assert_eq!(booking.tags, vec!["@api"]);
    assert_eq!(booking.path, PathBuf::from("features/api/booking.feature"));
    assert_eq!(booking.scenarios.len(), 2);
    assert_eq!(booking.scenarios[0].name, "Create booking");
    assert_eq!(booking.scenarios[0].tags, vec!["@smoke"]);
    assert!(booking.scenarios[1].tags.is_empty());

    let login = &all.features["ui/login"];
    assert_eq!(login.scenarios[0].name, "Login with <user>");
    assert_eq!(login.scenarios[0].tags, vec!["@smoke", "@regression"]);

    let api = manager.list_features(FeatureFilter::Api);
    assert_eq!(api.features.len(), 1);
    assert!(api.features.contains_key("api/booking"));
}

#[test]
fn test_coverage_counts() {
    let dir = create_test_dir();
    let manager = manager(dir.path());
    write_file(
        dir.path(),
        "features/ui/empty.feature",
        "Feature: Nothing yet\n",
    );

    let coverage = manager.coverage();
    assert_eq!(coverage.api.features, 1);
    assert_eq!(coverage.api.scenarios, 2);
    assert_eq!(coverage.ui.features, 2);
    assert_eq!(coverage.ui.scenarios, 1);
    assert_eq!(coverage.total_features, 3);
    assert_eq!(coverage.total_scenarios, 3);
    assert_eq!(coverage.ui.files[0].name, "empty");
    assert_eq!(coverage.ui.files[0].scenario_count, 0);
}

#[test]
fn test_catalog_without_features_dir() {
    let dir = create_test_dir();
    let manager = RunManager::new(TriageConfig::for_root(dir.path())).unwrap();

    assert!(manager.list_features(FeatureFilter::All).features.is_empty());
    assert_eq!(manager.coverage().total_features, 0);
}

#[test]
fn test_feature_filter_parse() {
    assert_eq!("ui".parse::<FeatureFilter>().unwrap(), FeatureFilter::Ui);
    assert!("web".parse::<FeatureFilter>().is_err());
}
