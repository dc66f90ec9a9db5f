//! Line-oriented `.feature` file reader
//!
//! Only tags, the `Feature:` line and `Scenario:` / `Scenario Outline:` lines
//! are recognised. Anything else is ignored, so a malformed file yields a
//! partial entry instead of an error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioEntry {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCatalogEntry {
    pub name: String,
    pub tags: Vec<String>,
    pub scenarios: Vec<ScenarioEntry>,
    /// Relative to the project root
    pub path: PathBuf,
}

pub fn parse_feature(path: &Path, project_root: &Path) -> std::io::Result<FeatureCatalogEntry> {
    let reader = BufReader::new(File::open(path)?);

    let mut feature_name: Option<String> = None;
    let mut feature_tags = Vec::new();
    let mut pending_tags: Vec<String> = Vec::new();
    let mut scenarios = Vec::new();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("Stopped reading {} early: {}", path.display(), e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(line.split_whitespace().map(String::from));
        } else if let Some(rest) = line.strip_prefix("Feature:") {
            feature_name = Some(rest.trim().to_string());
            feature_tags = std::mem::take(&mut pending_tags);
        } else if line.starts_with("Scenario:") || line.starts_with("Scenario Outline:") {
            let name = line
                .split_once(':')
                .map(|(_, rest)| rest.trim())
                .unwrap_or_default();
            scenarios.push(ScenarioEntry {
                name: name.to_string(),
                tags: std::mem::take(&mut pending_tags),
            });
        }
    }

    let name = feature_name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Ok(FeatureCatalogEntry {
        name,
        tags: feature_tags,
        scenarios,
        path: path
            .strip_prefix(project_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_tags_and_scenarios() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("booking.feature");
        fs::write(
            &path,
            r#"@api @booking
Feature: Booking API
  As a guest I want to book rooms

  @smoke
  Scenario: Create booking
    Given a room is available
    When I create a booking for "John" "Doe"

  @regression @slow
  Scenario Outline: Reject invalid dates
    When I book from <start> to <end>

  Scenario: Untagged
    Given nothing
"#,
        )
        .unwrap();

        let entry = parse_feature(&path, dir.path()).unwrap();
        assert_eq!(entry.name, "Booking API");
        assert_eq!(entry.tags, vec!["@api", "@booking"]);
        assert_eq!(entry.path, PathBuf::from("booking.feature"));
        assert_eq!(
            entry.scenarios,
            vec![
                ScenarioEntry {
                    name: "Create booking".to_string(),
                    tags: vec!["@smoke".to_string()],
                },
                ScenarioEntry {
                    name: "Reject invalid dates".to_string(),
                    tags: vec!["@regression".to_string(), "@slow".to_string()],
                },
                ScenarioEntry {
                    name: "Untagged".to_string(),
                    tags: vec![],
                },
            ]
        );
    }

    #[test]
    fn test_name_defaults_to_file_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rooms.feature");
        fs::write(&path, "Scenario: List rooms\n  Given rooms\n").unwrap();

        let entry = parse_feature(&path, dir.path()).unwrap();
        assert_eq!(entry.name, "rooms");
        assert!(entry.tags.is_empty());
        assert_eq!(entry.scenarios.len(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(parse_feature(&dir.path().join("gone.feature"), dir.path()).is_err());
    }
}
