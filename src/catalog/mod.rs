//! Feature catalog and coverage
//!
//! Feature files live under `<features_dir>/api` and `<features_dir>/ui`.
//! Files are re-read on every request; nothing is cached.

pub mod feature;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::error::TriageError;
pub use feature::{parse_feature, FeatureCatalogEntry, ScenarioEntry};

pub const CATEGORIES: [&str; 2] = ["api", "ui"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureFilter {
    Api,
    Ui,
    #[default]
    All,
}

impl FeatureFilter {
    fn includes(self, category: &str) -> bool {
        match self {
            FeatureFilter::Api => category == "api",
            FeatureFilter::Ui => category == "ui",
            FeatureFilter::All => true,
        }
    }
}

impl FromStr for FeatureFilter {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(FeatureFilter::Api),
            "ui" => Ok(FeatureFilter::Ui),
            "all" => Ok(FeatureFilter::All),
            other => Err(TriageError::InvalidArgument(format!(
                "feature type must be 'api', 'ui', or 'all', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCatalog {
    /// Keyed `<category>/<file stem>`
    pub features: BTreeMap<String, FeatureCatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub name: String,
    pub scenario_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCoverage {
    pub features: usize,
    pub scenarios: usize,
    pub files: Vec<FileCoverage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub api: CategoryCoverage,
    pub ui: CategoryCoverage,
    pub total_features: usize,
    pub total_scenarios: usize,
}

pub struct CatalogReader {
    project_root: PathBuf,
    features_dir: PathBuf,
}

impl CatalogReader {
    pub fn new(project_root: impl AsRef<Path>, features_dir: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            features_dir: features_dir.as_ref().to_path_buf(),
        }
    }

    pub fn list_features(&self, filter: FeatureFilter) -> FeatureCatalog {
        let mut catalog = FeatureCatalog::default();
        for category in CATEGORIES.into_iter().filter(|c| filter.includes(c)) {
            for (stem, entry) in self.parse_category(category) {
                catalog
                    .features
                    .insert(format!("{}/{}", category, stem), entry);
            }
        }
        catalog
    }

    pub fn coverage(&self) -> Coverage {
        let mut coverage = Coverage::default();
        for category in CATEGORIES {
            let mut counts = CategoryCoverage::default();
            for (stem, entry) in self.parse_category(category) {
                counts.features += 1;
                counts.scenarios += entry.scenarios.len();
                counts.files.push(FileCoverage {
                    name: stem,
                    scenario_count: entry.scenarios.len(),
                });
            }
            match category {
                "api" => coverage.api = counts,
                _ => coverage.ui = counts,
            }
        }
        coverage.total_features = coverage.api.features + coverage.ui.features;
        coverage.total_scenarios = coverage.api.scenarios + coverage.ui.scenarios;
        coverage
    }

    /// `(stem, entry)` for every readable `.feature` file in a category, by name
    fn parse_category(&self, category: &str) -> Vec<(String, FeatureCatalogEntry)> {
        let dir = self.features_dir.join(category);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("feature"))
            .collect();
        files.sort();

        files
            .into_iter()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                match parse_feature(&path, &self.project_root) {
                    Ok(entry) => Some((stem, entry)),
                    Err(e) => {
                        warn!("Skipping unreadable feature file {}: {}", path.display(), e);
                        None
                    }
                }
            })
            .collect()
    }
}
