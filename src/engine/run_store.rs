//! Retained run artifacts
//!
//! Each run owns two files in the reports directory:
//!
//! - `results_<run_id>.json` - the runner's JSON report
//! - `results_<run_id>_meta.json` - the [`RunRecord`] sidecar
//!
//! Retention keeps the most recently modified reports and deletes the rest.

use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use std::time::SystemTime;

use chrono::Local;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::engine::error::TriageError;
use crate::engine::result::RunRecord;

pub const RESULTS_PREFIX: &str = "results_";
pub const META_SUFFIX: &str = "_meta";
pub const RUN_ID_PREFIX: &str = "run_";
pub const SCREENSHOT_DIR: &str = "screenshots";

const SCREENSHOT_NAME_CHARS: usize = 30;

static RUN_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// `run_YYYYMMDD_HHMMSS` in local time. Two runs in the same second share an id.
pub fn generate_run_id() -> String {
    format!("{}{}", RUN_ID_PREFIX, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Reject anything that could escape the reports directory
pub fn validate_run_id(run_id: &str) -> Result<&str, TriageError> {
    if RUN_ID_REGEX.is_match(run_id) {
        Ok(run_id)
    } else {
        Err(TriageError::InvalidRunId(run_id.to_string()))
    }
}

pub struct RunStore {
    reports_dir: PathBuf,
    keep: usize,
    eviction: Mutex<()>,
}

impl RunStore {
    pub fn new(reports_dir: impl AsRef<Path>, keep: usize) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
            keep,
            eviction: Mutex::new(()),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.reports_dir.join(SCREENSHOT_DIR)
    }

    pub fn ensure_dir(&self) -> Result<(), TriageError> {
        std::fs::create_dir_all(&self.reports_dir)?;
        Ok(())
    }

    /// Callers must validate `run_id` first
    pub fn results_path(&self, run_id: &str) -> PathBuf {
        self.reports_dir
            .join(format!("{}{}.json", RESULTS_PREFIX, run_id))
    }

    pub fn meta_path(&self, run_id: &str) -> PathBuf {
        self.reports_dir
            .join(format!("{}{}{}.json", RESULTS_PREFIX, run_id, META_SUFFIX))
    }

    pub fn write_meta(&self, record: &RunRecord) -> Result<(), TriageError> {
        let path = self.meta_path(&record.run_id);
        std::fs::write(&path, serde_json::to_string_pretty(record)?)?;
        debug!(run_id = %record.run_id, path = %path.display(), "Wrote run metadata");
        Ok(())
    }

    /// A missing or unreadable sidecar yields `None`
    pub fn read_meta(&self, run_id: &str) -> Option<RunRecord> {
        let path = self.meta_path(run_id);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring unreadable run metadata {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Run id of the report artifact with the newest mtime
    pub fn latest_run_id(&self) -> Option<String> {
        self.artifacts()
            .into_iter()
            .max_by_key(|(_, mtime)| *mtime)
            .map(|(run_id, _)| run_id)
    }

    /// Report artifacts present on disk, as `(run_id, mtime)`
    fn artifacts(&self) -> Vec<(String, SystemTime)> {
        self.scan()
            .into_iter()
            .filter(|file| !file.is_meta)
            .map(|file| (file.run_id, file.modified))
            .collect()
    }

    fn scan(&self) -> Vec<RunFile> {
        let Ok(entries) = std::fs::read_dir(&self.reports_dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let stem = name.strip_prefix(RESULTS_PREFIX)?.strip_suffix(".json")?;
                let (run_id, is_meta) = match stem.strip_suffix(META_SUFFIX) {
                    Some(run_id) => (run_id, true),
                    None => (stem, false),
                };
                if !run_id.starts_with(RUN_ID_PREFIX) || validate_run_id(run_id).is_err() {
                    return None;
                }
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some(RunFile {
                    run_id: run_id.to_string(),
                    is_meta,
                    modified,
                })
            })
            .collect()
    }

    /// Delete every report artifact beyond the newest `keep`, ranked by
    /// mtime, together with its sidecar.
    ///
    /// Runs that never produced an artifact (dry runs, timeouts) are not
    /// ranked and their sidecars are left in place. Deletion failures are
    /// logged and skipped. Returns the evicted run ids.
    pub fn evict(&self) -> Vec<String> {
        let _guard = self
            .eviction
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut ranked = self.artifacts();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));

        let evicted: Vec<String> = ranked
            .into_iter()
            .skip(self.keep)
            .map(|(run_id, _)| run_id)
            .collect();

        for run_id in &evicted {
            remove_quietly(&self.results_path(run_id));
            remove_quietly(&self.meta_path(run_id));
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), keep = self.keep, "Evicted old runs");
        }
        evicted
    }

    /// Screenshot whose name contains the normalised scenario name, else the
    /// newest screenshot
    pub fn find_screenshot(&self, scenario_name: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.screenshot_dir()).ok()?;
        let mut screenshots: Vec<(PathBuf, SystemTime)> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
            .filter_map(|p| {
                let modified = std::fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((p, modified))
            })
            .collect();
        screenshots.sort_by(|a, b| a.0.cmp(&b.0));

        let safe_name = screenshot_key(scenario_name);
        let by_name = screenshots.iter().find(|(path, _)| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().to_lowercase().contains(&safe_name))
                .unwrap_or(false)
        });

        by_name
            .or_else(|| screenshots.iter().max_by_key(|(_, modified)| *modified))
            .map(|(path, _)| path.clone())
    }
}

struct RunFile {
    run_id: String,
    is_meta: bool,
    modified: SystemTime,
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Already gone: {}", path.display())
        }
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Non-alphanumerics become `_`, first 30 characters, lowercased
pub fn screenshot_key(scenario_name: &str) -> String {
    scenario_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(SCREENSHOT_NAME_CHARS)
        .collect::<String>()
        .to_lowercase()
}
