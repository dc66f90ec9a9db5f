//! Triage configuration
//!
//! Loaded from `triage.yaml` at the project root. Every field has a default,
//! so an empty file (or no file at all) describes a conventional Behave
//! project:
//!
//! ```yaml
//! features_dir: features
//! reports_dir: reports
//! steps_dir: steps
//! keep_results: 10
//! timeout_seconds: 300
//!
//! tool:
//!   env_var: TRIAGE_BEHAVE_PATH
//!   venv_candidates: [".venv/bin/behave", "venv/bin/behave"]
//!
//! roles:
//!   - suffix: Page
//!     directory: pages
//!   - suffix: Service
//!     directory: services
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "triage.yaml";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

/// How the external test runner is located and invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Explicit command line, tried before any other source
    #[serde(default)]
    pub command: Option<Vec<String>>,

    /// Interpreter used for the importable-module probe
    #[serde(default = "default_python")]
    pub python: String,

    /// Module run via `python -m`; `None` disables the probe
    #[serde(default = "default_module")]
    pub module: Option<String>,

    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Paths relative to the project root
    #[serde(default = "default_venv_candidates")]
    pub venv_candidates: Vec<String>,

    /// Executable name looked up on `PATH`
    #[serde(default = "default_executable")]
    pub executable: String,
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_module() -> Option<String> {
    Some("behave".to_string())
}

fn default_env_var() -> String {
    "TRIAGE_BEHAVE_PATH".to_string()
}

fn default_venv_candidates() -> Vec<String> {
    vec![".venv/bin/behave".to_string(), "venv/bin/behave".to_string()]
}

fn default_executable() -> String {
    "behave".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command: None,
            python: default_python(),
            module: default_module(),
            env_var: default_env_var(),
            venv_candidates: default_venv_candidates(),
            executable: default_executable(),
        }
    }
}

/// Syntax of step-definition source files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSyntax {
    #[serde(default = "default_source_extension")]
    pub extension: String,

    /// Capture group 1 must yield the step pattern
    #[serde(default = "default_decorator_regex")]
    pub decorator: String,

    /// Capture group 1 must yield the handler name
    #[serde(default = "default_handler_regex")]
    pub handler: String,
}

fn default_source_extension() -> String {
    "py".to_string()
}

fn default_decorator_regex() -> String {
    r#"@(?:given|when|then|step)\(\s*[rRuUfF]*['"](.+?)['"]\s*\)"#.to_string()
}

fn default_handler_regex() -> String {
    r"^\s*(?:async\s+)?def\s+([A-Za-z0-9_]+)".to_string()
}

impl Default for StepSyntax {
    fn default() -> Self {
        Self {
            extension: default_source_extension(),
            decorator: default_decorator_regex(),
            handler: default_handler_regex(),
        }
    }
}

/// A naming-convention role such as page objects or service wrappers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleConfig {
    pub suffix: String,
    pub directory: String,

    #[serde(default = "default_source_extension")]
    pub extension: String,

    #[serde(default = "default_declaration")]
    pub declaration: String,
}

fn default_declaration() -> String {
    "class".to_string()
}

impl RoleConfig {
    pub fn new(suffix: &str, directory: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            directory: directory.to_string(),
            extension: default_source_extension(),
            declaration: default_declaration(),
        }
    }
}

fn default_roles() -> Vec<RoleConfig> {
    vec![
        RoleConfig::new("Page", "pages"),
        RoleConfig::new("Service", "services"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Filled in from the loading location when absent
    #[serde(default)]
    pub project_root: PathBuf,

    #[serde(default = "default_features_dir")]
    pub features_dir: PathBuf,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default = "default_steps_dir")]
    pub steps_dir: PathBuf,

    /// Number of runs kept by retention eviction
    #[serde(default = "default_keep_results")]
    pub keep_results: usize,

    #[serde(default = "default_stdout_tail_chars")]
    pub stdout_tail_chars: usize,

    #[serde(default = "default_stderr_tail_chars")]
    pub stderr_tail_chars: usize,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub tool: ToolConfig,

    #[serde(default)]
    pub steps: StepSyntax,

    #[serde(default = "default_roles")]
    pub roles: Vec<RoleConfig>,
}

fn default_features_dir() -> PathBuf {
    PathBuf::from("features")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_steps_dir() -> PathBuf {
    PathBuf::from("steps")
}

fn default_keep_results() -> usize {
    10
}

fn default_stdout_tail_chars() -> usize {
    2000
}

fn default_stderr_tail_chars() -> usize {
    1000
}

fn default_timeout_seconds() -> u64 {
    300
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::new(),
            features_dir: default_features_dir(),
            reports_dir: default_reports_dir(),
            steps_dir: default_steps_dir(),
            keep_results: default_keep_results(),
            stdout_tail_chars: default_stdout_tail_chars(),
            stderr_tail_chars: default_stderr_tail_chars(),
            timeout_seconds: default_timeout_seconds(),
            tool: ToolConfig::default(),
            steps: StepSyntax::default(),
            roles: default_roles(),
        }
    }
}

impl TriageConfig {
    /// Default configuration rooted at `root`
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self {
            project_root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: TriageConfig =
            serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
                file: path.display().to_string(),
                error: e,
            })?;

        if config.project_root.as_os_str().is_empty() {
            config.project_root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
        }
        Ok(config)
    }

    /// Load `triage.yaml` from `root` if present, otherwise use defaults
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, LoadError> {
        let root = root.as_ref();
        let file = root.join(CONFIG_FILE_NAME);
        if file.exists() {
            let mut config = Self::load(&file)?;
            if config.project_root.is_relative() {
                config.project_root = root.join(&config.project_root);
            }
            Ok(config)
        } else {
            Ok(Self::for_root(root))
        }
    }

    pub fn features_path(&self) -> PathBuf {
        self.project_root.join(&self.features_dir)
    }

    pub fn reports_path(&self) -> PathBuf {
        self.project_root.join(&self.reports_dir)
    }

    pub fn steps_path(&self) -> PathBuf {
        self.project_root.join(&self.steps_dir)
    }
}
