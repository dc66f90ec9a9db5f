//! Test runner resolution and invocation
//!
//! The runner is resolved by trying each [`ToolSource`] in order:
//!
//! 1. an explicit command from `triage.yaml`
//! 2. `python -m behave` when the module is importable
//! 3. the executable named by `TRIAGE_BEHAVE_PATH`
//! 4. `.venv/bin/behave`, then `venv/bin/behave`, under the project root
//! 5. `behave` on `PATH`
//!
//! The resolved command runs with piped output under a wall-clock deadline.
//! Output read before the deadline is kept when the child is killed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ToolConfig;
use crate::engine::error::TriageError;

/// Upper bound on the importable-module probe
const MODULE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    Configured,
    Module,
    EnvVar,
    Virtualenv,
    SystemPath,
}

impl ToolSource {
    pub const ORDER: [ToolSource; 5] = [
        ToolSource::Configured,
        ToolSource::Module,
        ToolSource::EnvVar,
        ToolSource::Virtualenv,
        ToolSource::SystemPath,
    ];
}

/// A resolved runner command line, before per-run arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub source: ToolSource,
}

impl ToolCommand {
    fn new(program: impl Into<PathBuf>, args: Vec<String>, source: ToolSource) -> Self {
        Self {
            program: program.into(),
            args,
            source,
        }
    }
}

pub struct ToolLocator<'a> {
    config: &'a ToolConfig,
    project_root: &'a Path,
}

impl<'a> ToolLocator<'a> {
    pub fn new(config: &'a ToolConfig, project_root: &'a Path) -> Self {
        Self {
            config,
            project_root,
        }
    }

    pub async fn resolve(&self) -> Result<ToolCommand, TriageError> {
        for source in ToolSource::ORDER {
            if let Some(command) = self.try_source(source).await {
                info!(
                    source = ?source,
                    program = %command.program.display(),
                    "Resolved test runner"
                );
                return Ok(command);
            }
            debug!(source = ?source, "Test runner not available from source");
        }
        Err(TriageError::ToolNotFound(format!(
            "configured command, python module, ${}, {}, PATH lookup of '{}'",
            self.config.env_var,
            self.config.venv_candidates.join(", "),
            self.config.executable
        )))
    }

    async fn try_source(&self, source: ToolSource) -> Option<ToolCommand> {
        match source {
            ToolSource::Configured => {
                let (program, args) = self.config.command.as_ref()?.split_first()?;
                Some(ToolCommand::new(program, args.to_vec(), source))
            }
            ToolSource::Module => {
                let module = self.config.module.as_deref()?;
                if self.module_importable(module).await {
                    Some(ToolCommand::new(
                        &self.config.python,
                        vec!["-m".to_string(), module.to_string()],
                        source,
                    ))
                } else {
                    None
                }
            }
            ToolSource::EnvVar => std::env::var(&self.config.env_var)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(|value| ToolCommand::new(value, Vec::new(), source)),
            ToolSource::Virtualenv => self
                .config
                .venv_candidates
                .iter()
                .map(|candidate| self.project_root.join(candidate))
                .find(|path| path.exists())
                .map(|path| ToolCommand::new(path, Vec::new(), source)),
            ToolSource::SystemPath => which::which(&self.config.executable)
                .ok()
                .map(|path| ToolCommand::new(path, Vec::new(), source)),
        }
    }

    async fn module_importable(&self, module: &str) -> bool {
        if !module
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            warn!("Ignoring invalid module name {:?}", module);
            return false;
        }
        let probe = format!(
            "import importlib.util, sys; sys.exit(0 if importlib.util.find_spec('{}') else 1)",
            module
        );
        let mut cmd = Command::new(&self.config.python);
        cmd.args(["-c", probe.as_str()]).current_dir(self.project_root);

        succeeds_within(&mut cmd, MODULE_PROBE_TIMEOUT).await
    }
}

/// Run `cmd` silently; `false` on spawn failure, nonzero exit, or timeout
async fn succeeds_within(cmd: &mut Command, limit: Duration) -> bool {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(limit, cmd.status()).await {
        Ok(status) => status.map(|status| status.success()).unwrap_or(false),
        Err(_) => {
            warn!("Module probe timed out after {:?}", limit);
            false
        }
    }
}

/// How a runner process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited {
        code: i32,
        stdout: String,
        stderr: String,
    },
    TimedOut {
        stdout: String,
        stderr: String,
    },
}

/// Run `tool` with `args` in `cwd`, killing it once `timeout` elapses
pub async fn run_with_timeout(
    tool: &ToolCommand,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<ProcessOutcome, TriageError> {
    let mut cmd = Command::new(&tool.program);
    cmd.args(&tool.args)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %tool.program.display(), ?args, "Spawning test runner");
    let mut child = cmd.spawn()?;

    let mut stdout = child.stdout.take().ok_or_else(|| {
        TriageError::Io(std::io::Error::other("runner stdout was not captured"))
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| {
        TriageError::Io(std::io::Error::other("runner stderr was not captured"))
    })?;

    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();

    let waited = {
        let run = async {
            let (out, err, status) = tokio::join!(
                stdout.read_to_end(&mut out_buf),
                stderr.read_to_end(&mut err_buf),
                child.wait()
            );
            out.and(err).and(status)
        };
        tokio::time::timeout(timeout, run).await
    };

    match waited {
        Ok(status) => {
            let status = status?;
            Ok(ProcessOutcome::Exited {
                code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&out_buf).into_owned(),
                stderr: String::from_utf8_lossy(&err_buf).into_owned(),
            })
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed-out test runner: {}", e);
            }
            Ok(ProcessOutcome::TimedOut {
                stdout: String::from_utf8_lossy(&out_buf).into_owned(),
                stderr: String::from_utf8_lossy(&err_buf).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn offline_config() -> ToolConfig {
        ToolConfig {
            module: None,
            env_var: "TRIAGE_TEST_UNSET_RUNNER_VAR".to_string(),
            executable: "definitely-not-a-behave-binary".to_string(),
            ..ToolConfig::default()
        }
    }

    #[tokio::test]
    async fn test_configured_command_wins() {
        let dir = tempdir().unwrap();
        let config = ToolConfig {
            command: Some(vec!["sh".to_string(), "fake.sh".to_string()]),
            ..offline_config()
        };

        let tool = ToolLocator::new(&config, dir.path()).resolve().await.unwrap();
        assert_eq!(tool.source, ToolSource::Configured);
        assert_eq!(tool.program, PathBuf::from("sh"));
        assert_eq!(tool.args, vec!["fake.sh".to_string()]);
    }

    #[tokio::test]
    async fn test_virtualenv_candidates_in_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("venv/bin")).unwrap();
        fs::write(dir.path().join("venv/bin/behave"), "").unwrap();

        let config = offline_config();
        let tool = ToolLocator::new(&config, dir.path()).resolve().await.unwrap();
        assert_eq!(tool.source, ToolSource::Virtualenv);
        assert_eq!(tool.program, dir.path().join("venv/bin/behave"));

        fs::create_dir_all(dir.path().join(".venv/bin")).unwrap();
        fs::write(dir.path().join(".venv/bin/behave"), "").unwrap();
        let tool = ToolLocator::new(&config, dir.path()).resolve().await.unwrap();
        assert_eq!(tool.program, dir.path().join(".venv/bin/behave"));
    }

    #[tokio::test]
    async fn test_env_var_beats_virtualenv() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("venv/bin")).unwrap();
        fs::write(dir.path().join("venv/bin/behave"), "").unwrap();

        let var = "TRIAGE_TEST_ENV_VAR_BEATS_VENV";
        std::env::set_var(var, "/opt/behave/bin/behave");
        let config = ToolConfig {
            env_var: var.to_string(),
            ..offline_config()
        };
        let tool = ToolLocator::new(&config, dir.path()).resolve().await;
        std::env::remove_var(var);

        let tool = tool.unwrap();
        assert_eq!(tool.source, ToolSource::EnvVar);
        assert_eq!(tool.program, PathBuf::from("/opt/behave/bin/behave"));
        assert!(tool.args.is_empty());
    }

    #[tokio::test]
    async fn test_blank_env_var_falls_through() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".venv/bin")).unwrap();
        fs::write(dir.path().join(".venv/bin/behave"), "").unwrap();

        let var = "TRIAGE_TEST_BLANK_ENV_VAR";
        std::env::set_var(var, "  ");
        let config = ToolConfig {
            env_var: var.to_string(),
            ..offline_config()
        };
        let tool = ToolLocator::new(&config, dir.path()).resolve().await;
        std::env::remove_var(var);

        assert_eq!(tool.unwrap().source, ToolSource::Virtualenv);
    }

    #[tokio::test]
    async fn test_module_probe_with_missing_interpreter() {
        let dir = tempdir().unwrap();
        let config = ToolConfig {
            python: "definitely-not-a-python".to_string(),
            module: Some("behave".to_string()),
            ..offline_config()
        };
        let locator = ToolLocator::new(&config, dir.path());
        assert!(!locator.module_importable("behave").await);
        assert!(!locator.module_importable("behave; import os").await);
    }

    #[tokio::test]
    async fn test_hung_probe_gives_up() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "sleep 5"]);

        let started = std::time::Instant::now();
        assert!(!succeeds_within(&mut cmd, Duration::from_millis(200)).await);
        assert!(started.elapsed() < Duration::from_secs(4));

        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 0"]);
        assert!(succeeds_within(&mut cmd, Duration::from_secs(10)).await);
    }

    #[tokio::test]
    async fn test_nothing_resolves() {
        let dir = tempdir().unwrap();
        let config = offline_config();
        let err = ToolLocator::new(&config, dir.path())
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_run_captures_output_and_exit_code() {
        let dir = tempdir().unwrap();
        let tool = ToolCommand::new("sh", vec!["-c".to_string()], ToolSource::Configured);
        let outcome = run_with_timeout(
            &tool,
            &["echo out; echo err >&2; exit 3".to_string()],
            dir.path(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Exited {
                code: 3,
                stdout: "out\n".to_string(),
                stderr: "err\n".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_run_times_out_with_partial_output() {
        let dir = tempdir().unwrap();
        let tool = ToolCommand::new("sh", vec!["-c".to_string()], ToolSource::Configured);
        let outcome = run_with_timeout(
            &tool,
            &["echo started; sleep 5; echo never".to_string()],
            dir.path(),
            Duration::from_millis(1000),
        )
        .await
        .unwrap();

        match outcome {
            ProcessOutcome::TimedOut { stdout, .. } => {
                assert!(stdout.contains("started"));
                assert!(!stdout.contains("never"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
