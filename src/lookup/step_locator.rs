//! Step definition locator
//!
//! Maps the text of a failed step back to the decorated handler that
//! implements it. Step definition files are scanned in sorted path order and
//! the first pattern whose matcher accepts the whole step text wins, even if a
//! later pattern would be a tighter fit.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::snippet::{format_snippet, window_lines};
use crate::config::StepSyntax;

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]+\}").unwrap());

const STEP_KEYWORDS: [&str; 5] = ["Given", "When", "Then", "And", "But"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinitionMatch {
    pub pattern: String,
    /// Relative to the project root
    pub file: PathBuf,
    /// 1-based line of the decorator
    pub pattern_line: usize,
    /// 1-based line of the handler declaration
    pub line: usize,
    pub function: Option<String>,
    pub snippet: String,
    /// Unnumbered window around the handler, fed to the related-code finder
    #[serde(skip)]
    pub context_lines: Vec<String>,
}

pub struct StepDefinitionLocator {
    project_root: PathBuf,
    steps_dir: PathBuf,
    extension: String,
    decorator: Regex,
    handler: Regex,
}

impl StepDefinitionLocator {
    pub fn new(
        project_root: impl AsRef<Path>,
        steps_dir: impl AsRef<Path>,
        syntax: &StepSyntax,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            project_root: project_root.as_ref().to_path_buf(),
            steps_dir: steps_dir.as_ref().to_path_buf(),
            extension: syntax.extension.clone(),
            decorator: Regex::new(&syntax.decorator)?,
            handler: Regex::new(&syntax.handler)?,
        })
    }

    /// Find the handler for `step_text`; `None` is an ordinary outcome
    pub fn locate(&self, step_text: &str) -> Option<StepDefinitionMatch> {
        if step_text.trim().is_empty() {
            return None;
        }
        let target = strip_step_keyword(step_text);

        for file in self.step_files() {
            let content = match std::fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) => {
                    debug!("Skipping unreadable step file {}: {}", file.display(), e);
                    continue;
                }
            };
            let lines: Vec<String> = content.lines().map(String::from).collect();

            if let Some(found) = self.scan_lines(&file, &lines, target) {
                return Some(found);
            }
        }
        None
    }

    fn scan_lines(
        &self,
        file: &Path,
        lines: &[String],
        target: &str,
    ) -> Option<StepDefinitionMatch> {
        for (idx, line) in lines.iter().enumerate() {
            let Some(pattern) = self.decorator.captures(line).and_then(|c| c.get(1)) else {
                continue;
            };
            let pattern = pattern.as_str();

            let matches = match pattern_to_regex(pattern) {
                Ok(matcher) => matcher.is_match(target),
                Err(e) => {
                    debug!("Ignoring uncompilable step pattern {:?}: {}", pattern, e);
                    false
                }
            };
            if !matches {
                continue;
            }

            // A pattern with no handler after it is not a definition.
            let Some(def_idx) =
                (idx + 1..lines.len()).find(|&j| self.handler.is_match(&lines[j]))
            else {
                continue;
            };

            let function = self
                .handler
                .captures(&lines[def_idx])
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());

            return Some(StepDefinitionMatch {
                pattern: pattern.to_string(),
                file: relative_to(file, &self.project_root),
                pattern_line: idx + 1,
                line: def_idx + 1,
                function,
                snippet: format_snippet(lines, def_idx),
                context_lines: window_lines(lines, def_idx),
            });
        }
        None
    }

    fn step_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.steps_dir, &self.extension, &mut files);
        files.sort();
        files
    }
}

fn collect_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, extension, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            out.push(path);
        }
    }
}

pub(crate) fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Drop a leading `Given `/`When `/`Then `/`And `/`But `
pub fn strip_step_keyword(step_text: &str) -> &str {
    let text = step_text.trim();
    for keyword in STEP_KEYWORDS {
        if let Some(rest) = text
            .strip_prefix(keyword)
            .and_then(|rest| rest.strip_prefix(' '))
        {
            return rest;
        }
    }
    text
}

/// Literal text is escaped; each `{placeholder}` matches any non-empty span
pub fn pattern_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::from("^");
    let mut last = 0;
    for placeholder in PLACEHOLDER_REGEX.find_iter(pattern) {
        source.push_str(&regex::escape(&pattern[last..placeholder.start()]));
        source.push_str(".+");
        last = placeholder.end();
    }
    source.push_str(&regex::escape(&pattern[last..]));
    source.push('$');
    Regex::new(&source)
}
