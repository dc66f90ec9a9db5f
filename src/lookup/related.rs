//! Related-code finder
//!
//! Looks for page-object and service class names in a step handler's
//! surroundings and resolves each to the file that declares it. How a name
//! maps to a directory and file is decided by a [`CodeRole`], so other
//! conventions can be plugged in without touching the scanner.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::snippet::format_snippet;
use super::step_locator::relative_to;
use crate::config::RoleConfig;

/// Results returned per lookup
pub const MAX_RELATED: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedCodeSnippet {
    pub name: String,
    pub file: PathBuf,
    pub line: usize,
    pub snippet: String,
}

/// A naming convention tying a class-name suffix to a source location
pub trait CodeRole: Send + Sync {
    /// Suffix that marks a name as belonging to this role, e.g. `Page`
    fn suffix(&self) -> &str;

    /// File expected to declare `name`, relative to the project root
    fn source_path(&self, name: &str) -> PathBuf;

    /// Whether `line` opens the declaration of `name`
    fn declares(&self, line: &str, name: &str) -> bool;
}

/// Role driven by configuration: `BookingPage` -> `pages/booking_page.py`
#[derive(Debug, Clone)]
pub struct ConventionRole {
    suffix: String,
    directory: PathBuf,
    extension: String,
    declaration: String,
}

impl ConventionRole {
    pub fn new(suffix: &str, directory: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            directory: directory.into(),
            extension: extension.to_string(),
            declaration: "class".to_string(),
        }
    }

    pub fn with_declaration(mut self, keyword: &str) -> Self {
        self.declaration = keyword.to_string();
        self
    }
}

impl From<&RoleConfig> for ConventionRole {
    fn from(config: &RoleConfig) -> Self {
        ConventionRole::new(&config.suffix, &config.directory, &config.extension)
            .with_declaration(&config.declaration)
    }
}

impl CodeRole for ConventionRole {
    fn suffix(&self) -> &str {
        &self.suffix
    }

    fn source_path(&self, name: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", camel_to_snake(name), self.extension))
    }

    fn declares(&self, line: &str, name: &str) -> bool {
        line.trim_start()
            .strip_prefix(&self.declaration)
            .and_then(|rest| rest.strip_prefix(' '))
            .and_then(|rest| rest.trim_start().strip_prefix(name))
            .map(|after| {
                !after
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
            })
            .unwrap_or(false)
    }
}

pub struct RelatedCodeFinder {
    project_root: PathBuf,
    roles: Vec<Box<dyn CodeRole>>,
    name_regex: Option<Regex>,
}

impl RelatedCodeFinder {
    pub fn new(project_root: impl AsRef<Path>, roles: Vec<Box<dyn CodeRole>>) -> Self {
        let name_regex = build_name_regex(&roles);
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            roles,
            name_regex,
        }
    }

    pub fn from_configs(project_root: impl AsRef<Path>, configs: &[RoleConfig]) -> Self {
        let roles = configs
            .iter()
            .map(|c| Box::new(ConventionRole::from(c)) as Box<dyn CodeRole>)
            .collect();
        Self::new(project_root, roles)
    }

    /// Scan `context_lines` for role-suffixed names and return at most
    /// [`MAX_RELATED`] declarations that exist on disk
    pub fn find_related(&self, context_lines: &[String]) -> Vec<RelatedCodeSnippet> {
        let mut related = Vec::new();
        let Some(name_regex) = &self.name_regex else {
            return related;
        };
        if context_lines.is_empty() {
            return related;
        }

        let text = context_lines.join("\n");
        let names: BTreeSet<&str> = name_regex.find_iter(&text).map(|m| m.as_str()).collect();

        for name in names {
            let Some(role) = self.role_for(name) else {
                continue;
            };
            let path = self.project_root.join(role.source_path(name));
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let lines: Vec<String> = content.lines().map(String::from).collect();
            let class_idx = lines
                .iter()
                .position(|line| role.declares(line, name))
                .unwrap_or(0);

            related.push(RelatedCodeSnippet {
                name: name.to_string(),
                file: relative_to(&path, &self.project_root),
                line: class_idx + 1,
                snippet: format_snippet(&lines, class_idx),
            });
            if related.len() >= MAX_RELATED {
                break;
            }
        }
        related
    }

    /// Longest matching suffix wins so `AdminPage` never lands on a `Page`
    /// role when an `AdminPage` role exists.
    fn role_for(&self, name: &str) -> Option<&dyn CodeRole> {
        self.roles
            .iter()
            .filter(|role| name.ends_with(role.suffix()))
            .max_by_key(|role| role.suffix().len())
            .map(|role| role.as_ref())
    }
}

fn build_name_regex(roles: &[Box<dyn CodeRole>]) -> Option<Regex> {
    let suffixes: Vec<String> = roles
        .iter()
        .filter(|role| !role.suffix().is_empty())
        .map(|role| regex::escape(role.suffix()))
        .collect();
    if suffixes.is_empty() {
        return None;
    }
    Regex::new(&format!(r"\b[A-Z][A-Za-z0-9]+(?:{})\b", suffixes.join("|"))).ok()
}

/// `BookingPage` -> `booking_page`; every interior capital starts a new word
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}
