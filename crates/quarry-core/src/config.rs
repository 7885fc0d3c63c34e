//! Index configuration: editor-style JSON settings plus `QUARRY_*` overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::errors::{QuarryError, QuarryResult};

pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 500;
pub const DEFAULT_WORKERS: usize = 4;

const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "doc",
    "coverage",
    "bundles",
    "Doc",
    "Externals",
];

pub const ENV_MAX_SEARCH_RESULTS: &str = "QUARRY_MAX_SEARCH_RESULTS";
pub const ENV_INCLUDE_ES_OUTSIDE_WORKSPACE: &str = "QUARRY_INCLUDE_ES_OUTSIDE_WORKSPACE";
pub const ENV_DEBUG: &str = "QUARRY_DEBUG";

/// Severity attached to a lint finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LintConfig {
    pub enabled: bool,
    /// Report call targets that no indexed class defines.
    pub method_check: bool,
    /// Severity for missing API documentation.
    pub api_severity: Severity,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method_check: false,
            api_severity: Severity::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    pub workspace_folder: Option<PathBuf>,
    #[serde(deserialize_with = "deserialize_search_paths")]
    pub search_paths: Vec<PathBuf>,
    pub ignore_dirs: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub respect_gitignore: bool,
    pub max_search_results: usize,
    #[serde(rename = "includeESOutsideWorkspace")]
    pub include_es_outside_workspace: bool,
    pub workers: usize,
    pub debug: bool,
    pub lint: LintConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            workspace_folder: None,
            search_paths: Vec::new(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            ignore_patterns: Vec::new(),
            respect_gitignore: false,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            include_es_outside_workspace: false,
            workers: DEFAULT_WORKERS,
            debug: false,
            lint: LintConfig::default(),
        }
    }
}

impl IndexConfig {
    /// Config rooted at one workspace folder, everything else defaulted.
    pub fn for_workspace(folder: impl Into<PathBuf>) -> Self {
        Self {
            workspace_folder: Some(folder.into()),
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> QuarryResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| QuarryError::Config(format!("invalid configuration: {e}")))
    }

    pub fn load(path: &Path) -> QuarryResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            QuarryError::Config(format!("cannot read configuration {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Apply `QUARRY_*` environment overrides on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_MAX_SEARCH_RESULTS) {
            match raw.trim().parse::<usize>() {
                Ok(v) if v > 0 => self.max_search_results = v,
                _ => warn!("ignoring {ENV_MAX_SEARCH_RESULTS}={raw:?}: expected a positive integer"),
            }
        }
        if let Some(raw) = lookup(ENV_INCLUDE_ES_OUTSIDE_WORKSPACE) {
            self.include_es_outside_workspace = parse_switch(&raw);
        }
        if let Some(raw) = lookup(ENV_DEBUG) {
            self.debug = parse_switch(&raw);
        }
    }

    /// Scan roots: the configured search paths, else the workspace folder.
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        self.workspace_folder.iter().cloned().collect()
    }

    /// Whether a file lies under the tracked workspace folder.
    pub fn is_workspace_file(&self, path: &str) -> bool {
        match &self.workspace_folder {
            Some(folder) => Path::new(path).starts_with(folder),
            None => false,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

fn parse_switch(raw: &str) -> bool {
    let v = raw.trim().to_lowercase();
    !matches!(v.as_str(), "0" | "false" | "no" | "off")
}

/// Split a `;`-separated search-path setting, dropping blanks.
pub fn parse_search_paths(value: &str) -> Vec<PathBuf> {
    value
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn deserialize_search_paths<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Joined(String),
        List(Vec<PathBuf>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Joined(s) => parse_search_paths(&s),
        Raw::List(list) => list,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
