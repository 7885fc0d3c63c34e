//! Filesystem scanning helpers for indexing passes.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ignore::WalkBuilder;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::IndexConfig;
use crate::errors::{QuarryError, QuarryResult};
use crate::models::LanguageId;

static TEST_FOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\/]tests?[\\/]").unwrap());

/// Package markers that carry no searchable symbols.
const SKIPPED_FILE_STEM: &str = "__init__";

fn matches_pattern(rel_path: &str, pattern: &str) -> bool {
    let normalized = rel_path.replace('\\', "/");
    glob_match(&normalized, pattern)
        || glob_match(
            Path::new(&normalized)
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default()
                .as_str(),
            pattern,
        )
}

/// `*` / `?` glob match over the whole text.
fn glob_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let mut dp = vec![vec![false; p.len() + 1]; t.len() + 1];
    dp[0][0] = true;
    for j in 1..=p.len() {
        if p[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=t.len() {
        for j in 1..=p.len() {
            dp[i][j] = match p[j - 1] {
                '*' => dp[i][j - 1] || dp[i - 1][j],
                '?' => dp[i - 1][j - 1],
                c => c == t[i - 1] && dp[i - 1][j - 1],
            };
        }
    }
    dp[t.len()][p.len()]
}

fn is_skipped_file(path: &Path) -> bool {
    path.file_stem().and_then(|s| s.to_str()) == Some(SKIPPED_FILE_STEM)
}

/// Walk one search root and return every indexable file, in a stable
/// (file-name sorted) order. Unreadable entries are logged and skipped.
pub fn iter_source_files(root: &Path, config: &IndexConfig) -> QuarryResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(QuarryError::Walk(format!(
            "search path is not a directory: {}",
            root.display()
        )));
    }

    let ignore_dirs = config.ignore_dirs.clone();
    let ignore_patterns: Vec<String> = config
        .ignore_patterns
        .iter()
        .map(|p| p.trim().trim_start_matches("./").trim_end_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .collect();
    let walk_root = root.to_path_buf();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .parents(config.respect_gitignore)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .git_global(false)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let name = entry.file_name().to_string_lossy();
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir && ignore_dirs.iter().any(|d| d.as_str() == name) {
                return false;
            }
            let rel = entry
                .path()
                .strip_prefix(&walk_root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            !ignore_patterns.iter().any(|p| matches_pattern(&rel, p))
        });

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|t| t.is_file()) && !is_skipped_file(entry.path())
                {
                    files.push(entry.into_path());
                }
            }
            Err(err) => warn!("skipping unreadable entry under {}: {err}", root.display()),
        }
    }
    Ok(files)
}

pub fn detect_language(path: &Path) -> Option<LanguageId> {
    let ext = path.extension()?.to_str()?;
    LanguageId::from_extension(ext)
}

/// Whether the path has a `test/` or `tests/` folder component.
pub fn is_test_path(path: &str) -> bool {
    TEST_FOLDER_RE.is_match(path)
}

pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash of a file's text as the extractors see it (lossy UTF-8).
pub fn compute_content_hash(path: &Path) -> QuarryResult<String> {
    let data = std::fs::read(path)?;
    Ok(content_hash(String::from_utf8_lossy(&data).as_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
