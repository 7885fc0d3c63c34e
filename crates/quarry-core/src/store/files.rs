//! Registry of every walked file plus the merged list of root folders.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::models::LanguageId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub language: Option<LanguageId>,
    pub content_hash: Option<String>,
}

#[derive(Debug, Default)]
pub struct FileRegistry {
    files: IndexMap<String, FileEntry>,
    root_folders: Vec<PathBuf>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file. Source files also widen the root folders.
    pub fn insert(&mut self, entry: FileEntry) {
        if entry.language.is_some() {
            if let Some(dir) = Path::new(&entry.path).parent() {
                self.merge_root_folder(dir);
            }
        }
        self.files.insert(entry.path.clone(), entry);
    }

    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        self.files.shift_remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn root_folders(&self) -> &[PathBuf] {
        &self.root_folders
    }

    /// Whether `path` lies under one of the root folders.
    pub fn in_root_folder(&self, path: &str) -> bool {
        let path = Path::new(path);
        self.root_folders.iter().any(|root| path.starts_with(root))
    }

    /// Merge `dir` into the first root sharing at least one leading normal
    /// component with it, shortening that root to the common prefix.
    /// Otherwise `dir` becomes a new root.
    fn merge_root_folder(&mut self, dir: &Path) {
        for root in self.root_folders.iter_mut() {
            let common = common_prefix(root, dir);
            let shared = common
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count();
            if shared > 0 {
                *root = common;
                return;
            }
        }
        self.root_folders.push(dir.to_path_buf());
    }
}

fn common_prefix(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn source(path: &str) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            language: Some(LanguageId::JavaScript),
            content_hash: None,
        }
    }

    #[test]
    fn test_root_folders_merge_on_shared_prefix() {
        let mut files = FileRegistry::new();
        files.insert(source("/ws/app/src/a.js"));
        files.insert(source("/ws/app/lib/b.js"));
        files.insert(source("/opt/platform/c.js"));
        assert_eq!(
            files.root_folders(),
            [PathBuf::from("/ws/app"), PathBuf::from("/opt/platform")]
        );
        assert!(files.in_root_folder("/ws/app/src/a.js"));
        assert!(!files.in_root_folder("/tmp/x.js"));
    }

    #[test]
    fn test_non_source_files_do_not_move_roots() {
        let mut files = FileRegistry::new();
        files.insert(FileEntry {
            path: "/docs/readme.md".to_string(),
            language: None,
            content_hash: None,
        });
        assert!(files.root_folders().is_empty());
        assert!(files.contains("/docs/readme.md"));
    }

    #[test]
    fn test_remove() {
        let mut files = FileRegistry::new();
        files.insert(source("/ws/a.js"));
        assert!(files.remove("/ws/a.js").is_some());
        assert!(files.is_empty());
    }
}
