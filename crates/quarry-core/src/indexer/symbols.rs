//! Per-file symbol extraction output and language dispatch.
//!
//! Each supported syntax implements [`Extractor`]; the pipeline, the
//! definition resolver and the linter only talk to this trait.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::indexer::javascript::Dialect;
use crate::indexer::python::PythonExtractor;
use crate::models::{ClassRecord, LanguageId, MethodRecord};

// ---------------------------------------------------------------------------
// Extracted types
// ---------------------------------------------------------------------------

/// A class found in one file together with its ordered parent names.
#[derive(Clone, Debug)]
pub struct ExtractedClass {
    pub record: ClassRecord,
    pub parents: Vec<String>,
}

/// Everything one file contributes to the symbol store.
#[derive(Clone, Debug, Default)]
pub struct FileSymbols {
    pub classes: Vec<ExtractedClass>,
    pub functions: Vec<MethodRecord>,
}

impl FileSymbols {
    /// Declare a class, replacing an earlier one of the same name in this
    /// file. Returns its index.
    pub fn declare_class(&mut self, record: ClassRecord, parent: Option<&str>) -> usize {
        let entry = ExtractedClass {
            parents: parent
                .filter(|p| !p.is_empty())
                .map(|p| vec![p.to_string()])
                .unwrap_or_default(),
            record,
        };
        match self
            .classes
            .iter()
            .position(|c| c.record.name == entry.record.name)
        {
            Some(index) => {
                self.classes[index] = entry;
                index
            }
            None => {
                self.classes.push(entry);
                self.classes.len() - 1
            }
        }
    }

    /// Append a parent to a declared class unless it is already listed.
    pub fn add_parent(&mut self, index: usize, parent: &str) {
        if let Some(class) = self.classes.get_mut(index) {
            if !parent.is_empty() && !class.parents.iter().any(|p| p == parent) {
                class.parents.push(parent.to_string());
            }
        }
    }

    pub fn insert_member(&mut self, index: usize, member: MethodRecord) {
        if let Some(class) = self.classes.get_mut(index) {
            class.record.insert_member(member);
        }
    }

    pub fn class(&self, name: &str) -> Option<&ExtractedClass> {
        self.classes.iter().find(|c| c.record.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&MethodRecord> {
        self.functions.iter().find(|f| f.bare_name() == name)
    }

    pub fn symbol_count(&self) -> usize {
        self.functions.len()
            + self
                .classes
                .iter()
                .map(|c| c.record.methods.len())
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Extractor seam
// ---------------------------------------------------------------------------

/// A line-oriented declaration scanner for one source syntax.
pub trait Extractor: Send + Sync {
    fn language(&self) -> LanguageId;

    /// Scan a whole file. Never fails: unrecognized text contributes nothing.
    fn scan(&self, file_path: &str, lines: &[&str], in_workspace: bool) -> FileSymbols;

    /// Name of the class enclosing `line`, found by scanning upward.
    fn current_class(&self, lines: &[&str], line: usize) -> Option<String>;

    /// Names bound by import statements in the file.
    fn named_imports(&self, lines: &[&str]) -> HashSet<String>;
}

static JAVASCRIPT: LazyLock<Dialect> = LazyLock::new(Dialect::javascript);
static TYPESCRIPT: LazyLock<Dialect> = LazyLock::new(Dialect::typescript);
static PYTHON: PythonExtractor = PythonExtractor;

pub fn extractor_for(language: LanguageId) -> &'static dyn Extractor {
    match language {
        LanguageId::JavaScript => &*JAVASCRIPT,
        LanguageId::TypeScript => &*TYPESCRIPT,
        LanguageId::Python => &PYTHON,
    }
}

/// Split file text into lines the way editors number them.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Extract all symbols from one file's text.
pub fn extract_symbols(
    text: &str,
    file_path: &str,
    language: LanguageId,
    in_workspace: bool,
) -> FileSymbols {
    let lines = split_lines(text);
    extractor_for(language).scan(file_path, &lines, in_workspace)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> ClassRecord {
        ClassRecord::new(name, "/ws/a.js", 0, name.len(), LanguageId::JavaScript)
    }

    #[test]
    fn test_redeclared_class_replaces_earlier() {
        let mut symbols = FileSymbols::default();
        let first = symbols.declare_class(class("Foo"), Some("Base"));
        symbols.declare_class(class("Bar"), None);
        let again = symbols.declare_class(class("Foo"), Some("Other"));
        assert_eq!(first, again);
        assert_eq!(symbols.classes.len(), 2);
        assert_eq!(symbols.class("Foo").unwrap().parents, vec!["Other"]);
    }

    #[test]
    fn test_add_parent_is_additive() {
        let mut symbols = FileSymbols::default();
        let idx = symbols.declare_class(class("Foo"), Some("Base"));
        symbols.add_parent(idx, "Mixin");
        symbols.add_parent(idx, "Base");
        assert_eq!(symbols.classes[idx].parents, vec!["Base", "Mixin"]);
    }

    #[test]
    fn test_split_lines_handles_crlf() {
        assert_eq!(split_lines("a\r\nb\nc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dispatch_by_language() {
        assert_eq!(
            extractor_for(LanguageId::TypeScript).language(),
            LanguageId::TypeScript
        );
        assert_eq!(extractor_for(LanguageId::Python).language(), LanguageId::Python);
    }
}
