//! In-memory symbol store: classes, parent edges and free functions keyed by
//! `(name, language)`.
//!
//! All mutation goes through the store. Replacing a file's symbols is one
//! `&mut self` call, so readers never observe a half-updated file.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::indexer::symbols::FileSymbols;
use crate::models::{ClassRecord, LanguageId, MethodRecord};

/// Lookup key shared by classes, parent edges and functions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolKey {
    pub name: String,
    pub language: LanguageId,
}

impl SymbolKey {
    pub fn new(name: impl Into<String>, language: LanguageId) -> Self {
        Self {
            name: name.into(),
            language,
        }
    }
}

/// What an invalidation removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    pub classes: usize,
    pub functions: usize,
}

#[derive(Debug, Default)]
pub struct SymbolStore {
    classes: IndexMap<SymbolKey, ClassRecord>,
    parents: HashMap<SymbolKey, Vec<String>>,
    functions: IndexMap<SymbolKey, Vec<MethodRecord>>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Classes ------------------------------------------------------------

    /// Insert or replace a class. Replacing drops the old parent edges.
    pub fn insert_class(&mut self, record: ClassRecord) {
        let key = SymbolKey::new(&record.name, record.language);
        self.parents.remove(&key);
        self.classes.insert(key, record);
    }

    pub fn class(&self, name: &str, language: LanguageId) -> Option<&ClassRecord> {
        self.classes.get(&SymbolKey::new(name, language))
    }

    /// All classes, in first-insertion order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassRecord> {
        self.classes.values()
    }

    pub fn classes_in(&self, language: LanguageId) -> impl Iterator<Item = &ClassRecord> {
        self.classes.values().filter(move |c| c.language == language)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    // -- Parent edges -------------------------------------------------------

    pub fn set_parents(&mut self, name: &str, language: LanguageId, parents: Vec<String>) {
        self.parents.insert(SymbolKey::new(name, language), parents);
    }

    /// Append a parent unless it is already listed.
    pub fn add_parent(&mut self, name: &str, language: LanguageId, parent: &str) {
        if parent.is_empty() {
            return;
        }
        let parents = self
            .parents
            .entry(SymbolKey::new(name, language))
            .or_default();
        if !parents.iter().any(|p| p == parent) {
            parents.push(parent.to_string());
        }
    }

    pub fn parents(&self, name: &str, language: LanguageId) -> &[String] {
        self.parents
            .get(&SymbolKey::new(name, language))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Direct subtypes, found by scanning every parent edge.
    pub fn subtypes(&self, name: &str, language: LanguageId) -> Vec<String> {
        let mut found: Vec<String> = self
            .parents
            .iter()
            .filter(|(key, parents)| key.language == language && parents.iter().any(|p| p == name))
            .map(|(key, _)| key.name.clone())
            .collect();
        found.sort();
        found
    }

    // -- Functions ----------------------------------------------------------

    pub fn add_function(&mut self, record: MethodRecord) {
        let key = SymbolKey::new(record.bare_name(), record.language);
        self.functions.entry(key).or_default().push(record);
    }

    pub fn functions_named(&self, name: &str, language: LanguageId) -> &[MethodRecord] {
        self.functions
            .get(&SymbolKey::new(name, language))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &MethodRecord> {
        self.functions.values().flatten()
    }

    // -- Per-file maintenance -----------------------------------------------

    /// Remove every class, parent edge and function declared in `file_path`.
    pub fn invalidate_file(&mut self, file_path: &str) -> Invalidation {
        let stale: Vec<SymbolKey> = self
            .classes
            .iter()
            .filter(|(_, c)| c.file_path == file_path)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            self.classes.shift_remove(key);
            self.parents.remove(key);
        }

        let mut functions = 0;
        self.functions.retain(|_, records| {
            let before = records.len();
            records.retain(|r| r.file_path != file_path);
            functions += before - records.len();
            !records.is_empty()
        });

        Invalidation {
            classes: stale.len(),
            functions,
        }
    }

    /// Insert one file's extraction output.
    pub fn insert_file_symbols(&mut self, symbols: FileSymbols) {
        for extracted in symbols.classes {
            let name = extracted.record.name.clone();
            let language = extracted.record.language;
            self.insert_class(extracted.record);
            self.set_parents(&name, language, extracted.parents);
        }
        for function in symbols.functions {
            self.add_function(function);
        }
    }

    /// Invalidate then re-insert one file.
    pub fn replace_file(&mut self, file_path: &str, symbols: FileSymbols) -> Invalidation {
        let removed = self.invalidate_file(file_path);
        self.insert_file_symbols(symbols);
        removed
    }

    /// Every symbol declared in `file_path`, in no particular order.
    pub fn file_classes<'a>(&'a self, file_path: &'a str) -> impl Iterator<Item = &'a ClassRecord> {
        self.classes.values().filter(move |c| c.file_path == file_path)
    }

    pub fn file_functions<'a>(
        &'a self,
        file_path: &'a str,
    ) -> impl Iterator<Item = &'a MethodRecord> {
        self.all_functions().filter(move |f| f.file_path == file_path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::symbols::extract_symbols;
    use crate::models::SymbolKind;

    const JS: LanguageId = LanguageId::JavaScript;

    fn class(name: &str, file: &str) -> ClassRecord {
        ClassRecord::new(name, file, 0, name.len(), JS)
    }

    fn function(name: &str, file: &str) -> MethodRecord {
        MethodRecord::callable(name, SymbolKind::Function, file, 0, name.len(), JS)
    }

    #[test]
    fn test_keys_are_per_language() {
        let mut store = SymbolStore::new();
        store.insert_class(class("Foo", "/a.js"));
        store.insert_class(ClassRecord::new("Foo", "/a.py", 0, 3, LanguageId::Python));
        assert_eq!(store.class_count(), 2);
        assert_eq!(store.class("Foo", JS).unwrap().file_path, "/a.js");
        assert!(store.class("Foo", LanguageId::TypeScript).is_none());
    }

    #[test]
    fn test_replace_class_drops_parents() {
        let mut store = SymbolStore::new();
        store.insert_class(class("Foo", "/a.js"));
        store.set_parents("Foo", JS, vec!["Base".into()]);
        store.insert_class(class("Foo", "/b.js"));
        assert!(store.parents("Foo", JS).is_empty());
        assert_eq!(store.class_count(), 1);
    }

    #[test]
    fn test_add_parent_is_additive() {
        let mut store = SymbolStore::new();
        store.set_parents("Foo", JS, vec!["Base".into()]);
        store.add_parent("Foo", JS, "Mixin");
        store.add_parent("Foo", JS, "Base");
        assert_eq!(store.parents("Foo", JS), ["Base", "Mixin"]);
        assert!(store.parents("Missing", JS).is_empty());
    }

    #[test]
    fn test_subtypes() {
        let mut store = SymbolStore::new();
        store.set_parents("Dog", JS, vec!["Animal".into()]);
        store.set_parents("Cat", JS, vec!["Animal".into(), "Pet".into()]);
        store.set_parents("Fish", LanguageId::Python, vec!["Animal".into()]);
        assert_eq!(store.subtypes("Animal", JS), vec!["Cat", "Dog"]);
        assert_eq!(store.subtypes("Pet", JS), vec!["Cat"]);
    }

    #[test]
    fn test_functions_are_lists() {
        let mut store = SymbolStore::new();
        store.add_function(function("init", "/a.js"));
        store.add_function(function("init", "/b.js"));
        assert_eq!(store.functions_named("init", JS).len(), 2);
        assert_eq!(store.all_functions().count(), 2);
    }

    #[test]
    fn test_invalidate_file() {
        let mut store = SymbolStore::new();
        store.insert_class(class("Foo", "/a.js"));
        store.set_parents("Foo", JS, vec!["Base".into()]);
        store.insert_class(class("Bar", "/b.js"));
        store.add_function(function("init", "/a.js"));
        store.add_function(function("init", "/b.js"));
        store.add_function(function("only", "/a.js"));

        let removed = store.invalidate_file("/a.js");
        assert_eq!(removed, Invalidation { classes: 1, functions: 2 });
        assert!(store.class("Foo", JS).is_none());
        assert!(store.parents("Foo", JS).is_empty());
        assert!(store.class("Bar", JS).is_some());
        assert_eq!(store.functions_named("init", JS).len(), 1);
        assert!(store.functions_named("only", JS).is_empty());
    }

    #[test]
    fn test_replace_file_leaves_no_stale_records() {
        let mut store = SymbolStore::new();
        let before = "class Foo extends Base {\n    old() {}\n}\nexport function gone() {}\n";
        let after = "class Foo extends Other {\n    fresh() {}\n}\n";
        store.replace_file("/ws/a.js", extract_symbols(before, "/ws/a.js", JS, true));
        store.replace_file("/ws/a.js", extract_symbols(after, "/ws/a.js", JS, true));

        let foo = store.class("Foo", JS).unwrap();
        assert!(foo.member("fresh").is_some());
        assert!(foo.member("old").is_none());
        assert_eq!(store.parents("Foo", JS), ["Other"]);
        assert!(store.functions_named("gone", JS).is_empty());
        assert_eq!(store.class_count(), 1);
    }
}
