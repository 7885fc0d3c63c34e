//! Best-effort "go to definition" over the symbol store.
//!
//! Resolution tries, in order: `super` inside a constructor, `this.x` /
//! `self.x`, `super.x`, `X.prototype.m.call(` spans, and finally a
//! name-only lookup across every class and function of the language.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::indexer::filesystem::is_test_path;
use crate::indexer::symbols::extractor_for;
use crate::models::{LanguageId, MethodRecord, SymbolInfo};
use crate::query::guards::MAX_INHERITANCE_DEPTH;
use crate::store::SymbolStore;

static PROTOTYPE_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\.prototype\.(\w+)\.(?:call|apply)\s*\(").unwrap());
static PREVIOUS_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)[^A-Za-z0-9_]*[A-Za-z0-9_]*$").unwrap()
});
static TRAILING_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+$").unwrap());

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// The word before the one containing `index`.
pub fn previous_word(text: &str, index: usize) -> Option<&str> {
    let head = &text[..floor_boundary(text, index)];
    PREVIOUS_WORD_RE
        .captures(head)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The word containing `index`.
pub fn current_word(text: &str, index: usize) -> Option<&str> {
    let index = floor_boundary(text, index);
    match text[index..].char_indices().find(|(_, c)| !is_word_char(*c)) {
        Some((offset, c)) => previous_word(text, index + offset + c.len_utf8()),
        None => TRAILING_WORD_RE.find(text).map(|m| m.as_str()),
    }
}

/// Where a member is defined, searching `class_name` then its ancestors
/// depth-first in declared parent order. The first hit wins. A parent
/// with no class record ends that branch.
pub fn find_member<'s>(
    store: &'s SymbolStore,
    class_name: &str,
    member: &str,
    language: LanguageId,
) -> Option<&'s MethodRecord> {
    find_member_at(store, class_name, member, language, 0)
}

fn find_member_at<'s>(
    store: &'s SymbolStore,
    class_name: &str,
    member: &str,
    language: LanguageId,
    depth: usize,
) -> Option<&'s MethodRecord> {
    if depth > MAX_INHERITANCE_DEPTH {
        return None;
    }
    let class = store.class(class_name, language)?;
    if let Some(record) = class.member(member) {
        return Some(record);
    }
    store
        .parents(class_name, language)
        .iter()
        .find_map(|parent| find_member_at(store, parent, member, language, depth + 1))
}

fn find_in_parents<'s>(
    store: &'s SymbolStore,
    class_name: &str,
    member: &str,
    language: LanguageId,
) -> Option<&'s MethodRecord> {
    store
        .parents(class_name, language)
        .iter()
        .find_map(|parent| find_member(store, parent, member, language))
}

/// The member of `class_name` declared in `file_path` whose declaration is
/// the nearest one at or above `line`.
pub fn enclosing_member<'s>(
    store: &'s SymbolStore,
    class_name: &str,
    language: LanguageId,
    file_path: &str,
    line: usize,
) -> Option<&'s MethodRecord> {
    store
        .class(class_name, language)?
        .methods
        .values()
        .filter(|m| m.file_path == file_path && m.line <= line)
        .max_by_key(|m| m.line)
}

/// A file as the resolver sees it.
pub struct SourceView<'a> {
    pub file_path: &'a str,
    pub language: LanguageId,
    pub lines: &'a [&'a str],
}

pub struct DefinitionResolver<'s> {
    store: &'s SymbolStore,
}

impl<'s> DefinitionResolver<'s> {
    pub fn new(store: &'s SymbolStore) -> Self {
        Self { store }
    }

    /// Resolve the word at `(line, column)`. Several results mean the name
    /// is ambiguous; none means nothing matched.
    pub fn resolve(&self, source: &SourceView<'_>, line: usize, column: usize) -> Vec<SymbolInfo> {
        let Some(text) = source.lines.get(line).copied() else {
            return Vec::new();
        };
        let Some(word) = current_word(text, column) else {
            return Vec::new();
        };
        let language = source.language;
        let extractor = extractor_for(language);
        let enclosing = || extractor.current_class(source.lines, line);

        if word == "super" {
            if let Some(class_name) = enclosing() {
                let constructor = language.constructor_name();
                let in_constructor =
                    enclosing_member(self.store, &class_name, language, source.file_path, line)
                        .is_some_and(|m| m.name == constructor);
                if in_constructor {
                    let bare = constructor.trim_end_matches("()");
                    if let Some(found) = find_in_parents(self.store, &class_name, bare, language) {
                        return vec![found.symbol().clone()];
                    }
                }
            }
        }

        match previous_word(text, column) {
            Some("this") | Some("self") => {
                if let Some(class_name) = enclosing() {
                    if let Some(found) = find_member(self.store, &class_name, word, language) {
                        return vec![found.symbol().clone()];
                    }
                }
            }
            Some("super") => {
                if let Some(class_name) = enclosing() {
                    if let Some(found) = find_in_parents(self.store, &class_name, word, language) {
                        return vec![found.symbol().clone()];
                    }
                }
            }
            _ => {}
        }

        if let Some(caps) = PROTOTYPE_CALL_RE.captures(text) {
            if let Some(span) = caps.get(0) {
                if (span.start()..=span.end()).contains(&column) {
                    if let Some(found) = find_member(self.store, &caps[1], &caps[2], language) {
                        return vec![found.symbol().clone()];
                    }
                }
            }
        }

        self.by_name(source, word)
    }

    /// Every class named `name`, every member named `name`, and every
    /// function named `name` that is exported or local to the file.
    /// Test-folder symbols are skipped from non-test code, and imported
    /// names never resolve to functions.
    pub fn by_name(&self, source: &SourceView<'_>, name: &str) -> Vec<SymbolInfo> {
        let product_code = !is_test_path(source.file_path);
        let mut found = Vec::new();

        for class in self.store.classes_in(source.language) {
            if product_code && is_test_path(&class.file_path) {
                continue;
            }
            if class.name == name {
                found.push(class.symbol().clone());
            } else if let Some(member) = class.member(name) {
                found.push(member.symbol().clone());
            }
        }

        let imports: HashSet<String> =
            extractor_for(source.language).named_imports(source.lines);
        if !imports.contains(name) {
            for function in self.store.functions_named(name, source.language) {
                let reachable = function.exported || function.file_path == source.file_path;
                if reachable && (!product_code || !is_test_path(&function.file_path)) {
                    found.push(function.symbol().clone());
                }
            }
        }
        found
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
