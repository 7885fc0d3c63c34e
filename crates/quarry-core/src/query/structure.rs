//! Per-file outline and symbol-to-symbol navigation.

use crate::models::SymbolInfo;
use crate::store::SymbolStore;

/// Classes, their members and the file's functions, ordered by line.
///
/// Members sharing a line with their class sort after it.
pub fn file_outline(store: &SymbolStore, file_path: &str) -> Vec<SymbolInfo> {
    let mut outline: Vec<SymbolInfo> = Vec::new();
    for class in store.file_classes(file_path) {
        outline.push(class.symbol().clone());
        outline.extend(
            class
                .methods
                .values()
                .filter(|m| m.file_path == file_path)
                .map(|m| m.symbol().clone()),
        );
    }
    outline.extend(store.file_functions(file_path).map(|f| f.symbol().clone()));
    outline.sort_by_key(|s| s.location.line);
    outline
}

/// The next (or previous) outline entry strictly after (or before) `line`.
pub fn adjacent_symbol(outline: &[SymbolInfo], line: usize, forward: bool) -> Option<&SymbolInfo> {
    if forward {
        outline.iter().find(|s| s.location.line > line)
    } else {
        outline.iter().rev().find(|s| s.location.line < line)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
