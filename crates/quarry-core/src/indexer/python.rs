//! Python declaration scanner.
//!
//! Python needs no brace tracking: a `class` line opens a class, indented
//! `def` lines add methods to it, and a top-level `def` closes it again and
//! becomes a module function.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::indexer::normalize::{match_multi_line, LineMatch};
use crate::indexer::symbols::{Extractor, FileSymbols};
use crate::models::{ClassRecord, LanguageId, MethodRecord, SymbolKind};

static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)class\s+(\w+)\s*(?:\(([^)]*)\))?\s*:").unwrap());
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s+)(?:async\s+)?def\s+(\w+)\s*\((.*?)\)(?:\s*->.*?)?\s*:").unwrap()
});
static METHOD_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+(?:async\s+)?def\s+\w+\s*\([^)]*$").unwrap());
static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?def\s+(\w+)\s*\((.*?)\)(?:\s*->.*?)?\s*:").unwrap()
});
static FUNCTION_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:async\s+)?def\s+\w+\s*\([^)]*$").unwrap());
static FROM_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+[\w.]+\s+import\s+\(?([\w\s,]+)\)?").unwrap());
static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+([\w.]+)(?:\s+as\s+(\w+))?").unwrap());

#[derive(Clone, Copy, Debug, Default)]
pub struct PythonExtractor;

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Real base classes from a class header's argument list: keyword arguments
/// such as `metaclass=ABCMeta` are dropped, dotted names keep their last part.
fn base_names(bases: &str) -> Vec<String> {
    bases
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty() && !b.contains('='))
        .filter_map(|b| b.rsplit('.').next())
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

fn match_def(
    full: &Regex,
    start: &Regex,
    line: &str,
    line_no: usize,
    lines: &[&str],
) -> Option<LineMatch> {
    full.captures(line)
        .map(|caps| LineMatch::from_captures(&caps))
        .or_else(|| match_multi_line(line, line_no, lines, start, full))
}

impl Extractor for PythonExtractor {
    fn language(&self) -> LanguageId {
        LanguageId::Python
    }

    fn scan(&self, file_path: &str, lines: &[&str], in_workspace: bool) -> FileSymbols {
        let mut out = FileSymbols::default();
        // (class index, class indent, body indent once known)
        let mut current: Option<(usize, usize, Option<usize>)> = None;

        for (line_no, raw) in lines.iter().enumerate() {
            if let Some(caps) = CLASS_RE.captures(raw) {
                let name = &caps[2];
                let column = caps.get(2).map_or(0, |m| m.end());
                let mut record =
                    ClassRecord::new(name, file_path, line_no, column, LanguageId::Python);
                record.in_workspace = in_workspace;
                let bases = caps.get(3).map(|m| base_names(m.as_str())).unwrap_or_default();
                let index = out.declare_class(record, None);
                for base in &bases {
                    out.add_parent(index, base);
                }
                current = Some((index, caps[1].len(), None));
                continue;
            }

            if let Some((index, class_indent, body_indent)) = current {
                if let Some(m) = match_def(&METHOD_RE, &METHOD_START_RE, raw, line_no, lines) {
                    let indent = m.get(1).map(str::len).unwrap_or_default();
                    let is_member = indent > class_indent
                        && body_indent.map_or(true, |body| indent == body);
                    if is_member {
                        let name = m.get(2).unwrap_or_default();
                        let record = MethodRecord::callable(
                            name,
                            SymbolKind::Method,
                            file_path,
                            line_no,
                            raw.find(name).unwrap_or(0) + name.len(),
                            LanguageId::Python,
                        )
                        .with_params(m.get(3).map(str::to_string));
                        out.insert_member(index, record);
                        current = Some((index, class_indent, Some(indent)));
                    }
                    continue;
                }
            }

            if let Some(m) = match_def(&FUNCTION_RE, &FUNCTION_START_RE, raw, line_no, lines) {
                let name = m.get(1).unwrap_or_default();
                let mut record = MethodRecord::callable(
                    name,
                    SymbolKind::Function,
                    file_path,
                    line_no,
                    raw.find(name).unwrap_or(0) + name.len(),
                    LanguageId::Python,
                )
                .with_params(m.get(2).map(str::to_string));
                record.exported = true;
                record.in_workspace = in_workspace;
                out.functions.push(record);
                current = None;
            }
        }
        out
    }

    fn current_class(&self, lines: &[&str], line: usize) -> Option<String> {
        if lines.is_empty() {
            return None;
        }
        let line = line.min(lines.len() - 1);
        if let Some(caps) = CLASS_RE.captures(lines[line]) {
            return Some(caps[2].to_string());
        }
        // Walk outward through enclosing blocks; the first one that is a
        // class header wins, a top-level statement ends the search.
        let mut scope = if lines[line].trim().is_empty() {
            usize::MAX
        } else {
            indent_of(lines[line])
        };
        for text in lines[..line].iter().rev() {
            if text.trim().is_empty() || indent_of(text) >= scope {
                continue;
            }
            if let Some(caps) = CLASS_RE.captures(text) {
                return Some(caps[2].to_string());
            }
            scope = indent_of(text);
            if scope == 0 {
                return None;
            }
        }
        None
    }

    fn named_imports(&self, lines: &[&str]) -> HashSet<String> {
        let mut names = HashSet::new();
        for line in lines {
            if let Some(caps) = FROM_IMPORT_RE.captures(line) {
                for item in caps[1].split(',') {
                    if let Some(bound) = item.split_whitespace().last() {
                        names.insert(bound.to_string());
                    }
                }
            } else if let Some(caps) = IMPORT_RE.captures(line) {
                let bound = caps
                    .get(2)
                    .map(|m| m.as_str())
                    .or_else(|| caps[1].rsplit('.').next())
                    .unwrap_or_default();
                if !bound.is_empty() {
                    names.insert(bound.to_string());
                }
            }
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
