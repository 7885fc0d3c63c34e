//! Convention lint pass for JavaScript and TypeScript files.
//!
//! Checks run over the raw lines of one file plus the symbols the store
//! holds for it:
//!
//! - `x._name` access from outside the owning class
//! - classes and public methods without a preceding doc comment
//! - protected overrides that never call `super._name`
//! - call targets no indexed class or resolver lookup knows (opt-in)

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::config::{LintConfig, Severity};
use crate::indexer::normalize::{remove_line_comment, within_string};
use crate::models::{LanguageId, MethodRecord};
use crate::query::definition::{DefinitionResolver, SourceView};
use crate::query::guards::MAX_INHERITANCE_DEPTH;
use crate::store::{FileRegistry, SymbolStore};

static PROTECTED_ACCESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\.(_\w+)(\()?").unwrap());
static METHOD_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+(?:\(.*?\))?)\.(\w+)\(").unwrap());
static COMMENT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(//|/\*\*?|\*)").unwrap());
static DOC_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/?\*").unwrap());

/// Methods of the basic built-in classes (String, Array, Object, Number,
/// Date, Set, Map, Promise).
const BUILTIN_METHODS: &[&str] = &[
    // Object
    "constructor", "hasOwnProperty", "isPrototypeOf", "propertyIsEnumerable",
    "toLocaleString", "toString", "valueOf",
    // String
    "at", "charAt", "charCodeAt", "codePointAt", "concat", "endsWith", "includes",
    "indexOf", "isWellFormed", "lastIndexOf", "localeCompare", "match", "matchAll",
    "normalize", "padEnd", "padStart", "repeat", "replace", "replaceAll", "search",
    "slice", "split", "startsWith", "substr", "substring", "toLocaleLowerCase",
    "toLocaleUpperCase", "toLowerCase", "toUpperCase", "toWellFormed", "trim",
    "trimEnd", "trimStart", "trimLeft", "trimRight",
    // Array
    "copyWithin", "entries", "every", "fill", "filter", "find", "findIndex",
    "findLast", "findLastIndex", "flat", "flatMap", "forEach", "join", "keys",
    "map", "pop", "push", "reduce", "reduceRight", "reverse", "shift", "some",
    "sort", "splice", "toReversed", "toSorted", "toSpliced", "unshift", "values",
    "with",
    // Number
    "toExponential", "toFixed", "toPrecision",
    // Date
    "getDate", "getDay", "getFullYear", "getHours", "getMilliseconds", "getMinutes",
    "getMonth", "getSeconds", "getTime", "getTimezoneOffset", "getUTCDate",
    "getUTCDay", "getUTCFullYear", "getUTCHours", "getUTCMilliseconds",
    "getUTCMinutes", "getUTCMonth", "getUTCSeconds", "getYear", "setDate",
    "setFullYear", "setHours", "setMilliseconds", "setMinutes", "setMonth",
    "setSeconds", "setTime", "setUTCDate", "setUTCFullYear", "setUTCHours",
    "setUTCMilliseconds", "setUTCMinutes", "setUTCMonth", "setUTCSeconds",
    "setYear", "toDateString", "toISOString", "toJSON", "toLocaleDateString",
    "toLocaleTimeString", "toTimeString", "toUTCString", "toGMTString",
    // Set / Map
    "add", "clear", "delete", "difference", "get", "has", "intersection",
    "isDisjointFrom", "isSubsetOf", "isSupersetOf", "set", "symmetricDifference",
    "union",
    // Promise
    "catch", "finally", "then",
];

/// DOM element and jQuery methods that never resolve to indexed classes.
const IGNORED_METHODS: &[&str] = &[
    "after", "animate", "append", "attachShadow", "before", "closest",
    "computedStyleMap", "getAttribute", "getAttributeNS", "getAttributeNames",
    "getAttributeNode", "getAttributeNodeNS", "getBoundingClientRect",
    "getClientRects", "getElementsByClassName", "getElementsByTagName",
    "getElementsByTagNameNS", "getInnerHTML", "hasAttribute", "hasAttributeNS",
    "hasAttributes", "hasPointerCapture", "insertAdjacentElement",
    "insertAdjacentHTML", "insertAdjacentText", "matches", "prepend",
    "querySelector", "querySelectorAll", "releasePointerCapture", "remove",
    "removeAttribute", "removeAttributeNS", "removeAttributeNode",
    "replaceChildren", "replaceWith", "requestFullscreen", "requestPointerLock",
    "scroll", "scrollBy", "scrollIntoView", "scrollIntoViewIfNeeded", "scrollTo",
    "setAttribute", "setAttributeNS", "setAttributeNode", "setAttributeNodeNS",
    "setPointerCapture", "toggleAttribute", "webkitMatchesSelector",
    "webkitRequestFullScreen", "webkitRequestFullscreen", "checkVisibility",
    "getAnimations", "attachInternals", "blur", "click", "focus", "hidePopover",
    "showPopover", "togglePopover", "checkValidity", "reportValidity",
    "setCustomValidity", "select", "setRangeText", "setSelectionRange",
    "showPicker", "stepDown", "stepUp",
    // jQuery and event emitters
    "parent", "children", "siblings", "is", "addClass", "toggleClass", "appendTo",
    "width", "outerWidth", "height", "outerHeight", "attr", "html",
    "stopPropagation", "bind", "setVisible", "trigger", "addListener",
    "removeListener", "hasOwn",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LintRule {
    ProtectedAccess,
    ClassDocs,
    MethodDocs,
    ProtectedSuperCall,
    UnresolvedMethod,
}

/// One finding. `start`/`end` are byte offsets on `line`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub message: String,
    pub severity: Severity,
    pub rule: LintRule,
}

impl Diagnostic {
    fn at_name(
        lines: &[&str],
        line: usize,
        name: &str,
        message: String,
        severity: Severity,
        rule: LintRule,
    ) -> Self {
        let start = lines.get(line).and_then(|l| l.find(name)).unwrap_or(0);
        Self {
            line,
            start,
            end: start + name.len(),
            message,
            severity,
            rule,
        }
    }
}

/// Whether `path` is a lint candidate at all.
pub fn should_lint(files: &FileRegistry, path: &str, language: LanguageId) -> bool {
    matches!(language, LanguageId::JavaScript | LanguageId::TypeScript)
        && !path.contains("/node_modules/")
        && files.in_root_folder(path)
}

/// Does any ancestor of `class_name` declare `member_key`?
pub fn has_parent_member(
    store: &SymbolStore,
    class_name: &str,
    member_key: &str,
    language: LanguageId,
) -> bool {
    fn walk(
        store: &SymbolStore,
        class_name: &str,
        member_key: &str,
        language: LanguageId,
        depth: usize,
    ) -> bool {
        if depth > MAX_INHERITANCE_DEPTH {
            return false;
        }
        store.parents(class_name, language).iter().any(|parent| {
            store
                .class(parent, language)
                .is_some_and(|c| c.methods.contains_key(member_key))
                || walk(store, parent, member_key, language, depth + 1)
        })
    }
    walk(store, class_name, member_key, language, 0)
}

/// Whether the nearest non-blank, non-`//` line above `line` opens or
/// continues a block comment. A declaration on the first line passes.
fn has_doc_comment(lines: &[&str], line: usize) -> bool {
    for above in lines[..line.min(lines.len())].iter().rev() {
        let text = above.trim();
        if text.is_empty() || text.starts_with("//") {
            continue;
        }
        return DOC_COMMENT_RE.is_match(text);
    }
    true
}

fn is_private_name(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('#')
}

pub struct Linter<'s> {
    store: &'s SymbolStore,
    config: &'s LintConfig,
}

impl<'s> Linter<'s> {
    pub fn new(store: &'s SymbolStore, config: &'s LintConfig) -> Self {
        Self { store, config }
    }

    /// All findings for one file, in check order.
    pub fn lint(&self, source: &SourceView<'_>) -> Vec<Diagnostic> {
        if !self.config.enabled {
            return Vec::new();
        }
        let mut diagnostics = Vec::new();
        for (row, line) in source.lines.iter().enumerate() {
            self.check_protected_access(row, line, &mut diagnostics);
        }
        if self.config.method_check {
            self.check_method_calls(source, &mut diagnostics);
        }
        self.check_protected_super_calls(source, &mut diagnostics);
        self.check_class_docs(source, &mut diagnostics);
        self.check_method_docs(source, &mut diagnostics);
        diagnostics
    }

    fn check_protected_access(&self, row: usize, line: &str, out: &mut Vec<Diagnostic>) {
        if COMMENT_START_RE.is_match(line) {
            return;
        }
        let code = remove_line_comment(line);
        for caps in PROTECTED_ACCESS_RE.captures_iter(code) {
            let receiver = &caps[1];
            if receiver.ends_with("this") || matches!(receiver, "super" | "self" | "prototype") {
                continue;
            }
            let Some(name) = caps.get(2) else { continue };
            if within_string(code, name.start()) {
                continue;
            }
            let (kind, display) = if caps.get(3).is_some() {
                ("function", format!("{}()", name.as_str()))
            } else {
                ("property", name.as_str().to_string())
            };
            out.push(Diagnostic {
                line: row,
                start: name.start(),
                end: name.end(),
                message: format!("Use of protected {kind} '{display}' outside of class."),
                severity: Severity::Error,
                rule: LintRule::ProtectedAccess,
            });
        }
    }

    fn check_class_docs(&self, source: &SourceView<'_>, out: &mut Vec<Diagnostic>) {
        for class in self.store.file_classes(source.file_path) {
            if class.language != source.language || has_doc_comment(source.lines, class.line) {
                continue;
            }
            out.push(Diagnostic::at_name(
                source.lines,
                class.line,
                &class.name,
                format!("Class '{}' does not have API documentation.", class.name),
                self.config.api_severity,
                LintRule::ClassDocs,
            ));
        }
    }

    fn check_method_docs(&self, source: &SourceView<'_>, out: &mut Vec<Diagnostic>) {
        let mut public: Vec<&MethodRecord> = Vec::new();
        for class in self.store.file_classes(source.file_path) {
            if class.language != source.language {
                continue;
            }
            public.extend(class.methods.values().filter(|m| {
                !is_private_name(&m.name)
                    && !has_parent_member(self.store, &class.name, &m.name, class.language)
            }));
        }
        public.extend(
            self.store
                .file_functions(source.file_path)
                .filter(|f| f.exported && !is_private_name(&f.name)),
        );

        for record in public {
            if has_doc_comment(source.lines, record.line) {
                continue;
            }
            out.push(Diagnostic::at_name(
                source.lines,
                record.line,
                record.bare_name(),
                format!("Public method '{}' does not have API documentation.", record.name),
                self.config.api_severity,
                LintRule::MethodDocs,
            ));
        }
    }

    fn check_protected_super_calls(&self, source: &SourceView<'_>, out: &mut Vec<Diagnostic>) {
        let mut overrides: Vec<&MethodRecord> = self
            .store
            .file_classes(source.file_path)
            .filter(|c| c.language == source.language)
            .flat_map(|class| {
                class.methods.values().filter(move |m| {
                    m.name.starts_with('_')
                        && has_parent_member(self.store, &class.name, &m.name, class.language)
                })
            })
            .collect();
        overrides.sort_by_key(|m| m.line);

        for (index, record) in overrides.iter().enumerate() {
            let end = overrides
                .get(index + 1)
                .map_or(source.lines.len(), |next| next.line);
            let name = record.bare_name();
            let Ok(super_call) = Regex::new(&format!(r"\bsuper\.{}", regex::escape(name))) else {
                continue;
            };
            let start = record.line.min(source.lines.len());
            let end = end.min(source.lines.len()).max(start);
            let found = source.lines[start..end]
                .iter()
                .any(|line| super_call.is_match(line));
            if !found {
                out.push(Diagnostic::at_name(
                    source.lines,
                    record.line,
                    name,
                    format!(
                        "Subclassed protected method '{}' does not have a super call.",
                        record.name
                    ),
                    Severity::Warning,
                    LintRule::ProtectedSuperCall,
                ));
            }
        }
    }

    fn check_method_calls(&self, source: &SourceView<'_>, out: &mut Vec<Diagnostic>) {
        let resolver = DefinitionResolver::new(self.store);
        let mut known: HashSet<String> = HashSet::new();

        for (row, line) in source.lines.iter().enumerate() {
            if COMMENT_START_RE.is_match(line) {
                continue;
            }
            let mut from = 0;
            while let Some(caps) = METHOD_CALL_RE.captures(&line[from..]) {
                let receiver = caps.get(1).map_or("", |m| m.as_str());
                let name = caps.get(2).map_or("", |m| m.as_str());
                let Some(dot) = line[from..].find(&format!(".{name}")) else {
                    break;
                };
                let index = from + dot + 1;

                let skip = matches!(receiver, "this" | "super" | "document")
                    || known.contains(name)
                    || BUILTIN_METHODS.contains(&name)
                    || IGNORED_METHODS.contains(&name);
                if !skip {
                    let key = format!("{name}()");
                    let defined = self.store.classes().any(|c| c.methods.contains_key(&key));
                    if defined {
                        known.insert(name.to_string());
                    } else if resolver.resolve(source, row, index).is_empty() {
                        out.push(Diagnostic {
                            line: row,
                            start: index,
                            end: index + name.len(),
                            message: format!("Method '{name}()' not found."),
                            severity: Severity::Error,
                            rule: LintRule::UnresolvedMethod,
                        });
                    }
                }
                from = index;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
