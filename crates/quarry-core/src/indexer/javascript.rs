//! JavaScript and TypeScript declaration scanner.
//!
//! Declarations are recognized with ordered regex tables and a brace-depth
//! counter over normalized lines:
//!
//! - depth 0: free functions, then class-like declarations (ES classes,
//!   prototype `.extend(...)` calls, namespaced class expressions, rename
//!   exports and object-literal mixins);
//! - depth 1 inside a class: methods, arrow fields and properties;
//! - deeper inside a class: `this.include(Mixin)` calls.
//!
//! TypeScript is the JavaScript table with a handful of rules replaced.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::indexer::normalize::{
    match_multi_line, match_single, normalize_line, LineMatch, NormalizerState,
};
use crate::indexer::symbols::{Extractor, FileSymbols};
use crate::models::{ClassRecord, LanguageId, MethodRecord, SymbolKind};

static CLASS_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s+)Object\.assign\(.*?(\w+)\.prototype,\s*(\w+)\)").unwrap()
});
static INCLUDE_MIXIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*this\.include\(\s*(\w+)\s*\)").unwrap());
static REGEX_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[=(,:]\s*/(?:\\.|[^/\\])+/[dgimsuy]*").unwrap());
static EXPORT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s+(?:default\s+)?(\w+)\s*;").unwrap());
static EXPORT_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export\s*(?:default\s*)?\{").unwrap());
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(\w*)\s*,?\s*\{?([\w\s,]*)\}?\s*from\s+['"](.*?)['"]"#).unwrap()
});
static IMPORT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?:\w+\s*,\s*)?\{[^}]*$").unwrap());

/// Names that look like a method head but start a statement.
const STATEMENT_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with",
];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// One recognizer: a full pattern, optionally entered through a start
/// pattern that lets the declaration continue on following lines.
#[derive(Clone, Debug)]
struct Rule {
    id: &'static str,
    full: Regex,
    start: Option<Regex>,
}

impl Rule {
    fn single(id: &'static str, full: &str) -> Self {
        Self {
            id,
            full: re(full),
            start: None,
        }
    }

    fn multi(id: &'static str, start: &str, full: &str) -> Self {
        Self {
            id,
            full: re(full),
            start: Some(re(start)),
        }
    }

    fn apply(&self, text: &str, line_no: usize, lines: &[&str]) -> Option<LineMatch> {
        match &self.start {
            None => match_single(&self.full, text),
            Some(start) => match_multi_line(text, line_no, lines, start, &self.full),
        }
    }
}

#[derive(Clone, Debug)]
struct ClassRule {
    rule: Rule,
    name: usize,
    parent: Option<usize>,
    es: bool,
    export_gated: bool,
}

#[derive(Clone, Debug)]
struct FunctionRule {
    rule: Rule,
    name: usize,
    /// Without a matching export the function is recorded as module-private.
    export_gated: bool,
    /// Skipped when the same line also declares a class.
    yields_to_class: bool,
}

#[derive(Clone, Debug)]
struct MemberRule {
    rule: Rule,
    name: usize,
    params: &'static [usize],
    kind: SymbolKind,
}

fn class_rule(rule: Rule, name: usize, parent: Option<usize>, es: bool) -> ClassRule {
    ClassRule {
        rule,
        name,
        parent,
        es,
        export_gated: false,
    }
}

fn function_rule(rule: Rule, export_gated: bool, yields_to_class: bool) -> FunctionRule {
    FunctionRule {
        rule,
        name: 1,
        export_gated,
        yields_to_class,
    }
}

fn member_rule(rule: Rule, params: &'static [usize], kind: SymbolKind) -> MemberRule {
    MemberRule {
        rule,
        name: 1,
        params,
        kind,
    }
}

const JS_CLASS: &str = r"^\s*(?:export\s+)?(?:default\s+)?class\s+(\w+)(?:\s+extends\s+\(?\s*(?:\w+\.)*(\w+)[^{]*?)?\s*\{";
const JS_NAMESPACE_CLASS: &str =
    r"\w+\s*=\s*class\s+(\w+)(?:\s+extends\s+\(?\s*(?:\w+\.)*(\w+)[^{]*?)?\s*\{";
const TS_CLASS: &str = r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)(?:<[^{]*?>)?(?:\s+(?:extends|implements)\s+\(?\s*(?:\w+\.)*(\w+)[^{]*?)?\s*\{";
const TS_NAMESPACE_CLASS: &str = r"\w+\s*=\s*class\s+(\w+)(?:<[^{]*?>)?(?:\s+(?:extends|implements)\s+\(?\s*(?:\w+\.)*(\w+)[^{]*?)?\s*\{";
const EXTEND: &str = r#"(\w+)\.extend\s*\(\s*['"](\w+)['"]"#;
const EXTEND_NO_STRING: &str =
    r#"(\w+)\s*=.*?(\w+)\.extend\s*\((\s*['"]([\w\s]+)['"]\s*,)?\s*\{"#;

const JS_METHOD: &str = r"^\s*(?:(?:async|static)\s+)*#?\*?\s*(\w+)\s*\(([^()]*?)\)\s*\{";
const TS_METHOD: &str = r"^\s*(?:(?:async|static|public|private|protected|readonly|override|abstract)\s+|#)*\*?(\w+)(?:<.*?>)?\s*\((.*?)\)(?:\s*:\s*.+?)?\s*\{";
const FIELD_ARROW: &str =
    r"^\s*(?:static\s+)?#?(\w+)\s*[=:]\s*(?:async\s+)?(?:\(([^)]*)\)|(\w+))\s*=>";
const FUNCTION_PROPERTY: &str =
    r"^\s*#?(\w+)\s*:\s*(?:async\s+)?function\*?\s*\w*\s*\(([^)]*)\)";
const EXPORT_ARROW: &str = r"^export\s+(?:(?:default|const)\s+)*(\w+)\s*=\s*[^;]*?\s+=>\s+\{";
const CONST_ARROW: &str = r"^const\s+(\w+)\s*=[^;]*?\s+=>\s+";

fn javascript_class_rules() -> Vec<ClassRule> {
    vec![
        class_rule(Rule::single("extend", EXTEND), 2, Some(1), false),
        class_rule(
            Rule::single("extend_no_string", EXTEND_NO_STRING),
            1,
            Some(2),
            false,
        ),
        class_rule(Rule::single("class", JS_CLASS), 1, Some(2), true),
        class_rule(
            Rule::single("namespace_class", JS_NAMESPACE_CLASS),
            1,
            Some(2),
            true,
        ),
        class_rule(
            Rule::single(
                "rename",
                r"^\s*export\s+const\s+([A-Z]\w*)\s*=\s*([A-Z]\w*)\s*;",
            ),
            1,
            Some(2),
            true,
        ),
        class_rule(
            Rule::single(
                "export_mixin",
                r"^export\s+(?:(?:default|const)\s+)*([A-Z]\w*|\w+Mixin)\s*=\s*\{",
            ),
            1,
            None,
            false,
        ),
        ClassRule {
            export_gated: true,
            ..class_rule(
                Rule::single("mixin", r"\b([A-Z]\w*|\w+Mixin)\s*=\s*\{"),
                1,
                None,
                false,
            )
        },
        class_rule(
            Rule::multi("extend_multi", r"(\w+)\.extend\s*\(\s*$", EXTEND),
            2,
            Some(1),
            false,
        ),
        class_rule(
            Rule::multi(
                "extend_no_string_multi",
                r"(\w+)\s*=.*?(\w+)\.extend\s*\(\s*$",
                EXTEND_NO_STRING,
            ),
            1,
            Some(2),
            false,
        ),
        class_rule(
            Rule::multi(
                "class_multi",
                r"^\s*(?:export\s+)?(?:default\s+)?class\s+\w+\b[^{]*$",
                JS_CLASS,
            ),
            1,
            Some(2),
            true,
        ),
        class_rule(
            Rule::multi(
                "namespace_class_multi",
                r"\w+\s*=\s*class\s+\w+\b[^{]*$",
                JS_NAMESPACE_CLASS,
            ),
            1,
            Some(2),
            true,
        ),
    ]
}

fn javascript_function_rules() -> Vec<FunctionRule> {
    vec![
        function_rule(
            Rule::single(
                "export_function",
                r"^export\s+(?:(?:default|async)\s+)*function\*?\s+(\w+)\s*(?:<.*?>)?\s*\(",
            ),
            false,
            false,
        ),
        function_rule(Rule::single("export_arrow", EXPORT_ARROW), false, true),
        function_rule(
            Rule::single(
                "const_function",
                r"^const\s+(\w+)\s*=\s*(?:async\s+)?function\*?\s*\(",
            ),
            true,
            false,
        ),
        function_rule(Rule::single("const_arrow", CONST_ARROW), true, true),
        function_rule(
            Rule::single(
                "function",
                r"^(?:async\s+)?function\*?\s+(\w+)\s*(?:<.*?>)?\s*\(",
            ),
            true,
            false,
        ),
        function_rule(
            Rule::single(
                "export_function_result",
                r"^export\s+(?:(?:default|const)\s+)*(\w+)\s*=\s*.*?(\w+)\s*\(",
            ),
            false,
            true,
        ),
        function_rule(
            Rule::multi(
                "export_arrow_multi",
                r"^export\s+(?:(?:default|const)\s+)*\w+\s*=",
                EXPORT_ARROW,
            ),
            false,
            true,
        ),
        function_rule(
            Rule::multi("const_arrow_multi", r"^const\s+\w+\s*=\s*\(", CONST_ARROW),
            true,
            true,
        ),
    ]
}

fn javascript_member_rules() -> Vec<MemberRule> {
    vec![
        member_rule(Rule::single("method", JS_METHOD), &[2], SymbolKind::Method),
        member_rule(
            Rule::single("field_arrow", FIELD_ARROW),
            &[2, 3],
            SymbolKind::Method,
        ),
        member_rule(
            Rule::single("function_property", FUNCTION_PROPERTY),
            &[2],
            SymbolKind::Method,
        ),
        member_rule(
            Rule::multi(
                "method_multi",
                r"^\s*(?:(?:async|static)\s+)*#?\*?\s*\w+\s*\([^()]*$",
                JS_METHOD,
            ),
            &[2],
            SymbolKind::Method,
        ),
        member_rule(
            Rule::multi(
                "field_arrow_multi",
                r"^\s*(?:static\s+)?#?\w+\s*[=:]\s*(?:async\s+)?\(\s*$",
                FIELD_ARROW,
            ),
            &[2, 3],
            SymbolKind::Method,
        ),
        member_rule(
            Rule::multi(
                "function_property_multi",
                r"^\s*#?\w+\s*:\s*(?:async\s+)?function\*?\s*\w*\s*\(\s*$",
                FUNCTION_PROPERTY,
            ),
            &[2],
            SymbolKind::Method,
        ),
        member_rule(
            Rule::single(
                "property",
                r"^\s*(?:static\s+)?#?(\w+)\s*(?::|=(?:[^=>]|$))",
            ),
            &[],
            SymbolKind::Property,
        ),
        member_rule(
            Rule::single(
                "accessor",
                r"^\s*(?:static\s+)?(?:get|set)\s+(\w+)\s*\(",
            ),
            &[],
            SymbolKind::Property,
        ),
    ]
}

fn replace_rule<T>(rules: &mut Vec<T>, rule: T, id: impl Fn(&T) -> &'static str) {
    let key = id(&rule);
    match rules.iter().position(|r| id(r) == key) {
        Some(index) => rules[index] = rule,
        None => rules.push(rule),
    }
}

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

/// A JavaScript-family syntax: its language id and pattern tables.
#[derive(Clone, Debug)]
pub struct Dialect {
    language: LanguageId,
    classes: Vec<ClassRule>,
    functions: Vec<FunctionRule>,
    members: Vec<MemberRule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ClassHit {
    name: String,
    parent: Option<String>,
    es: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FunctionHit {
    name: String,
    exported: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct MemberHit {
    name: String,
    params: Option<String>,
    kind: SymbolKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AssignHit {
    class: String,
    parent: String,
    line: usize,
    column: usize,
}

impl Dialect {
    pub fn javascript() -> Self {
        Self {
            language: LanguageId::JavaScript,
            classes: javascript_class_rules(),
            functions: javascript_function_rules(),
            members: javascript_member_rules(),
        }
    }

    pub fn typescript() -> Self {
        let mut dialect = Self::javascript();
        dialect.language = LanguageId::TypeScript;

        let class_id = |r: &ClassRule| r.rule.id;
        replace_rule(
            &mut dialect.classes,
            class_rule(Rule::single("class", TS_CLASS), 1, Some(2), true),
            class_id,
        );
        replace_rule(
            &mut dialect.classes,
            class_rule(
                Rule::single("namespace_class", TS_NAMESPACE_CLASS),
                1,
                Some(2),
                true,
            ),
            class_id,
        );
        replace_rule(
            &mut dialect.classes,
            class_rule(
                Rule::multi(
                    "class_multi",
                    r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+\w+\b[^{]*$",
                    TS_CLASS,
                ),
                1,
                Some(2),
                true,
            ),
            class_id,
        );
        replace_rule(
            &mut dialect.classes,
            class_rule(
                Rule::multi(
                    "namespace_class_multi",
                    r"\w+\s*=\s*class\s+\w+\b[^{]*$",
                    TS_NAMESPACE_CLASS,
                ),
                1,
                Some(2),
                true,
            ),
            class_id,
        );

        let member_id = |r: &MemberRule| r.rule.id;
        replace_rule(
            &mut dialect.members,
            member_rule(Rule::single("method", TS_METHOD), &[2], SymbolKind::Method),
            member_id,
        );
        replace_rule(
            &mut dialect.members,
            member_rule(
                Rule::multi(
                    "method_multi",
                    r"^\s*(?:(?:async|static|public|private|protected|override)\s+|#)*\*?\w+\s*(?:<[^()]*>)?\s*\([^()]*$",
                    TS_METHOD,
                ),
                &[2],
                SymbolKind::Method,
            ),
            member_id,
        );
        replace_rule(
            &mut dialect.members,
            member_rule(
                Rule::single(
                    "property",
                    r"^\s*(?:(?:static|public|private|protected|readonly|declare|override)\s+|#)*(\w+)[?!]?\s*(?::|=(?:[^=>]|$))",
                ),
                &[],
                SymbolKind::Property,
            ),
            member_id,
        );
        replace_rule(
            &mut dialect.members,
            member_rule(
                Rule::single(
                    "accessor",
                    r"^\s*(?:(?:static|public|private|protected|override)\s+)*(?:get|set)\s+(\w+)\s*\(",
                ),
                &[],
                SymbolKind::Property,
            ),
            member_id,
        );
        dialect
    }

    fn match_class(&self, text: &str, line_no: usize, lines: &[&str]) -> Option<ClassHit> {
        self.classes.iter().find_map(|rule| {
            let m = rule.rule.apply(text, line_no, lines)?;
            let name = m.get(rule.name)?;
            if rule.export_gated && !export_exists(name, line_no, lines) {
                return None;
            }
            Some(ClassHit {
                name: name.to_string(),
                parent: rule.parent.and_then(|g| m.get(g)).map(str::to_string),
                es: rule.es,
            })
        })
    }

    fn match_function(
        &self,
        text: &str,
        line_no: usize,
        lines: &[&str],
        declares_class: bool,
    ) -> Option<FunctionHit> {
        self.functions.iter().find_map(|rule| {
            if rule.yields_to_class && declares_class {
                return None;
            }
            let m = rule.rule.apply(text, line_no, lines)?;
            let name = m.get(rule.name)?;
            Some(FunctionHit {
                name: name.to_string(),
                exported: !rule.export_gated || export_exists(name, line_no, lines),
            })
        })
    }

    fn match_member(&self, text: &str, line_no: usize, lines: &[&str]) -> Option<MemberHit> {
        self.members.iter().find_map(|rule| {
            let m = rule.rule.apply(text, line_no, lines)?;
            let name = m.get(rule.name)?;
            if rule.kind == SymbolKind::Method && STATEMENT_KEYWORDS.contains(&name) {
                return None;
            }
            Some(MemberHit {
                name: name.to_string(),
                params: rule.params.iter().find_map(|g| m.get(*g)).map(str::to_string),
                kind: rule.kind,
            })
        })
    }
}

impl Extractor for Dialect {
    fn language(&self) -> LanguageId {
        self.language
    }

    fn scan(&self, file_path: &str, lines: &[&str], in_workspace: bool) -> FileSymbols {
        FileScan::new(self, file_path, lines, in_workspace).run()
    }

    fn current_class(&self, lines: &[&str], line: usize) -> Option<String> {
        if let Some(assign) = find_class_def_assign(lines) {
            return Some(assign.class);
        }
        if lines.is_empty() {
            return None;
        }
        let upto = &lines[..=line.min(lines.len() - 1)];
        (0..upto.len())
            .rev()
            .find_map(|l| self.match_class(upto[l], l, upto))
            .map(|hit| hit.name)
    }

    fn named_imports(&self, lines: &[&str]) -> HashSet<String> {
        let mut names = HashSet::new();
        for (line_no, line) in lines.iter().enumerate() {
            let found = match_single(&IMPORT_RE, line)
                .or_else(|| match_multi_line(line, line_no, lines, &IMPORT_START_RE, &IMPORT_RE));
            let Some(m) = found else {
                continue;
            };
            if let Some(default_name) = m.get(1).filter(|n| !n.is_empty()) {
                names.insert(default_name.to_string());
            }
            for item in m.get(2).unwrap_or_default().split(',') {
                let bound = item.split_whitespace().last().unwrap_or_default();
                if !bound.is_empty() {
                    names.insert(bound.to_string());
                }
            }
        }
        names
    }
}

// ---------------------------------------------------------------------------
// Per-file scan state machine
// ---------------------------------------------------------------------------

struct FileScan<'a> {
    dialect: &'a Dialect,
    file_path: &'a str,
    lines: &'a [&'a str],
    in_workspace: bool,
    out: FileSymbols,
    current: Option<usize>,
    depth: i32,
    state: NormalizerState,
}

impl<'a> FileScan<'a> {
    fn new(
        dialect: &'a Dialect,
        file_path: &'a str,
        lines: &'a [&'a str],
        in_workspace: bool,
    ) -> Self {
        Self {
            dialect,
            file_path,
            lines,
            in_workspace,
            out: FileSymbols::default(),
            current: None,
            depth: 0,
            state: NormalizerState::default(),
        }
    }

    fn run(mut self) -> FileSymbols {
        let assign = find_class_def_assign(self.lines);
        if let Some(hit) = &assign {
            let record = self.class_record(&hit.class, hit.line, hit.column, false);
            self.current = Some(self.out.declare_class(record, Some(&hit.parent)));
        }

        let lines = self.lines;
        for (line_no, raw) in lines.iter().enumerate() {
            let code = normalize_line(raw, &mut self.state);
            let mut closed_inline = false;
            if !code.trim().is_empty() {
                if self.depth == 0 {
                    closed_inline = self.scan_top_level(raw, &code, line_no);
                } else if let Some(index) = self.current {
                    if self.depth == 1 && !self.state.in_block_comment {
                        self.scan_member(raw, line_no, index);
                    } else if let Some(m) = INCLUDE_MIXIN_RE.captures(&code) {
                        self.out.add_parent(index, &m[1]);
                    }
                }
            }

            let previous = self.depth;
            self.depth = (self.depth + brace_delta(&code)).max(0);
            if self.depth == 0 && (previous != 0 || closed_inline) {
                self.current = None;
            }
        }

        // A trailing Object.assign adds its mixin even when the class body
        // was declared again above it.
        if let Some(hit) = assign {
            if let Some(index) = self.out.classes.iter().position(|c| c.record.name == hit.class) {
                self.out.add_parent(index, &hit.parent);
            }
        }
        self.out
    }

    /// Returns `true` when a class header also closed its body on this line.
    fn scan_top_level(&mut self, raw: &str, code: &str, line_no: usize) -> bool {
        let class_hit = self.dialect.match_class(raw, line_no, self.lines);
        if let Some(func) =
            self.dialect
                .match_function(raw, line_no, self.lines, class_hit.is_some())
        {
            let mut record = MethodRecord::callable(
                &func.name,
                SymbolKind::Function,
                self.file_path,
                line_no,
                column_after(raw, &func.name, 0),
                self.dialect.language,
            );
            record.exported = func.exported;
            record.in_workspace = self.in_workspace;
            self.out.functions.push(record);
            self.current = None;
            return false;
        }

        let Some(hit) = class_hit else {
            return false;
        };
        let column = column_after(raw, &hit.name, 0);
        let record = self.class_record(&hit.name, line_no, column, hit.es);
        let index = self.out.declare_class(record, hit.parent.as_deref());
        self.current = Some(index);
        self.scan_inline_members(raw, code, line_no, index, column)
    }

    fn scan_member(&mut self, raw: &str, line_no: usize, index: usize) {
        if let Some(hit) = self.dialect.match_member(raw, line_no, self.lines) {
            let column = column_after(raw, &hit.name, 0);
            self.insert_member(index, hit, line_no, column);
        }
    }

    /// Members declared on the class header line itself, e.g.
    /// `class Dog extends Animal { speak() {} }`.
    fn scan_inline_members(
        &mut self,
        raw: &str,
        code: &str,
        line_no: usize,
        index: usize,
        header_end: usize,
    ) -> bool {
        let (segments, closed) = inline_segments(code);
        let mut search_from = header_end.min(raw.len());
        for segment in segments {
            if let Some(hit) = self.dialect.match_member(&segment, 0, &[]) {
                let column = column_after(raw, &hit.name, search_from);
                search_from = column.min(raw.len());
                self.insert_member(index, hit, line_no, column);
            }
        }
        closed
    }

    fn insert_member(&mut self, index: usize, hit: MemberHit, line_no: usize, column: usize) {
        let language = self.dialect.language;
        let record = match hit.kind {
            SymbolKind::Method => MethodRecord::callable(
                &hit.name,
                SymbolKind::Method,
                self.file_path,
                line_no,
                column,
                language,
            )
            .with_params(hit.params),
            kind => MethodRecord::new(hit.name, kind, self.file_path, line_no, column, language),
        };
        self.out.insert_member(index, record);
    }

    fn class_record(&self, name: &str, line: usize, column: usize, es: bool) -> ClassRecord {
        let mut record =
            ClassRecord::new(name, self.file_path, line, column, self.dialect.language);
        record.es = es;
        record.in_workspace = self.in_workspace;
        record
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Byte column just past the first occurrence of `name` at or after `from`.
fn column_after(raw: &str, name: &str, from: usize) -> usize {
    raw.get(from..)
        .and_then(|rest| rest.find(name))
        .map(|offset| from + offset + name.len())
        .unwrap_or(from + name.len())
}

/// Net brace change on a normalized line. Braces escaped with `\` or `%`,
/// and braces inside regex literals, do not count.
fn brace_delta(code: &str) -> i32 {
    let literals: Vec<(usize, usize)> = REGEX_LITERAL_RE
        .find_iter(code)
        .map(|m| (m.start(), m.end()))
        .collect();
    let mut delta = 0;
    let mut previous: Option<char> = None;
    for (offset, c) in code.char_indices() {
        let in_literal = literals.iter().any(|&(s, e)| offset >= s && offset < e);
        let escaped = matches!(previous, Some('%') | Some('\\'));
        if !in_literal && !escaped {
            match c {
                '{' => delta += 1,
                '}' => delta -= 1,
                _ => {}
            }
        }
        previous = Some(c);
    }
    delta
}

/// Split the text after a class header's first `{` into member segments.
/// Returns the segments and whether the body closed on the same line.
fn inline_segments(code: &str) -> (Vec<String>, bool) {
    let Some(open) = code.find('{') else {
        return (Vec::new(), false);
    };
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut braces = 0usize;
    let mut parens = 0usize;

    fn flush(current: &mut String, segments: &mut Vec<String>) {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            segments.push(trimmed.to_string());
        }
        current.clear();
    }

    for c in code[open + 1..].chars() {
        match c {
            '{' => {
                braces += 1;
                current.push(c);
            }
            '}' if braces == 0 => {
                flush(&mut current, &mut segments);
                return (segments, true);
            }
            '}' => {
                braces -= 1;
                current.push(c);
                if braces == 0 && parens == 0 {
                    flush(&mut current, &mut segments);
                }
            }
            '(' => {
                parens += 1;
                current.push(c);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                current.push(c);
            }
            ',' | ';' if braces == 0 && parens == 0 => flush(&mut current, &mut segments),
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut segments);
    (segments, false)
}

/// Trailing `Object.assign(Class.prototype, Mixin)` statement: only blank
/// lines may follow it.
fn find_class_def_assign(lines: &[&str]) -> Option<AssignHit> {
    for (line, text) in lines.iter().enumerate().rev() {
        if let Some(m) = CLASS_ASSIGN_RE.captures(text) {
            let class = m[2].to_string();
            return Some(AssignHit {
                column: column_after(text, &class, 0),
                parent: m[1].to_string(),
                class,
                line,
            });
        }
        if !text.trim().is_empty() {
            return None;
        }
    }
    None
}

/// Whether `name` is exported by a later statement: `export name;`,
/// `export default name;` or an `export { ... }` list.
fn export_exists(name: &str, current: usize, lines: &[&str]) -> bool {
    let mut line = current + 1;
    while line < lines.len() {
        let text = lines[line].trim_start();
        if let Some(m) = EXPORT_NAME_RE.captures(text) {
            if &m[1] == name {
                return true;
            }
        }
        if let Some(start) = EXPORT_LIST_RE.find(text) {
            let mut body = text[start.end()..].to_string();
            let mut end = line;
            while !body.contains('}') && end + 1 < lines.len() {
                end += 1;
                body.push(' ');
                body.push_str(lines[end]);
            }
            let list = body.split('}').next().unwrap_or_default();
            if list
                .split(',')
                .any(|item| item.split_whitespace().next() == Some(name))
            {
                return true;
            }
            line = end;
        }
        line += 1;
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
