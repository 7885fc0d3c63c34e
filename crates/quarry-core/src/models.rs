//! Shared typed models used across indexing, storage, and query layers.

use std::fmt;
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Suffix appended to callable member names so methods and plain properties
/// can share one namespace per class.
pub const CALLABLE_MARKER: &str = "()";

// ---------------------------------------------------------------------------
// Languages and symbol kinds
// ---------------------------------------------------------------------------

/// Source dialects understood by the extractors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    JavaScript,
    TypeScript,
    Python,
}

const LANGUAGE_BY_EXTENSION: &[(&str, LanguageId)] = &[
    ("js", LanguageId::JavaScript),
    ("mjs", LanguageId::JavaScript),
    ("cjs", LanguageId::JavaScript),
    ("jsx", LanguageId::JavaScript),
    ("ts", LanguageId::TypeScript),
    ("mts", LanguageId::TypeScript),
    ("cts", LanguageId::TypeScript),
    ("tsx", LanguageId::TypeScript),
    ("py", LanguageId::Python),
];

impl LanguageId {
    pub const ALL: [LanguageId; 3] = [
        LanguageId::JavaScript,
        LanguageId::TypeScript,
        LanguageId::Python,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageId::JavaScript => "javascript",
            LanguageId::TypeScript => "typescript",
            LanguageId::Python => "python",
        }
    }

    /// Map a file extension (without the dot, any case) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        LANGUAGE_BY_EXTENSION
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, lang)| *lang)
    }

    pub fn parse(value: &str) -> Option<Self> {
        LanguageId::ALL
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Names of constructors, which are exempt from override checks.
    pub fn constructor_name(&self) -> &'static str {
        match self {
            LanguageId::Python => "__init__()",
            _ => "constructor()",
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbol kinds, declared in search ranking order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Constant,
    Property,
    Variable,
    Method,
    Function,
    File,
}

impl SymbolKind {
    /// Primary ranking key: classes first, files last.
    pub fn order(&self) -> u8 {
        match self {
            SymbolKind::Class => 0,
            SymbolKind::Constant => 1,
            SymbolKind::Property => 2,
            SymbolKind::Variable => 3,
            SymbolKind::Method => 4,
            SymbolKind::Function => 5,
            SymbolKind::File => 6,
        }
    }
}

// ---------------------------------------------------------------------------
// Locations and display symbols
// ---------------------------------------------------------------------------

/// A position in a source file. `line` is 0-based; `column` is the byte
/// offset just past the declared name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_path: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file_path: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            column,
        }
    }
}

/// A search or outline result as presented to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SymbolInfo {
    /// Display name: `Class`, `Class.method()`, `function()` or a file base name.
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Member name including the callable marker, for methods and functions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageId>,
}

impl SymbolInfo {
    pub fn file_path(&self) -> &str {
        &self.location.file_path
    }

    /// Build the symbol for a file-name match.
    pub fn for_file(file_path: &str) -> Self {
        let name = std::path::Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string());
        Self {
            name,
            kind: SymbolKind::File,
            location: Location::new(file_path, 0, 0),
            class_name: None,
            method_name: None,
            language: None,
        }
    }
}

// ---------------------------------------------------------------------------
// MethodRecord
// ---------------------------------------------------------------------------

/// A class member (method or property) or a free function.
#[derive(Clone, Debug, Serialize)]
pub struct MethodRecord {
    /// Member name; callables carry the [`CALLABLE_MARKER`] suffix.
    pub name: String,
    pub class_name: Option<String>,
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub kind: SymbolKind,
    /// Raw parameter-list text, when the declaration exposed one.
    pub params: Option<String>,
    pub language: LanguageId,
    /// Free functions only: public (exported) versus module-private.
    pub exported: bool,
    pub in_workspace: bool,
    #[serde(skip)]
    symbol: OnceLock<SymbolInfo>,
}

impl MethodRecord {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<String>,
        line: usize,
        column: usize,
        language: LanguageId,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: None,
            file_path: file_path.into(),
            line,
            column,
            kind,
            params: None,
            language,
            exported: false,
            in_workspace: false,
            symbol: OnceLock::new(),
        }
    }

    /// A callable member or function: the name gets the callable marker.
    pub fn callable(
        bare_name: &str,
        kind: SymbolKind,
        file_path: impl Into<String>,
        line: usize,
        column: usize,
        language: LanguageId,
    ) -> Self {
        Self::new(
            format!("{bare_name}{CALLABLE_MARKER}"),
            kind,
            file_path,
            line,
            column,
            language,
        )
    }

    pub fn with_params(mut self, params: Option<String>) -> Self {
        self.params = params.map(|p| p.trim().to_string());
        self
    }

    pub fn is_callable(&self) -> bool {
        self.name.ends_with(CALLABLE_MARKER)
    }

    /// Name without the callable marker.
    pub fn bare_name(&self) -> &str {
        self.name.strip_suffix(CALLABLE_MARKER).unwrap_or(&self.name)
    }

    pub fn qualified_name(&self) -> String {
        match &self.class_name {
            Some(class_name) => format!("{class_name}.{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn location(&self) -> Location {
        Location::new(&self.file_path, self.line, self.column)
    }

    /// Display symbol, built on first use.
    pub fn symbol(&self) -> &SymbolInfo {
        self.symbol.get_or_init(|| SymbolInfo {
            name: self.qualified_name(),
            kind: self.kind,
            location: self.location(),
            class_name: self.class_name.clone(),
            method_name: Some(self.name.clone()),
            language: Some(self.language),
        })
    }
}

// ---------------------------------------------------------------------------
// ClassRecord
// ---------------------------------------------------------------------------

/// A class, prototype-extend declaration, or object-literal mixin.
#[derive(Clone, Debug, Serialize)]
pub struct ClassRecord {
    pub name: String,
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    /// `true` for native `class` syntax, `false` for extend-style and mixins.
    pub es: bool,
    pub in_workspace: bool,
    pub language: LanguageId,
    pub methods: IndexMap<String, MethodRecord>,
    #[serde(skip)]
    symbol: OnceLock<SymbolInfo>,
}

impl ClassRecord {
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<String>,
        line: usize,
        column: usize,
        language: LanguageId,
    ) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            line,
            column,
            es: false,
            in_workspace: false,
            language,
            methods: IndexMap::new(),
            symbol: OnceLock::new(),
        }
    }

    /// Insert a member; a later member with the same name replaces the earlier one.
    pub fn insert_member(&mut self, mut record: MethodRecord) {
        record.class_name = Some(self.name.clone());
        record.in_workspace = self.in_workspace;
        self.methods.insert(record.name.clone(), record);
    }

    /// Look a member up by bare name, preferring the callable entry.
    pub fn member(&self, bare_name: &str) -> Option<&MethodRecord> {
        self.methods
            .get(&format!("{bare_name}{CALLABLE_MARKER}"))
            .or_else(|| self.methods.get(bare_name))
    }

    pub fn location(&self) -> Location {
        Location::new(&self.file_path, self.line, self.column)
    }

    /// Whether the class shows up in searches that did not ask for everything.
    pub fn is_default_visible(&self, include_es_outside_workspace: bool) -> bool {
        !self.es || (include_es_outside_workspace && !self.in_workspace)
    }

    pub fn symbol(&self) -> &SymbolInfo {
        self.symbol.get_or_init(|| SymbolInfo {
            name: self.name.clone(),
            kind: SymbolKind::Class,
            location: self.location(),
            class_name: Some(self.name.clone()),
            method_name: None,
            language: Some(self.language),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(LanguageId::from_extension("JS"), Some(LanguageId::JavaScript));
        assert_eq!(LanguageId::from_extension("tsx"), Some(LanguageId::TypeScript));
        assert_eq!(LanguageId::from_extension("py"), Some(LanguageId::Python));
        assert_eq!(LanguageId::from_extension("rs"), None);
    }

    #[test]
    fn test_language_parse() {
        assert_eq!(LanguageId::parse(" Python "), Some(LanguageId::Python));
        assert_eq!(LanguageId::parse("go"), None);
    }

    #[test]
    fn test_kind_order() {
        assert!(SymbolKind::Class.order() < SymbolKind::Property.order());
        assert!(SymbolKind::Method.order() < SymbolKind::Function.order());
        assert!(SymbolKind::Function.order() < SymbolKind::File.order());
    }

    #[test]
    fn test_member_prefers_callable() {
        let mut class = ClassRecord::new("Dog", "/ws/dog.js", 0, 9, LanguageId::JavaScript);
        class.insert_member(MethodRecord::new(
            "speak",
            SymbolKind::Property,
            "/ws/dog.js",
            1,
            9,
            LanguageId::JavaScript,
        ));
        class.insert_member(MethodRecord::callable(
            "speak",
            SymbolKind::Method,
            "/ws/dog.js",
            2,
            9,
            LanguageId::JavaScript,
        ));
        let member = class.member("speak").unwrap();
        assert_eq!(member.name, "speak()");
        assert_eq!(member.class_name.as_deref(), Some("Dog"));
        assert_eq!(member.bare_name(), "speak");
    }

    #[test]
    fn test_symbol_is_memoized() {
        let record = MethodRecord::callable(
            "bark",
            SymbolKind::Function,
            "/ws/util.js",
            4,
            13,
            LanguageId::JavaScript,
        );
        let first = record.symbol() as *const SymbolInfo;
        let second = record.symbol() as *const SymbolInfo;
        assert_eq!(first, second);
        assert_eq!(record.symbol().name, "bark()");
        assert_eq!(record.symbol().location, Location::new("/ws/util.js", 4, 13));
    }

    #[test]
    fn test_default_visibility() {
        let mut class = ClassRecord::new("Foo", "/ws/foo.js", 0, 9, LanguageId::JavaScript);
        assert!(class.is_default_visible(false));
        class.es = true;
        class.in_workspace = true;
        assert!(!class.is_default_visible(true));
        class.in_workspace = false;
        assert!(!class.is_default_visible(false));
        assert!(class.is_default_visible(true));
    }

    #[test]
    fn test_file_symbol_name() {
        let sym = SymbolInfo::for_file("/ws/src/app.js");
        assert_eq!(sym.name, "app.js");
        assert_eq!(sym.kind, SymbolKind::File);
    }
}
