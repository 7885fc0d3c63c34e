//! Advisory override-signature checks.
//!
//! Parameter lists are classified from their raw text only. A subclass
//! method is compared with the nearest same-named member along each parent
//! branch; classes without a record are walked through.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{ClassRecord, LanguageId, Location, MethodRecord};
use crate::query::guards::MAX_INHERITANCE_DEPTH;
use crate::store::SymbolStore;

/// Coarse classification of one declared parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamShape {
    Plain,
    Default,
    ObjectDestructure,
    ArrayDestructure,
    Rest,
    KeywordOnlyMarker,
    PositionalOnlyMarker,
}

/// Split on commas that are not nested in brackets or quotes.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut prev = ' ';
    for (i, c) in params.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' | '`' => quote = Some(c),
                '(' | '[' | '{' | '<' => depth += 1,
                // `=>` closes nothing
                '>' if prev == '=' => {}
                ')' | ']' | '}' | '>' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(&params[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
        prev = c;
    }
    parts.push(&params[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Whether `=` appears outside brackets (a default value; `=>` excluded).
fn has_top_level_default(param: &str) -> bool {
    let mut depth = 0i32;
    let chars: Vec<char> = param.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '=' if depth == 0 => {
                let next = chars.get(i + 1).copied();
                let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
                if next != Some('>') && next != Some('=') && prev != Some('!') {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn classify(param: &str, language: LanguageId) -> ParamShape {
    if language == LanguageId::Python {
        match param {
            "*" => return ParamShape::KeywordOnlyMarker,
            "/" => return ParamShape::PositionalOnlyMarker,
            _ if param.starts_with('*') => return ParamShape::Rest,
            _ => {}
        }
    } else if param.starts_with("...") {
        return ParamShape::Rest;
    }
    let name = param.split(':').next().unwrap_or(param).trim_end();
    if has_top_level_default(param) || (language == LanguageId::TypeScript && name.ends_with('?')) {
        return ParamShape::Default;
    }
    match param.chars().next() {
        Some('{') => ParamShape::ObjectDestructure,
        Some('[') => ParamShape::ArrayDestructure,
        _ => ParamShape::Plain,
    }
}

/// Shape of a whole parameter list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub shapes: Vec<ParamShape>,
    /// Parameters before the first rest parameter or keyword-only marker.
    pub positional: usize,
    pub variadic: bool,
}

impl Signature {
    pub fn parse(params: &str, language: LanguageId) -> Self {
        let shapes: Vec<ParamShape> = split_params(params)
            .into_iter()
            .map(|p| classify(p, language))
            .collect();
        let positional = shapes
            .iter()
            .take_while(|s| !matches!(s, ParamShape::Rest | ParamShape::KeywordOnlyMarker))
            .filter(|s| **s != ParamShape::PositionalOnlyMarker)
            .count();
        let variadic = shapes.contains(&ParamShape::Rest);
        Self {
            shapes,
            positional,
            variadic,
        }
    }

    /// The positional parameter shapes, markers removed.
    fn positional_shapes(&self) -> impl Iterator<Item = &ParamShape> {
        self.shapes
            .iter()
            .filter(|s| **s != ParamShape::PositionalOnlyMarker)
            .take(self.positional)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideReason {
    /// More positional parameters than the parent, without defaults.
    ExtraRequiredParameters,
    /// Fewer positional parameters than the parent and no rest parameter.
    MissingParameters,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideWarning {
    pub class_name: String,
    pub method: String,
    pub location: Location,
    pub parent_class: String,
    pub parent_location: Location,
    pub reason: OverrideReason,
    pub positional: usize,
    pub parent_positional: usize,
}

/// Compare one override with one overridden signature.
pub fn compare_signatures(child: &Signature, parent: &Signature) -> Option<OverrideReason> {
    if child.positional > parent.positional {
        let extra_required = child
            .positional_shapes()
            .skip(parent.positional)
            .any(|s| *s != ParamShape::Default);
        if extra_required {
            return Some(OverrideReason::ExtraRequiredParameters);
        }
    } else if child.positional < parent.positional && !child.variadic {
        return Some(OverrideReason::MissingParameters);
    }
    None
}

fn is_constructor(record: &MethodRecord) -> bool {
    matches!(record.bare_name(), "constructor" | "__init__")
}

/// The nearest ancestor member named `member_key` along each parent branch.
pub fn overridden_members<'s>(
    store: &'s SymbolStore,
    class: &ClassRecord,
    member_key: &str,
) -> Vec<&'s MethodRecord> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    for parent in store.parents(&class.name, class.language) {
        collect_nearest(store, parent, class.language, member_key, 0, &mut visited, &mut found);
    }
    found
}

fn collect_nearest<'s>(
    store: &'s SymbolStore,
    class_name: &str,
    language: LanguageId,
    member_key: &str,
    depth: usize,
    visited: &mut HashSet<String>,
    found: &mut Vec<&'s MethodRecord>,
) {
    if depth > MAX_INHERITANCE_DEPTH || !visited.insert(class_name.to_string()) {
        return;
    }
    if let Some(class) = store.class(class_name, language) {
        let bare = member_key.strip_suffix("()").unwrap_or(member_key);
        if let Some(member) = class.member(bare) {
            found.push(member);
            return;
        }
    }
    for parent in store.parents(class_name, language) {
        collect_nearest(store, parent, language, member_key, depth + 1, visited, found);
    }
}

/// Check every override of one class.
pub fn check_class(store: &SymbolStore, class: &ClassRecord) -> Vec<OverrideWarning> {
    let mut warnings = Vec::new();
    for record in class.methods.values() {
        if !record.is_callable() || is_constructor(record) {
            continue;
        }
        let child = Signature::parse(record.params.as_deref().unwrap_or(""), record.language);
        for parent in overridden_members(store, class, &record.name) {
            if !parent.is_callable() {
                continue;
            }
            let parent_sig =
                Signature::parse(parent.params.as_deref().unwrap_or(""), parent.language);
            if let Some(reason) = compare_signatures(&child, &parent_sig) {
                warnings.push(OverrideWarning {
                    class_name: class.name.clone(),
                    method: record.name.clone(),
                    location: record.location(),
                    parent_class: parent.class_name.clone().unwrap_or_default(),
                    parent_location: parent.location(),
                    reason,
                    positional: child.positional,
                    parent_positional: parent_sig.positional,
                });
            }
        }
    }
    warnings
}

/// Check every class in the store, ordered by file and line.
pub fn check_override_signatures(store: &SymbolStore) -> Vec<OverrideWarning> {
    let mut warnings: Vec<OverrideWarning> = store
        .classes()
        .flat_map(|class| check_class(store, class))
        .collect();
    warnings.sort_by(|a, b| {
        a.location
            .file_path
            .cmp(&b.location.file_path)
            .then(a.location.line.cmp(&b.location.line))
    });
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::symbols::extract_symbols;

    const JS: LanguageId = LanguageId::JavaScript;
    const PY: LanguageId = LanguageId::Python;

    fn store_of(files: &[(&str, &str)], language: LanguageId) -> SymbolStore {
        let mut store = SymbolStore::new();
        for (path, text) in files {
            store.insert_file_symbols(extract_symbols(text, path, language, true));
        }
        store
    }

    #[test]
    fn test_classify_js() {
        let sig = Signature::parse("a, b = 2, {c, d}, [e], ...rest", JS);
        assert_eq!(
            sig.shapes,
            vec![
                ParamShape::Plain,
                ParamShape::Default,
                ParamShape::ObjectDestructure,
                ParamShape::ArrayDestructure,
                ParamShape::Rest,
            ]
        );
        assert_eq!(sig.positional, 4);
        assert!(sig.variadic);
        assert_eq!(
            Signature::parse("cb = (x) => x, next", JS).shapes,
            vec![ParamShape::Default, ParamShape::Plain]
        );
        assert_eq!(Signature::parse("", JS).positional, 0);
    }

    #[test]
    fn test_classify_python() {
        let sig = Signature::parse("self, a, /, b=1, *, c, **kwargs", PY);
        assert_eq!(
            sig.shapes,
            vec![
                ParamShape::Plain,
                ParamShape::Plain,
                ParamShape::PositionalOnlyMarker,
                ParamShape::Default,
                ParamShape::KeywordOnlyMarker,
                ParamShape::Plain,
                ParamShape::Rest,
            ]
        );
        assert_eq!(sig.positional, 3);
        assert!(sig.variadic);
        assert_eq!(Signature::parse("x: Dict[str, int] = {}", PY).shapes, vec![ParamShape::Default]);
    }

    #[test]
    fn test_extra_parameter_needs_default() {
        let base = "class Base {\n    draw(a, b) {}\n}\n";
        let strict = "class Strict extends Base {\n    draw(a, b, c) {}\n}\n";
        let loose = "class Loose extends Base {\n    draw(a, b, c = 1) {}\n}\n";
        let store = store_of(&[("/ws/base.js", base), ("/ws/strict.js", strict), ("/ws/loose.js", loose)], JS);
        let warnings = check_override_signatures(&store);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].class_name, "Strict");
        assert_eq!(warnings[0].method, "draw()");
        assert_eq!(warnings[0].parent_class, "Base");
        assert_eq!(warnings[0].reason, OverrideReason::ExtraRequiredParameters);
    }

    #[test]
    fn test_fewer_parameters_need_rest() {
        let base = "class Base {\n    draw(a, b) {}\n}\n";
        let short = "class Short extends Base {\n    draw(a) {}\n}\n";
        let rest = "class Rest extends Base {\n    draw(...args) {}\n}\n";
        let store = store_of(&[("/ws/base.js", base), ("/ws/short.js", short), ("/ws/rest.js", rest)], JS);
        let warnings = check_override_signatures(&store);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].class_name, "Short");
        assert_eq!(warnings[0].reason, OverrideReason::MissingParameters);
    }

    #[test]
    fn test_constructors_exempt_and_nearest_ancestor_only() {
        let text = "\
class A:
    def __init__(self, a):
        pass
    def run(self, x, y):
        pass

class B(A):
    def __init__(self):
        pass
    def run(self, x, y, z=None):
        pass

class C(B):
    def run(self, x, y, z, w):
        pass
";
        let store = store_of(&[("/ws/mod.py", text)], PY);
        let warnings = check_override_signatures(&store);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].class_name, "C");
        assert_eq!(warnings[0].parent_class, "B");
        assert!(warnings[0].reason == OverrideReason::ExtraRequiredParameters);
    }

    #[test]
    fn test_walks_through_unknown_classes() {
        let mut store = store_of(
            &[
                ("/ws/base.js", "class Base {\n    draw(a) {}\n}\n"),
                ("/ws/leaf.js", "class Leaf extends Middle {\n    draw(a, b) {}\n}\n"),
            ],
            JS,
        );
        store.set_parents("Middle", JS, vec!["Base".into()]);
        let warnings = check_override_signatures(&store);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].parent_class, "Base");
    }
}
