//! Symbol search query backend.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::QuarryResult;
use crate::models::{ClassRecord, LanguageId, SymbolInfo};
use crate::query::fuzzy::{MatchType, ScorePattern, SegmentMatcher};
use crate::query::guards::{clamp_limit, truncate_query, MAX_INHERITANCE_DEPTH, MAX_SEARCH_LIMIT};
use crate::store::{FileRegistry, SymbolStore};

const MISSING_SCORE: i64 = -10000;
const EXACT_METHOD_SCORE: i64 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Skip the matched classes themselves; search only their ancestors.
    pub inherited_only: bool,
    /// With a class filter, do not walk into parents.
    pub local_only: bool,
    /// Also match class names when there is no class filter.
    pub search_classes: bool,
    /// Include hidden classes and workspace functions, and match file paths.
    pub search_all: bool,
    /// Result cap; the configured default when absent.
    pub max: Option<usize>,
    /// Languages to search; all when absent.
    pub languages: Option<Vec<LanguageId>>,
}

/// Store-wide settings a search needs besides the query itself.
#[derive(Clone, Copy, Debug)]
pub struct SearchSettings {
    pub max_results: usize,
    pub include_es_outside_workspace: bool,
}

struct ParsedQuery {
    text: String,
    class: Option<SegmentMatcher>,
    method: SegmentMatcher,
    class_needle: Option<String>,
}

fn parse_query(raw: &str) -> QuarryResult<ParsedQuery> {
    let text = truncate_query(raw).to_lowercase();
    let parts: Vec<&str> = text.split('.').collect();
    let (class_segment, method_segment) = match parts.as_slice() {
        [class, method] => (Some(*class), *method),
        [single] => (None, *single),
        _ => (None, text.as_str()),
    };
    let class = class_segment.map(SegmentMatcher::parse).transpose()?;
    let method = SegmentMatcher::parse(method_segment)?;
    let class_needle = class.as_ref().map(|c| c.needle().to_string());
    Ok(ParsedQuery {
        text,
        class,
        method,
        class_needle,
    })
}

struct Collector<'a> {
    store: &'a SymbolStore,
    max: usize,
    found: Vec<SymbolInfo>,
    seen_members: HashSet<(LanguageId, String)>,
}

impl<'a> Collector<'a> {
    fn full(&self) -> bool {
        self.found.len() >= self.max
    }

    /// Members of `class_name` matching the method segment, optionally
    /// followed by its ancestors.
    fn methods(
        &mut self,
        class_name: &str,
        language: LanguageId,
        method: &SegmentMatcher,
        check_parents: bool,
        depth: usize,
    ) {
        if depth > MAX_INHERITANCE_DEPTH {
            return;
        }
        let store = self.store;
        if let Some(class) = store.class(class_name, language) {
            for record in class.methods.values() {
                let key = (language, record.qualified_name());
                if self.seen_members.contains(&key) || !method.matches(record.bare_name()) {
                    continue;
                }
                self.found.push(record.symbol().clone());
                self.seen_members.insert(key);
                if self.full() {
                    return;
                }
            }
        }
        if check_parents {
            for parent in store.parents(class_name, language) {
                self.methods(parent, language, method, true, depth + 1);
                if self.full() {
                    return;
                }
            }
        }
    }

    /// Members of the ancestors of `class_name`, nearest first.
    fn inherited(
        &mut self,
        class_name: &str,
        language: LanguageId,
        method: &SegmentMatcher,
        depth: usize,
    ) {
        if depth > MAX_INHERITANCE_DEPTH {
            return;
        }
        let store = self.store;
        for parent in store.parents(class_name, language) {
            self.methods(parent, language, method, false, depth + 1);
            if self.full() {
                return;
            }
            self.inherited(parent, language, method, depth + 1);
            if self.full() {
                return;
            }
        }
    }
}

/// Run a symbol query. Results are ranked by kind, then relevance, then name.
pub fn search_symbols(
    store: &SymbolStore,
    files: &FileRegistry,
    query: &str,
    options: &QueryOptions,
    settings: SearchSettings,
) -> QuarryResult<Vec<SymbolInfo>> {
    let parsed = parse_query(query)?;
    let max = clamp_limit(options.max.unwrap_or(settings.max_results), MAX_SEARCH_LIMIT);
    let languages = options
        .languages
        .clone()
        .unwrap_or_else(|| LanguageId::ALL.to_vec());
    let visible = |class: &ClassRecord| {
        options.search_all || class.is_default_visible(settings.include_es_outside_workspace)
    };

    let mut collector = Collector {
        store,
        max,
        found: Vec::new(),
        seen_members: HashSet::new(),
    };

    let long_enough = parsed.class_needle.as_ref().is_some_and(|c| c.len() > 1)
        || parsed.method.needle().len() > 1;

    if long_enough {
        let check_parents = parsed.class.is_some() && !options.local_only;
        for class in store.classes() {
            if !languages.contains(&class.language) {
                continue;
            }
            let selected = match &parsed.class {
                Some(filter) => filter.matches(&class.name),
                None => visible(class),
            };
            if !selected {
                continue;
            }
            if options.inherited_only {
                collector.inherited(&class.name, class.language, &parsed.method, 0);
            } else {
                collector.methods(&class.name, class.language, &parsed.method, check_parents, 0);
            }
            if collector.full() {
                break;
            }
        }

        if options.search_classes && parsed.class.is_none() && !collector.full() {
            for class in store.classes() {
                if languages.contains(&class.language)
                    && visible(class)
                    && parsed.method.matches(&class.name)
                {
                    collector.found.push(class.symbol().clone());
                    if collector.full() {
                        break;
                    }
                }
            }
        }

        if parsed.class.is_none() && !collector.full() {
            for function in store.all_functions() {
                if function.exported
                    && languages.contains(&function.language)
                    && (options.search_all || !function.in_workspace)
                    && parsed.method.matches(function.bare_name())
                {
                    collector.found.push(function.symbol().clone());
                    if collector.full() {
                        break;
                    }
                }
            }
        }
    }

    if options.search_all && parsed.text.chars().count() > 2 && !collector.full() {
        let file_query = SegmentMatcher::new(&parsed.text, MatchType::Fuzzy)?;
        let mut listed: HashSet<String> = collector
            .found
            .iter()
            .map(|s| s.location.file_path.clone())
            .collect();
        for path in files.paths() {
            if !listed.contains(path) && file_query.matches(path) {
                collector.found.push(SymbolInfo::for_file(path));
                listed.insert(path.to_string());
                if collector.full() {
                    break;
                }
            }
        }
    }

    let mut found = collector.found;
    rank_symbols(&parsed, &mut found)?;
    Ok(found)
}

fn rank_symbols(parsed: &ParsedQuery, symbols: &mut Vec<SymbolInfo>) -> QuarryResult<()> {
    let full_query = match &parsed.class_needle {
        Some(class) => format!("{class}.{}", parsed.method.needle()),
        None => parsed.method.needle().to_string(),
    };
    let full_pattern = ScorePattern::new(&full_query)?;
    let method_pattern = ScorePattern::new(parsed.method.needle())?;
    let method_needle = parsed.method.needle();

    let score = |symbol: &SymbolInfo| -> i64 {
        let mut score = None;
        if parsed.class_needle.is_some() {
            score = full_pattern.score(&symbol.name);
        }
        if score.is_none() {
            if let Some(method_name) = &symbol.method_name {
                let bare = method_name.strip_suffix("()").unwrap_or(method_name);
                score = if bare.to_lowercase() == method_needle {
                    Some(EXACT_METHOD_SCORE)
                } else {
                    method_pattern.score(method_name)
                };
            }
        }
        let by_path = full_pattern.score(symbol.file_path()).unwrap_or(MISSING_SCORE);
        by_path.max(score.unwrap_or(MISSING_SCORE))
    };

    let mut keyed: Vec<(u8, i64, SymbolInfo)> = symbols
        .drain(..)
        .map(|s| (s.kind.order(), score(&s), s))
        .collect();
    keyed.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.name.cmp(&b.2.name))
    });
    symbols.extend(keyed.into_iter().map(|(_, _, s)| s));
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
