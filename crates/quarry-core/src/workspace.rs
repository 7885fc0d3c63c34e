//! The workspace index: one owned store plus the operations hosts call.
//!
//! `WorkspaceIndex` is the single owner of the symbol store and the file
//! registry. Every mutation (full rescan, single-file rescan, incremental
//! sync) goes through it, and every query borrows the store read-only.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::IndexConfig;
use crate::errors::{QuarryError, QuarryResult};
use crate::indexer::filesystem::{compute_content_hash, content_hash, detect_language};
use crate::indexer::pipeline::{
    build_index, collect_files, extract_file, path_key, IndexStats, ScanGeneration,
};
use crate::indexer::symbols::split_lines;
use crate::models::{LanguageId, SymbolInfo};
use crate::query::definition::{DefinitionResolver, SourceView};
use crate::query::guards::MAX_HIERARCHY_DEPTH;
use crate::query::hierarchy::{subtype_tree, supertype_tree, TypeHierarchyNode};
use crate::query::lint::{should_lint, Diagnostic, Linter};
use crate::query::overrides::{self, OverrideWarning};
use crate::query::search::{search_symbols, QueryOptions, SearchSettings};
use crate::query::structure;
use crate::store::{FileRegistry, Invalidation, SymbolStore};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Sink for human-readable status messages (scan complete, scan failed,
/// ambiguous result, bad configuration).
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink: forwards to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub search_paths: Vec<String>,
    pub files_total: usize,
    pub classes_total: usize,
    #[serde(rename = "esClassesTotal")]
    pub es_classes_total: usize,
    pub legacy_classes_total: usize,
    pub exported_functions_total: usize,
    pub symbols_total: usize,
    pub root_folders: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RescanReport {
    pub stats: IndexStats,
    pub summary: IndexSummary,
    /// Findings for every open buffer, keyed by path.
    pub diagnostics: BTreeMap<String, Vec<Diagnostic>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    pub path: String,
    pub removed: Invalidation,
    pub classes: usize,
    pub symbols: usize,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub rescanned: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: usize,
}

// ---------------------------------------------------------------------------
// WorkspaceIndex
// ---------------------------------------------------------------------------

pub struct WorkspaceIndex {
    config: IndexConfig,
    store: SymbolStore,
    files: FileRegistry,
    buffers: HashMap<String, String>,
    generation: ScanGeneration,
    notifier: Box<dyn Notifier>,
}

impl WorkspaceIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self::with_notifier(config, Box::new(TracingNotifier))
    }

    pub fn with_notifier(config: IndexConfig, notifier: Box<dyn Notifier>) -> Self {
        Self {
            config,
            store: SymbolStore::new(),
            files: FileRegistry::new(),
            buffers: HashMap::new(),
            generation: ScanGeneration::new(),
            notifier,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn store(&self) -> &SymbolStore {
        &self.store
    }

    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    /// A handle that can cancel an in-flight rescan from another thread.
    pub fn generation(&self) -> ScanGeneration {
        self.generation.clone()
    }

    pub fn cancel(&self) {
        self.generation.cancel();
    }

    // -- Configuration ------------------------------------------------------

    /// Load a new configuration file. On failure the previous configuration
    /// stays in effect and one error notification is emitted.
    pub fn reload_config(&mut self, path: &Path) -> bool {
        match IndexConfig::load(path) {
            Ok(config) => {
                self.config = config.with_env_overrides();
                true
            }
            Err(err) => {
                warn!("keeping previous configuration: {err}");
                self.notifier.error(&err.to_string());
                false
            }
        }
    }

    // -- Open buffers -------------------------------------------------------

    pub fn open_buffer(&mut self, path: &str, text: impl Into<String>) {
        self.buffers.insert(path.to_string(), text.into());
    }

    pub fn close_buffer(&mut self, path: &str) -> bool {
        self.buffers.remove(path).is_some()
    }

    pub fn buffer(&self, path: &str) -> Option<&str> {
        self.buffers.get(path).map(String::as_str)
    }

    /// Current text of a file: the open buffer if any, else the disk copy.
    pub fn source_text(&self, path: &str) -> QuarryResult<String> {
        if let Some(text) = self.buffers.get(path) {
            return Ok(text.clone());
        }
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    // -- Indexing -----------------------------------------------------------

    /// Rebuild everything. Returns `None` when a newer scan or an explicit
    /// cancel superseded this one; the previous index is then untouched.
    pub fn rescan_all(&mut self) -> Option<RescanReport> {
        let Some(build) = build_index(&self.config, &self.buffers, &self.generation) else {
            self.notifier.info("Search cancelled");
            return None;
        };
        self.store = build.store;
        self.files = build.files;

        for error in &build.stats.walk_errors {
            self.notifier.warn(&format!("Search failed: {error}"));
        }
        let summary = self.summary();
        info!(
            "indexed {} files: {} classes ({} ES, {} legacy), {} exported functions",
            summary.files_total,
            summary.classes_total,
            summary.es_classes_total,
            summary.legacy_classes_total,
            summary.exported_functions_total
        );
        self.notifier.info(&format!(
            "Search complete: {} files in {} ms",
            build.stats.files_seen, build.stats.elapsed_ms
        ));

        let mut diagnostics = BTreeMap::new();
        let open: Vec<String> = self.buffers.keys().cloned().collect();
        for path in open {
            match self.lint_file(&path) {
                Ok(found) => {
                    diagnostics.insert(path, found);
                }
                Err(err) => warn!("cannot lint {path}: {err}"),
            }
        }

        Some(RescanReport {
            stats: build.stats,
            summary,
            diagnostics,
        })
    }

    /// Invalidate then re-insert one file. A file that can no longer be
    /// read keeps no records and is dropped from the registry.
    pub fn rescan_file(&mut self, path: &Path) -> FileUpdate {
        let result = extract_file(path, &self.config, &self.buffers);
        let key = result.path.clone();
        let classes = result.symbols.classes.len();
        let symbols = result.symbols.symbol_count();
        let entry = result.file_entry();
        let error = result.error.clone();

        let removed = self.store.replace_file(&key, result.symbols);
        if error.is_some() && result.content_hash.is_none() && !path.exists() {
            self.files.remove(&key);
        } else {
            self.files.insert(entry);
        }
        FileUpdate {
            path: key,
            removed,
            classes,
            symbols,
            error,
        }
    }

    /// Forget a file entirely.
    pub fn remove_file(&mut self, path: &str) -> Invalidation {
        self.files.remove(path);
        self.store.invalidate_file(path)
    }

    /// Re-walk the search paths: rescan new or changed files, evict files
    /// that disappeared.
    pub fn sync_changed(&mut self) -> SyncReport {
        let (paths, walk_errors) = collect_files(&self.config);
        for error in &walk_errors {
            self.notifier.warn(&format!("Search failed: {error}"));
        }

        let mut report = SyncReport::default();
        let mut walked: HashSet<String> = HashSet::new();
        for path in &paths {
            let key = path_key(path);
            walked.insert(key.clone());

            if detect_language(path).is_none() {
                if self.files.contains(&key) {
                    report.unchanged += 1;
                } else {
                    self.rescan_file(path);
                    report.rescanned.push(key);
                }
                continue;
            }

            let current = match self.buffers.get(&key) {
                Some(text) => Some(content_hash(text.as_bytes())),
                None => compute_content_hash(path).ok(),
            };
            let known = self.files.get(&key).and_then(|e| e.content_hash.clone());
            if current.is_some() && current == known {
                report.unchanged += 1;
            } else {
                self.rescan_file(path);
                report.rescanned.push(key);
            }
        }

        let gone: Vec<String> = self
            .files
            .paths()
            .filter(|p| !walked.contains(*p))
            .map(str::to_string)
            .collect();
        for path in gone {
            self.remove_file(&path);
            report.removed.push(path);
        }
        info!(
            "sync: {} rescanned, {} removed, {} unchanged",
            report.rescanned.len(),
            report.removed.len(),
            report.unchanged
        );
        report
    }

    pub fn summary(&self) -> IndexSummary {
        let mut summary = IndexSummary {
            search_paths: self
                .config
                .scan_roots()
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            files_total: self.files.len(),
            root_folders: self
                .files
                .root_folders()
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            ..IndexSummary::default()
        };
        for class in self.store.classes() {
            summary.classes_total += 1;
            if class.es {
                summary.es_classes_total += 1;
            } else {
                summary.legacy_classes_total += 1;
            }
            summary.symbols_total += 1 + class.methods.len();
        }
        for function in self.store.all_functions() {
            if function.exported {
                summary.exported_functions_total += 1;
            }
            summary.symbols_total += 1;
        }
        summary
    }

    // -- Queries ------------------------------------------------------------

    pub fn query(&self, text: &str, options: &QueryOptions) -> QuarryResult<Vec<SymbolInfo>> {
        let settings = SearchSettings {
            max_results: self.config.max_search_results,
            include_es_outside_workspace: self.config.include_es_outside_workspace,
        };
        search_symbols(&self.store, &self.files, text, options, settings)
    }

    fn language_of(path: &str) -> QuarryResult<LanguageId> {
        detect_language(Path::new(path))
            .ok_or_else(|| QuarryError::UnsupportedLanguage(path.to_string()))
    }

    /// Definition candidates for the word at `(line, column)`.
    pub fn resolve_definition(
        &self,
        path: &str,
        line: usize,
        column: usize,
    ) -> QuarryResult<Vec<SymbolInfo>> {
        let language = Self::language_of(path)?;
        let text = self.source_text(path)?;
        let lines = split_lines(&text);
        let source = SourceView {
            file_path: path,
            language,
            lines: &lines,
        };
        let found = DefinitionResolver::new(&self.store).resolve(&source, line, column);
        if found.len() > 1 {
            self.notifier
                .info(&format!("{} possible definitions found", found.len()));
        }
        Ok(found)
    }

    pub fn file_outline(&self, path: &str) -> Vec<SymbolInfo> {
        structure::file_outline(&self.store, path)
    }

    pub fn adjacent_symbol(&self, path: &str, line: usize, forward: bool) -> Option<SymbolInfo> {
        let outline = self.file_outline(path);
        structure::adjacent_symbol(&outline, line, forward).cloned()
    }

    pub fn parents(&self, class_name: &str, language: LanguageId) -> Vec<String> {
        self.store.parents(class_name, language).to_vec()
    }

    pub fn subtypes(&self, class_name: &str, language: LanguageId) -> Vec<String> {
        self.store.subtypes(class_name, language)
    }

    pub fn supertype_tree(&self, class_name: &str, language: LanguageId) -> TypeHierarchyNode {
        supertype_tree(&self.store, class_name, language, MAX_HIERARCHY_DEPTH)
    }

    pub fn subtype_tree(&self, class_name: &str, language: LanguageId) -> TypeHierarchyNode {
        subtype_tree(&self.store, class_name, language, MAX_HIERARCHY_DEPTH)
    }

    pub fn check_override_signatures(&self) -> Vec<OverrideWarning> {
        overrides::check_override_signatures(&self.store)
    }

    /// Lint one file. Files outside the root folders, under
    /// `node_modules`, or not JavaScript/TypeScript yield nothing.
    pub fn lint_file(&self, path: &str) -> QuarryResult<Vec<Diagnostic>> {
        let Some(language) = detect_language(Path::new(path)) else {
            return Ok(Vec::new());
        };
        if !self.config.lint.enabled || !should_lint(&self.files, path, language) {
            return Ok(Vec::new());
        }
        let text = self.source_text(path)?;
        let lines = split_lines(&text);
        let source = SourceView {
            file_path: path,
            language,
            lines: &lines,
        };
        Ok(Linter::new(&self.store, &self.config.lint).lint(&source))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CollectingNotifier {
        messages: Arc<Mutex<Vec<(&'static str, String)>>>,
    }

    impl CollectingNotifier {
        fn levels(&self, level: &str) -> Vec<String> {
            self.messages
                .lock()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    impl Notifier for CollectingNotifier {
        fn info(&self, message: &str) {
            self.messages.lock().push(("info", message.to_string()));
        }
        fn warn(&self, message: &str) {
            self.messages.lock().push(("warn", message.to_string()));
        }
        fn error(&self, message: &str) {
            self.messages.lock().push(("error", message.to_string()));
        }
    }

    const ANIMAL: &str = "\
/** Base. */
class Animal {
    /** Speak. */
    speak(words) {}
}
";
    const DOG: &str = "\
/** Dog. */
class Dog extends Animal {
    speak(words) {
        this.wag();
    }
    wag() {}
}
";

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: String,
        index: WorkspaceIndex,
        notes: CollectingNotifier,
    }

    impl Fixture {
        fn path(&self, rel: &str) -> String {
            format!("{}/{rel}", self.root)
        }
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_string_lossy().into_owned();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/animal.js"), ANIMAL).unwrap();
        fs::write(tmp.path().join("src/dog.js"), DOG).unwrap();
        fs::write(
            tmp.path().join("src/zoo.py"),
            "class Zoo(Place):\n    def open(self, hour):\n        pass\n",
        )
        .unwrap();
        fs::write(tmp.path().join("src/README.md"), "# zoo\n").unwrap();

        let notes = CollectingNotifier::default();
        let mut config = IndexConfig::for_workspace(tmp.path());
        config.workers = 2;
        let index = WorkspaceIndex::with_notifier(config, Box::new(notes.clone()));
        Fixture {
            _tmp: tmp,
            root,
            index,
            notes,
        }
    }

    #[test]
    fn test_rescan_all() {
        let mut fx = fixture();
        let report = fx.index.rescan_all().unwrap();
        assert_eq!(report.stats.files_seen, 4);
        assert_eq!(report.summary.files_total, 4);
        assert_eq!(report.summary.classes_total, 3);
        assert_eq!(report.summary.es_classes_total, 2);
        assert_eq!(report.summary.legacy_classes_total, 1);
        assert_eq!(fx.index.parents("Dog", LanguageId::JavaScript), vec!["Animal"]);
        assert_eq!(fx.index.subtypes("Animal", LanguageId::JavaScript), vec!["Dog"]);
        assert!(fx.notes.levels("info").iter().any(|m| m.starts_with("Search complete")));
    }

    #[test]
    fn test_rescan_file_replaces_records() {
        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        let dog = fx.path("src/dog.js");

        let before = fx.index.file_outline(&dog);
        let update = fx.index.rescan_file(Path::new(&dog));
        assert_eq!(update.removed.classes, 1);
        assert_eq!(fx.index.file_outline(&dog), before);

        fs::write(&dog, "class Puppy extends Animal {\n    nap() {}\n}\n").unwrap();
        fx.index.rescan_file(Path::new(&dog));
        let js = LanguageId::JavaScript;
        assert!(fx.index.store().class("Dog", js).is_none());
        assert!(fx.index.store().class("Puppy", js).is_some());
        assert_eq!(fx.index.subtypes("Animal", js), vec!["Puppy"]);
        assert!(fx
            .index
            .store()
            .classes()
            .filter(|c| c.file_path == dog)
            .all(|c| c.name == "Puppy"));
    }

    #[test]
    fn test_rescan_deleted_file_evicts() {
        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        let dog = fx.path("src/dog.js");
        fs::remove_file(&dog).unwrap();
        let update = fx.index.rescan_file(Path::new(&dog));
        assert!(update.error.is_some());
        assert!(!fx.index.files().contains(&dog));
        assert!(fx.index.store().class("Dog", LanguageId::JavaScript).is_none());
    }

    #[test]
    fn test_open_buffer_preferred() {
        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        let dog = fx.path("src/dog.js");
        fx.index
            .open_buffer(&dog, "class Hound extends Animal {\n    bay() {}\n}\n");
        fx.index.rescan_file(Path::new(&dog));
        assert!(fx.index.store().class("Hound", LanguageId::JavaScript).is_some());
        assert!(fx.index.close_buffer(&dog));
        fx.index.rescan_file(Path::new(&dog));
        assert!(fx.index.store().class("Dog", LanguageId::JavaScript).is_some());
    }

    #[test]
    fn test_sync_changed() {
        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        fs::write(fx.path("src/dog.js"), "class Dog extends Animal {\n    run() {}\n}\n").unwrap();
        fs::write(fx.path("src/cat.js"), "class Cat extends Animal {}\n").unwrap();
        fs::remove_file(fx.path("src/zoo.py")).unwrap();

        let report = fx.index.sync_changed();
        let mut rescanned = report.rescanned.clone();
        rescanned.sort();
        assert_eq!(rescanned, vec![fx.path("src/cat.js"), fx.path("src/dog.js")]);
        assert_eq!(report.removed, vec![fx.path("src/zoo.py")]);
        assert_eq!(report.unchanged, 2);
        assert!(fx.index.store().class("Zoo", LanguageId::Python).is_none());

        let again = fx.index.sync_changed();
        assert!(again.rescanned.is_empty());
        assert!(again.removed.is_empty());
    }

    #[test]
    fn test_live_queries_coalesce_over_shared_index() {
        use crate::session::{QuerySession, RequestKind};
        use std::time::Duration;

        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        let shared = Mutex::new(fx.index);
        let session = QuerySession::with_windows(Duration::from_millis(200), Duration::ZERO);
        let options = QueryOptions {
            search_all: true,
            ..QueryOptions::default()
        };
        let run = |text: &'static str| {
            session
                .debounced(RequestKind::Query, || shared.lock().query(text, &options))
                .transpose()
                .unwrap()
        };

        let (first, second) = std::thread::scope(|scope| {
            let early = scope.spawn(|| run("Dog.w"));
            std::thread::sleep(Duration::from_millis(50));
            let late = scope.spawn(|| run("Dog.^wag$"));
            (early.join().unwrap(), late.join().unwrap())
        });
        assert!(first.is_none());
        let found = second.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dog.wag()");

        let ticket = session.issue(RequestKind::Definition);
        let dog = format!("{}/src/dog.js", fx.root);
        let wag = shared.lock().resolve_definition(&dog, 3, 14).unwrap();
        session.issue(RequestKind::Definition);
        assert!(session.complete(ticket, wag).is_none());
    }

    #[test]
    fn test_query_and_definition() {
        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        let options = QueryOptions {
            search_all: true,
            ..QueryOptions::default()
        };
        let found = fx.index.query("Dog.^wag$", &options).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Dog.wag()");

        let dog = fx.path("src/dog.js");
        let wag = fx.index.resolve_definition(&dog, 3, 14).unwrap();
        assert_eq!(wag.len(), 1);
        assert_eq!(wag[0].location.line, 5);

        let next = fx.index.adjacent_symbol(&dog, 2, true);
        assert_eq!(next.map(|s| s.name), Some("Dog.wag()".to_string()));
        assert!(fx.index.resolve_definition(&fx.path("src/README.md"), 0, 0).is_err());
    }

    #[test]
    fn test_hierarchy_and_overrides() {
        let mut fx = fixture();
        fx.index.rescan_all().unwrap();
        let tree = fx.index.supertype_tree("Dog", LanguageId::JavaScript);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].name, "Animal");
        assert!(fx.index.check_override_signatures().is_empty());

        let dog = fx.path("src/dog.js");
        fs::write(&dog, "class Dog extends Animal {\n    speak(words, volume) {}\n}\n").unwrap();
        fx.index.rescan_file(Path::new(&dog));
        let warnings = fx.index.check_override_signatures();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].class_name, "Dog");
    }

    #[test]
    fn test_lint_open_buffers_after_rescan() {
        let mut fx = fixture();
        let dog = fx.path("src/dog.js");
        fx.index.open_buffer(&dog, DOG);
        let report = fx.index.rescan_all().unwrap();
        let found = report.diagnostics.get(&dog).unwrap();
        let messages: Vec<&str> = found.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Public method 'wag()' does not have API documentation."]);
    }

    #[test]
    fn test_reload_config() {
        let mut fx = fixture();
        let bad = fx.path("quarry.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(!fx.index.reload_config(Path::new(&bad)));
        assert_eq!(fx.notes.levels("error").len(), 1);
        assert_eq!(fx.index.config().workers, 2);

        fs::write(&bad, r#"{"maxSearchResults": 7}"#).unwrap();
        assert!(fx.index.reload_config(Path::new(&bad)));
        assert_eq!(fx.index.config().max_search_results, 7);
    }
}
