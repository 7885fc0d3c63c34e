//! Indexing pipeline orchestration with Rayon-based parallelism.
//!
//! Files are read and scanned on a bounded pool; the results are applied to
//! a fresh store on the calling thread in walk order, so the outcome does
//! not depend on thread scheduling.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::indexer::filesystem::{content_hash, detect_language, iter_source_files};
use crate::indexer::symbols::{extract_symbols, FileSymbols};
use crate::models::LanguageId;
use crate::store::{FileEntry, FileRegistry, SymbolStore};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Monotonic scan generation. Starting a scan or cancelling bumps it; a scan
/// whose generation is no longer current abandons its remaining files.
#[derive(Clone, Debug, Default)]
pub struct ScanGeneration {
    counter: Arc<AtomicU64>,
}

impl ScanGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new scan, superseding any in flight.
    pub fn begin(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn cancel(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == generation
    }
}

// ---------------------------------------------------------------------------
// Per-file extraction
// ---------------------------------------------------------------------------

/// Outcome of reading and scanning one file.
#[derive(Debug)]
pub struct ExtractionResult {
    pub path: String,
    pub language: Option<LanguageId>,
    pub content_hash: Option<String>,
    pub symbols: FileSymbols,
    pub error: Option<String>,
}

impl ExtractionResult {
    fn failed(path: String, language: Option<LanguageId>, error: String) -> Self {
        Self {
            path,
            language,
            content_hash: None,
            symbols: FileSymbols::default(),
            error: Some(error),
        }
    }

    pub fn file_entry(&self) -> FileEntry {
        FileEntry {
            path: self.path.clone(),
            language: self.language,
            content_hash: self.content_hash.clone(),
        }
    }
}

pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Scan already-loaded text. A panic inside an extractor is caught and
/// reported as an error so one file can never abort a workspace scan.
pub fn extract_text(
    path: &str,
    text: &str,
    language: LanguageId,
    config: &IndexConfig,
) -> ExtractionResult {
    let in_workspace = config.is_workspace_file(path);
    let scanned = catch_unwind(AssertUnwindSafe(|| {
        extract_symbols(text, path, language, in_workspace)
    }));
    match scanned {
        Ok(symbols) => {
            if symbols.is_empty() {
                if config.debug {
                    debug!("no class or symbols found in {path}");
                }
            } else {
                debug!(
                    "{path}: {} classes, {} functions",
                    symbols.classes.len(),
                    symbols.functions.len()
                );
            }
            ExtractionResult {
                path: path.to_string(),
                language: Some(language),
                content_hash: Some(content_hash(text.as_bytes())),
                symbols,
                error: None,
            }
        }
        Err(_) => {
            warn!("symbol extraction failed for {path}; indexing it as empty");
            ExtractionResult::failed(
                path.to_string(),
                Some(language),
                "symbol extraction failed".to_string(),
            )
        }
    }
}

/// Read and scan one file, preferring an open buffer over the disk copy.
/// Files of unknown language are recorded without being read.
pub fn extract_file(
    path: &Path,
    config: &IndexConfig,
    buffers: &HashMap<String, String>,
) -> ExtractionResult {
    let key = path_key(path);
    let Some(language) = detect_language(path) else {
        return ExtractionResult {
            path: key,
            language: None,
            content_hash: None,
            symbols: FileSymbols::default(),
            error: None,
        };
    };
    if let Some(text) = buffers.get(&key) {
        return extract_text(&key, text, language, config);
    }
    match std::fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            extract_text(&key, &text, language, config)
        }
        Err(err) => {
            warn!("cannot read {key}: {err}");
            ExtractionResult::failed(key, Some(language), err.to_string())
        }
    }
}

/// Scan `paths` on a pool of `workers` threads. Returns `None` when the
/// scan generation moved on before every file was done.
pub fn parallel_extract(
    paths: &[PathBuf],
    config: &IndexConfig,
    buffers: &HashMap<String, String>,
    generation: &ScanGeneration,
    ticket: u64,
) -> Option<Vec<ExtractionResult>> {
    if paths.is_empty() {
        return Some(Vec::new());
    }

    let work = |path: &PathBuf| -> Option<ExtractionResult> {
        if !generation.is_current(ticket) {
            return None;
        }
        Some(extract_file(path, config, buffers))
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .build();
    let results: Vec<Option<ExtractionResult>> = match pool {
        Ok(pool) => pool.install(|| paths.par_iter().map(work).collect()),
        Err(err) => {
            warn!("falling back to sequential extraction: {err}");
            paths.iter().map(work).collect()
        }
    };

    if !generation.is_current(ticket) {
        return None;
    }
    results.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Full builds
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub files_seen: usize,
    pub files_indexed: usize,
    pub files_failed: usize,
    pub classes_indexed: usize,
    pub symbols_indexed: usize,
    pub elapsed_ms: u64,
    pub walk_errors: Vec<String>,
}

/// A freshly built index, ready to be swapped in.
#[derive(Debug, Default)]
pub struct IndexBuild {
    pub store: SymbolStore,
    pub files: FileRegistry,
    pub stats: IndexStats,
}

/// Walk every scan root, deduplicating files reachable from more than one.
/// A root that cannot be walked is reported and skipped.
pub fn collect_files(config: &IndexConfig) -> (Vec<PathBuf>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut errors = Vec::new();
    for root in config.scan_roots() {
        match iter_source_files(&root, config) {
            Ok(found) => {
                for path in found {
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
            }
            Err(err) => {
                warn!("search failed for {}: {err}", root.display());
                errors.push(err.to_string());
            }
        }
    }
    (files, errors)
}

/// Apply extraction results to an empty store, in order.
pub fn assemble(results: Vec<ExtractionResult>) -> (SymbolStore, FileRegistry, IndexStats) {
    let mut store = SymbolStore::new();
    let mut files = FileRegistry::new();
    let mut stats = IndexStats::default();
    for result in results {
        stats.files_seen += 1;
        if result.language.is_some() {
            stats.files_indexed += 1;
        }
        if result.error.is_some() {
            stats.files_failed += 1;
        }
        stats.classes_indexed += result.symbols.classes.len();
        stats.symbols_indexed += result.symbols.symbol_count();
        files.insert(result.file_entry());
        store.insert_file_symbols(result.symbols);
    }
    (store, files, stats)
}

/// Full rebuild. Returns `None` when cancelled by a newer scan.
pub fn build_index(
    config: &IndexConfig,
    buffers: &HashMap<String, String>,
    generation: &ScanGeneration,
) -> Option<IndexBuild> {
    let ticket = generation.begin();
    let started = Instant::now();
    let roots = config.scan_roots();
    info!("indexing {} search path(s)", roots.len());

    let (paths, walk_errors) = collect_files(config);
    if !generation.is_current(ticket) {
        return None;
    }
    let results = parallel_extract(&paths, config, buffers, generation, ticket)?;
    let (store, files, mut stats) = assemble(results);
    stats.walk_errors = walk_errors;
    stats.elapsed_ms = started.elapsed().as_millis() as u64;

    for root in &roots {
        info!(
            "Search complete: {} ({} files in {} ms)",
            root.display(),
            stats.files_seen,
            stats.elapsed_ms
        );
    }
    Some(IndexBuild {
        store,
        files,
        stats,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn workspace() -> (tempfile::TempDir, IndexConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(
            root.join("src/dog.js"),
            "class Dog extends Animal {\n    speak() {}\n}\n",
        )
        .unwrap();
        fs::write(
            root.join("src/zoo.py"),
            "class Zoo(Place):\n    def open(self):\n        pass\n",
        )
        .unwrap();
        fs::write(root.join("src/notes.txt"), "nothing here").unwrap();
        let config = IndexConfig::for_workspace(root);
        (tmp, config)
    }

    #[test]
    fn test_build_index() {
        let (_tmp, config) = workspace();
        let build = build_index(&config, &HashMap::new(), &ScanGeneration::new()).unwrap();
        assert_eq!(build.stats.files_seen, 3);
        assert_eq!(build.stats.files_indexed, 2);
        assert_eq!(build.stats.classes_indexed, 2);
        assert!(build.store.class("Dog", LanguageId::JavaScript).unwrap().in_workspace);
        assert_eq!(build.store.parents("Zoo", LanguageId::Python), ["Place"]);
        assert_eq!(build.files.len(), 3);
    }

    #[test]
    fn test_open_buffer_wins_over_disk() {
        let (tmp, config) = workspace();
        let dog = path_key(&tmp.path().join("src/dog.js"));
        let mut buffers = HashMap::new();
        buffers.insert(dog, "class Cat extends Animal {}\n".to_string());
        let build = build_index(&config, &buffers, &ScanGeneration::new()).unwrap();
        assert!(build.store.class("Dog", LanguageId::JavaScript).is_none());
        assert!(build.store.class("Cat", LanguageId::JavaScript).is_some());
    }

    #[test]
    fn test_cancelled_scan_returns_none() {
        let (_tmp, config) = workspace();
        let generation = ScanGeneration::new();
        let ticket = generation.begin();
        generation.cancel();
        let (paths, _) = collect_files(&config);
        assert!(parallel_extract(&paths, &config, &HashMap::new(), &generation, ticket).is_none());
    }

    #[test]
    fn test_unreadable_file_contributes_nothing() {
        let config = IndexConfig::default();
        let result = extract_file(Path::new("/no/such/file.js"), &config, &HashMap::new());
        assert!(result.error.is_some());
        assert!(result.symbols.is_empty());
        assert_eq!(result.language, Some(LanguageId::JavaScript));
    }

    #[test]
    fn test_missing_root_is_reported() {
        let config = IndexConfig {
            search_paths: vec![PathBuf::from("/no/such/root")],
            ..IndexConfig::default()
        };
        let build = build_index(&config, &HashMap::new(), &ScanGeneration::new()).unwrap();
        assert_eq!(build.stats.files_seen, 0);
        assert_eq!(build.stats.walk_errors.len(), 1);
    }
}
