//! Criterion benchmarks for quarry-core.
//!
//! ## Benchmark groups
//!
//! 1. **normalize**: comment/string stripping per line.
//! 2. **fuzzy**: lazy matching and scoring.
//! 3. **extraction**: JavaScript and Python scans of synthetic files.
//! 4. **query**: ranked searches and definition lookups on a synthetic store.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/quarry-core/Cargo.toml
//! # Run only the query group:
//! cargo bench --manifest-path crates/quarry-core/Cargo.toml -- query
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// The lib target is called `_quarry_core` (matching the Python extension
// module name).
use _quarry_core::indexer::normalize::{normalize_line, NormalizerState};
use _quarry_core::indexer::symbols::{extract_symbols, split_lines};
use _quarry_core::models::LanguageId;
use _quarry_core::query::definition::{DefinitionResolver, SourceView};
use _quarry_core::query::fuzzy::{is_lazy_match, LazyMatcher, ScorePattern};
use _quarry_core::query::search::{search_symbols, QueryOptions, SearchSettings};
use _quarry_core::store::{FileRegistry, SymbolStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn js_source(classes: usize) -> String {
    let mut text = String::new();
    for i in 0..classes {
        let parent = if i == 0 { "Base".to_string() } else { format!("Widget{}", i - 1) };
        text.push_str(&format!(
            "/**\n * Widget {i}.\n */\nclass Widget{i} extends {parent} {{\n    \
             constructor(options) {{\n        super(options);\n        // setup\n    }}\n\n    \
             render(target, opts = {{}}) {{\n        return `<div>${{this.label}}</div>`;\n    }}\n\n    \
             get label() {{\n        return 'widget {i}';\n    }}\n\n    \
             _update{i}(...args) {{\n        this.render(args[0]);\n    }}\n}}\n\n\
             export function helper{i}(value) {{\n    return value * {i};\n}}\n\n"
        ));
    }
    text
}

fn py_source(classes: usize) -> String {
    let mut text = String::new();
    for i in 0..classes {
        text.push_str(&format!(
            "class Model{i}(Base, metaclass=Meta):\n    \"\"\"Model {i}.\"\"\"\n\n    \
             def __init__(self, name):\n        self.name = name\n\n    \
             def save(self, *, force=False):\n        pass\n\n    \
             def _validate(self, data,\n                  strict=True):\n        return data\n\n\
             def load_{i}(path):\n    return Model{i}(path)\n\n"
        ));
    }
    text
}

fn build_store(classes: usize) -> SymbolStore {
    let mut store = SymbolStore::new();
    let text = js_source(classes);
    store.insert_file_symbols(extract_symbols(&text, "/ws/src/widgets.js", LanguageId::JavaScript, true));
    let text = py_source(classes);
    store.insert_file_symbols(extract_symbols(&text, "/ws/py/models.py", LanguageId::Python, true));
    store
}

// ---------------------------------------------------------------------------
// 1. Normalization
// ---------------------------------------------------------------------------

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    group.bench_function("plain_line", |b| {
        b.iter(|| {
            let mut state = NormalizerState::default();
            normalize_line(black_box("    const total = a + b;"), &mut state)
        });
    });

    group.bench_function("strings_and_comments", |b| {
        let line = r#"    call("a // b", 'c', `d ${e}`); /* note */ x = 1; // trailing"#;
        b.iter(|| {
            let mut state = NormalizerState::default();
            normalize_line(black_box(line), &mut state)
        });
    });

    group.bench_function("file_1000_lines", |b| {
        let text = js_source(50);
        let lines = split_lines(&text);
        b.iter(|| {
            let mut state = NormalizerState::default();
            for line in &lines {
                black_box(normalize_line(line, &mut state));
            }
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Fuzzy matching
// ---------------------------------------------------------------------------

fn bench_fuzzy(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuzzy");

    group.bench_function("one_shot_match", |b| {
        b.iter(|| is_lazy_match(black_box("UserServiceController"), black_box("usse")));
    });

    group.bench_function("compiled_match", |b| {
        let matcher = LazyMatcher::new("usse").unwrap();
        b.iter(|| matcher.is_match(black_box("UserServiceController")));
    });

    group.bench_function("compiled_reject", |b| {
        let matcher = LazyMatcher::new("abcd").unwrap();
        b.iter(|| matcher.is_match(black_box("axxbxxcxxdxxxxxxxxxx")));
    });

    group.bench_function("score", |b| {
        let pattern = ScorePattern::new("getla").unwrap();
        b.iter(|| pattern.score(black_box("getLayerNamesForRender")));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// 3. Extraction
// ---------------------------------------------------------------------------

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    for classes in [10usize, 100] {
        let js = js_source(classes);
        group.bench_with_input(BenchmarkId::new("javascript", classes), &js, |b, text| {
            b.iter(|| extract_symbols(black_box(text), "/ws/a.js", LanguageId::JavaScript, true));
        });
        group.bench_with_input(BenchmarkId::new("typescript", classes), &js, |b, text| {
            b.iter(|| extract_symbols(black_box(text), "/ws/a.ts", LanguageId::TypeScript, true));
        });
        let py = py_source(classes);
        group.bench_with_input(BenchmarkId::new("python", classes), &py, |b, text| {
            b.iter(|| extract_symbols(black_box(text), "/ws/a.py", LanguageId::Python, true));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// 4. Queries
// ---------------------------------------------------------------------------

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let settings = SearchSettings {
        max_results: 500,
        include_es_outside_workspace: false,
    };
    let files = FileRegistry::new();

    for classes in [100usize, 1000] {
        let store = build_store(classes);
        let all = QueryOptions {
            search_all: true,
            search_classes: true,
            ..QueryOptions::default()
        };

        group.bench_with_input(BenchmarkId::new("method_fuzzy", classes), &store, |b, store| {
            b.iter(|| search_symbols(store, &files, black_box("rend"), &all, settings));
        });

        group.bench_with_input(BenchmarkId::new("class_member", classes), &store, |b, store| {
            b.iter(|| search_symbols(store, &files, black_box("widget5.^render$"), &all, settings));
        });

        let inherited = QueryOptions {
            inherited_only: true,
            ..all.clone()
        };
        group.bench_with_input(BenchmarkId::new("inherited", classes), &store, |b, store| {
            b.iter(|| search_symbols(store, &files, black_box("widget99.lab"), &inherited, settings));
        });
    }

    let store = build_store(200);
    let text = js_source(200);
    let lines = split_lines(&text);
    let source = SourceView {
        file_path: "/ws/src/widgets.js",
        language: LanguageId::JavaScript,
        lines: &lines,
    };
    let resolver = DefinitionResolver::new(&store);
    // `this.render(args[0]);` inside the last class
    let row = lines
        .iter()
        .rposition(|l| l.contains("this.render("))
        .unwrap_or(0);
    let column = lines[row].find("render").unwrap_or(0) + 2;
    group.bench_function("definition_this_member", |b| {
        b.iter(|| resolver.resolve(&source, black_box(row), black_box(column)));
    });
    group.bench_function("definition_by_name", |b| {
        b.iter(|| resolver.by_name(&source, black_box("helper7")));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_normalize,
    bench_fuzzy,
    bench_extraction,
    bench_query
);
criterion_main!(benches);
