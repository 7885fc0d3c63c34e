//! Python bindings. Results cross the boundary as JSON-decoded objects.

use std::path::Path;

use parking_lot::Mutex;
use pyo3::prelude::*;
use serde::Serialize;

use crate::config::IndexConfig;
use crate::errors::QuarryError;
use crate::indexer::pipeline::ScanGeneration;
use crate::models::LanguageId;
use crate::query::fuzzy;
use crate::query::search::QueryOptions;
use crate::session::{QuerySession, RequestKind};
use crate::workspace::WorkspaceIndex;

fn to_py<T: Serialize>(py: Python<'_>, value: &T) -> PyResult<PyObject> {
    let text = serde_json::to_string(value).map_err(QuarryError::from)?;
    let json_module = py.import("json")?;
    Ok(json_module.call_method1("loads", (text,))?.unbind())
}

fn language(value: &str) -> PyResult<LanguageId> {
    LanguageId::parse(value)
        .ok_or_else(|| QuarryError::UnsupportedLanguage(value.to_string()).into())
}

#[pyclass(name = "WorkspaceIndex")]
pub struct PyWorkspaceIndex {
    inner: Mutex<WorkspaceIndex>,
    generation: ScanGeneration,
    session: QuerySession,
}

#[pymethods]
impl PyWorkspaceIndex {
    #[new]
    #[pyo3(signature = (workspace_folder=None, config_json=None))]
    fn new(workspace_folder: Option<String>, config_json: Option<&str>) -> PyResult<Self> {
        let mut config = match config_json {
            Some(text) => IndexConfig::from_json_str(text)?,
            None => IndexConfig::default(),
        };
        if let Some(folder) = workspace_folder {
            config.workspace_folder = Some(folder.into());
        }
        let index = WorkspaceIndex::new(config.with_env_overrides());
        let generation = index.generation();
        Ok(Self {
            inner: Mutex::new(index),
            generation,
            session: QuerySession::new(),
        })
    }

    /// Full rebuild; `None` when cancelled.
    fn rescan_all(&self, py: Python<'_>) -> PyResult<PyObject> {
        let report = py.allow_threads(|| self.inner.lock().rescan_all());
        to_py(py, &report)
    }

    fn rescan_file(&self, py: Python<'_>, path: &str) -> PyResult<PyObject> {
        let update = self.inner.lock().rescan_file(Path::new(path));
        to_py(py, &update)
    }

    fn sync_changed(&self, py: Python<'_>) -> PyResult<PyObject> {
        let report = py.allow_threads(|| self.inner.lock().sync_changed());
        to_py(py, &report)
    }

    /// Abandon an in-flight rescan. Does not wait for the index lock.
    fn cancel(&self) {
        self.generation.cancel();
    }

    fn reload_config(&self, path: &str) -> bool {
        self.inner.lock().reload_config(Path::new(path))
    }

    fn open_buffer(&self, path: &str, text: String) {
        self.inner.lock().open_buffer(path, text);
    }

    fn close_buffer(&self, path: &str) -> bool {
        self.inner.lock().close_buffer(path)
    }

    #[pyo3(signature = (text, options_json=None))]
    fn query(&self, py: Python<'_>, text: &str, options_json: Option<&str>) -> PyResult<PyObject> {
        let options: QueryOptions = match options_json {
            Some(raw) => serde_json::from_str(raw).map_err(QuarryError::from)?,
            None => QueryOptions::default(),
        };
        let found = self.inner.lock().query(text, &options)?;
        to_py(py, &found)
    }

    /// Search-as-you-type. Returns `None` when a newer query superseded this one.
    #[pyo3(signature = (text, options_json=None))]
    fn live_query(&self, py: Python<'_>, text: &str, options_json: Option<&str>) -> PyResult<PyObject> {
        let options: QueryOptions = match options_json {
            Some(raw) => serde_json::from_str(raw).map_err(QuarryError::from)?,
            None => QueryOptions::default(),
        };
        let found = py
            .allow_threads(|| {
                self.session
                    .debounced(RequestKind::Query, || self.inner.lock().query(text, &options))
            })
            .transpose()?;
        to_py(py, &found)
    }

    /// Hover preview: a debounced definition lookup, `None` when superseded.
    fn hover(&self, py: Python<'_>, path: &str, line: usize, column: usize) -> PyResult<PyObject> {
        let found = py
            .allow_threads(|| {
                self.session.debounced(RequestKind::Hover, || {
                    self.inner.lock().resolve_definition(path, line, column)
                })
            })
            .transpose()?;
        to_py(py, &found)
    }

    /// `None` when a newer definition request finished first.
    fn resolve_definition(
        &self,
        py: Python<'_>,
        path: &str,
        line: usize,
        column: usize,
    ) -> PyResult<PyObject> {
        let ticket = self.session.issue(RequestKind::Definition);
        let found = self.inner.lock().resolve_definition(path, line, column)?;
        to_py(py, &self.session.complete(ticket, found))
    }

    fn file_outline(&self, py: Python<'_>, path: &str) -> PyResult<PyObject> {
        to_py(py, &self.inner.lock().file_outline(path))
    }

    fn adjacent_symbol(
        &self,
        py: Python<'_>,
        path: &str,
        line: usize,
        forward: bool,
    ) -> PyResult<PyObject> {
        to_py(py, &self.inner.lock().adjacent_symbol(path, line, forward))
    }

    fn parents(&self, class_name: &str, language_id: &str) -> PyResult<Vec<String>> {
        Ok(self.inner.lock().parents(class_name, language(language_id)?))
    }

    fn subtypes(&self, class_name: &str, language_id: &str) -> PyResult<Vec<String>> {
        Ok(self.inner.lock().subtypes(class_name, language(language_id)?))
    }

    fn supertype_tree(&self, py: Python<'_>, class_name: &str, language_id: &str) -> PyResult<PyObject> {
        let tree = self.inner.lock().supertype_tree(class_name, language(language_id)?);
        to_py(py, &tree)
    }

    fn subtype_tree(&self, py: Python<'_>, class_name: &str, language_id: &str) -> PyResult<PyObject> {
        let tree = self.inner.lock().subtype_tree(class_name, language(language_id)?);
        to_py(py, &tree)
    }

    fn check_override_signatures(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &self.inner.lock().check_override_signatures())
    }

    fn lint_file(&self, py: Python<'_>, path: &str) -> PyResult<PyObject> {
        let found = self.inner.lock().lint_file(path)?;
        to_py(py, &found)
    }

    fn summary(&self, py: Python<'_>) -> PyResult<PyObject> {
        to_py(py, &self.inner.lock().summary())
    }
}

#[pyfunction]
pub fn is_lazy_match(candidate: &str, query: &str) -> bool {
    fuzzy::is_lazy_match(candidate, query)
}

#[pyfunction]
pub fn match_score(candidate: &str, query: &str) -> Option<i64> {
    fuzzy::match_score(candidate, query)
}
