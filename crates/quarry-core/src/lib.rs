//! Quarry core library: a regex-driven symbol index for JavaScript,
//! TypeScript and Python sources.
//!
//! The crate scans a source tree without a parser, keeps classes, members,
//! inheritance edges and free functions in an in-memory store, and answers
//! fuzzy symbol search, go-to-definition, type-hierarchy, override-signature
//! and lint queries against it. With the `python` feature it also builds the
//! `_quarry_core` extension module.

pub mod config;
pub mod errors;
pub mod indexer;
pub mod models;
pub mod query;
pub mod session;
pub mod store;
pub mod workspace;

#[cfg(feature = "python")]
pub mod python;

pub use config::IndexConfig;
pub use errors::{QuarryError, QuarryResult};
pub use workspace::WorkspaceIndex;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

// ---------------------------------------------------------------------------
// Top-level Python module: _quarry_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _quarry_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // -- Workspace handle ---------------------------------------------------
    m.add_class::<python::PyWorkspaceIndex>()?;

    // -- Query: guards ------------------------------------------------------
    m.add("MAX_QUERY_LENGTH", query::guards::MAX_QUERY_LENGTH)?;
    m.add("MAX_SEARCH_LIMIT", query::guards::MAX_SEARCH_LIMIT)?;
    m.add("MAX_HIERARCHY_DEPTH", query::guards::MAX_HIERARCHY_DEPTH)?;
    m.add("QUERY_DEBOUNCE_MS", query::guards::QUERY_DEBOUNCE_MS)?;
    m.add("HOVER_DEBOUNCE_MS", query::guards::HOVER_DEBOUNCE_MS)?;

    // -- Query: fuzzy matching ----------------------------------------------
    m.add_function(wrap_pyfunction!(python::is_lazy_match, m)?)?;
    m.add_function(wrap_pyfunction!(python::match_score, m)?)?;

    Ok(())
}
