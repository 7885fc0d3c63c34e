//! Error types for the Quarry core library.

#[cfg(feature = "python")]
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;

/// Top-level error enum for the Quarry core library.
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Walk error: {0}")]
    Walk(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ignore::Error> for QuarryError {
    fn from(err: ignore::Error) -> Self {
        QuarryError::Walk(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<QuarryError> for PyErr {
    fn from(err: QuarryError) -> PyErr {
        match &err {
            QuarryError::Io(_) => PyIOError::new_err(err.to_string()),
            QuarryError::Config(_)
            | QuarryError::Query(_)
            | QuarryError::UnsupportedLanguage(_)
            | QuarryError::Json(_) => PyValueError::new_err(err.to_string()),
            QuarryError::Walk(_) => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

pub type QuarryResult<T> = Result<T, QuarryError>;
