use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the reconciliation, load, and query layers.
///
/// Per-source and per-row problems are normally contained by the pipeline and
/// only logged; these variants reach a caller when a whole call must abort.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to parse {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("I/O error on {}: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Stable machine-readable code for structured error output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::Parse { .. } => "PARSE_ERROR",
            Error::Schema(_) => "SCHEMA_ERROR",
            Error::UnknownMetric(_) => "UNKNOWN_METRIC",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Store(_) => "STORE_ERROR",
            Error::Io { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(Error::UnknownMetric("x".into()).code(), "UNKNOWN_METRIC");
        assert_eq!(Error::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(Error::parse("steps.csv", "bad").code(), "PARSE_ERROR");
    }

    #[test]
    fn test_store_error_from_rusqlite() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().starts_with("Store error:"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = Error::io(
            "/tmp/missing.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.csv"));
    }
}
