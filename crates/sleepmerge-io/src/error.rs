use std::path::Path;

use thiserror::Error;

/// Result type local to sleepmerge-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The path is missing, unreadable or unwritable.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be tokenized (bad quoting, invalid UTF-8, ...).
    #[error("format error in {path} at line {line}: {message}")]
    Format {
        path: String,
        line: u64,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. })
    }

    /// Split a `csv::Error` into the I/O or format side of the taxonomy.
    pub(crate) fn from_csv(path: &str, err: csv::Error) -> Self {
        let message = err.to_string();
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Error::Io {
                path: path.to_string(),
                source,
            },
            _ => Error::Format {
                path: path.to_string(),
                line,
                message,
            },
        }
    }
}
