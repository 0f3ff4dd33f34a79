use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    /// The export header lacks a column the normalizer needs.
    #[error("missing column '{column}' in {path}")]
    MissingColumn { path: String, column: String },

    #[error(transparent)]
    Io(#[from] sleepmerge_io::Error),
}
