use thiserror::Error;

/// Query-level failures. Everything else the engine recovers from locally
/// and reports as a [`crate::project::Warning`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Malformed input: expected an array of records, found {found}")]
    MalformedInput { found: &'static str },
    #[error("Malformed record at index {index}: expected an object, found {found}")]
    MalformedRecord { index: usize, found: &'static str },
    #[error("Key column '{0}' is not present in the projected table")]
    UnknownKeyColumn(String),
    #[error("Table has no rows to pivot")]
    NoRows,
    #[error("Invalid query options: {0}")]
    InvalidOptions(String),
}

pub type FrameResult<T> = Result<T, FrameError>;
