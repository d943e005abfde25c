use thiserror::Error;

/// Errors surfaced by index construction and query execution.
///
/// A query term missing from the dictionary is not represented here; it simply
/// contributes nothing to the ranking.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input from outside the index: missing directory, a document file
    /// whose name is not a document id, an unreadable query file.
    #[error("input error: {0}")]
    Input(String),

    /// The index or the builder is in a state that can only come from a bug or
    /// a corrupt store.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Error::Input(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }
}
