use std::path::PathBuf;

/// Errors surfaced by the retrieval core outside of the persistence glue.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The stop-word list could not be read. Fatal at startup.
    #[error("stop-word resource {path} unavailable: {source}")]
    MissingStopWords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A query string that could not be evaluated.
///
/// Engines recover from these locally: the error is logged and the caller sees an
/// empty result set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,
    #[error("operator at position {position} follows another operator: {tokens:?}")]
    ConsecutiveOperators { position: usize, tokens: Vec<String> },
    #[error("operator at position {position} has no operand: {tokens:?}")]
    DanglingOperator { position: usize, tokens: Vec<String> },
    #[error("operand at position {position} is not joined by an operator: {tokens:?}")]
    MissingOperator { position: usize, tokens: Vec<String> },
    #[error("not a proximity query: {0:?}")]
    Proximity(String),
}
