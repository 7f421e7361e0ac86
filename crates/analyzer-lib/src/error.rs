//! Error types for the analyzer library

use std::path::PathBuf;

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors produced by the analysis pipeline
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The run's data directory does not exist
    #[error("input directory {0} does not exist")]
    MissingDataDir(PathBuf),

    /// The pod event log yielded no parsable resource requests
    #[error("no valid CPU or memory request data found in the event timeline")]
    NoPodRequests,

    /// An operation required data that was never loaded or is empty
    #[error("{0} data is not loaded or empty")]
    EmptyTable(&'static str),

    /// A timestamp cell could not be parsed
    #[error("unparsable timestamp: {0}")]
    Timestamp(String),

    /// A numeric cell could not be parsed
    #[error("unparsable numeric value: {0:?}")]
    Number(String),

    /// Chart rendering failed
    #[error("chart rendering failed: {0}")]
    Plot(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
