//! Error types for trace reading

use thiserror::Error;

/// Failures that make a trace unreadable
///
/// These abort a run. Content problems in a readable trace are reported by
/// the checker instead.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace is empty: no header line found")]
    MissingHeader,

    #[error("malformed trace header: {0}")]
    MalformedHeader(#[source] serde_json::Error),

    #[error("malformed instruction record at line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Trace-info record that names no usable generator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("reserved generator value")]
    Reserved,

    #[error("unknown trace generator '{0}'")]
    Unknown(String),
}
