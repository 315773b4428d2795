//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised while constructing or updating a called function
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    #[error("Invalid time range: [{start}, {end}]")]
    InvalidRange { start: i64, end: i64 },

    #[error("Cannot create a called function with symbol {0}")]
    InvalidSymbolType(String),

    #[error("Negative self time for {symbol}: {self_time}")]
    NegativeSelfTime { symbol: String, self_time: i64 },
}

/// Errors reported by an interval source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Interval source has been disposed")]
    Disposed,

    #[error("Unknown attribute handle: {0}")]
    UnknownAttribute(usize),
}

/// Errors raised while filling an in-memory interval source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error(transparent)]
    Range(FunctionError),

    #[error(transparent)]
    Source(SourceError),
}

/// Errors that can occur while querying a call stack
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Call stack depth {depth} is outside [1, {max_depth}]")]
    InvalidDepth { depth: u32, max_depth: u32 },

    #[error("Interval source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error(transparent)]
    Function(#[from] FunctionError),
}

/// Errors that can occur while merging aggregation nodes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Trying to merge call sites of different symbols: {expected} and {found}")]
    SymbolMismatch { expected: String, found: String },

    #[error("Trying to merge a {found} call site into a {expected} call site")]
    VariantMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Negative self time for {symbol}: {self_time}")]
    NegativeSelfTime { symbol: String, self_time: i64 },
}

/// Errors that abort a call graph run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallGraphError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Function(#[from] FunctionError),
}

/// Errors that can occur while reading CLI input files
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input at line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("Invalid interval data: {0}")]
    Interval(#[from] PushError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
