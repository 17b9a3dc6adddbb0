//! Error taxonomy for detection and normalization.
//!
//! Only [`QueryError`] ever reaches the orchestrator. [`ProbeError`] means
//! "tool absent" and [`Defect`] values are absorbed by the adapters and
//! logged.

use thiserror::Error;

use crate::ports::CommandError;

/// Presence probe failure. Expected on most hosts, never fatal.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("{tool} not found: {reason}")]
    ToolNotFound { tool: String, reason: String },
}

/// Hard adapter failure, surfaced as the error envelope.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The tool could not be run, exited non-zero or timed out.
    #[error("{tool} query failed: {source}")]
    Invocation {
        tool: String,
        #[source]
        source: CommandError,
    },

    /// The tool ran but its output could not be used at all.
    #[error("{tool} returned unusable output: {reason}")]
    InvalidOutput { tool: String, reason: String },
}

/// A recoverable problem absorbed by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Defect {
    /// A delimited line did not carry enough fields and was skipped.
    #[error("line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A field was not numeric and was replaced by 0.
    #[error("field `{field}` is not numeric ({raw:?}), using 0")]
    ParseDefect { field: &'static str, raw: String },

    /// The AMD metric query failed; static data was used alone.
    #[error("{tool} metric data unavailable: {reason}")]
    PartialDataUnavailable { tool: String, reason: String },

    /// A static entry had no usable device index and was dropped.
    #[error("entry {position} has no usable device index")]
    UnresolvedIndex { position: usize },

    /// A later entry repeated an index already emitted and was dropped.
    #[error("entry {position} repeats device index {index}")]
    DuplicateIndex { index: u32, position: usize },
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}
