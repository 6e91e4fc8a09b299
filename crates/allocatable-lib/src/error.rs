//! Error kinds produced by the analysis engine
//!
//! Parsing errors (`MalformedChunk`, `MalformedNodeLine`, `MalformedQuantity`)
//! and `ZeroAllocatable` are recoverable: callers skip the offending chunk or
//! node and keep going. Configuration and input-source errors are fatal to
//! whichever driver hit them.

use crate::models::Resource;
use std::fmt;
use thiserror::Error;

/// Why a chunk did not match the outer `{...} output: "..."` grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMismatch {
    /// Line does not start with `{`
    MissingOpenBrace,
    /// No `}` followed by `output: "` was found
    MissingOutputMarker,
    /// The quoted body is not terminated by `"` at end of line
    UnterminatedBody,
    /// Identifier or body spans a real line break
    EmbeddedNewline,
}

impl fmt::Display for ChunkMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChunkMismatch::MissingOpenBrace => "line does not start with '{'",
            ChunkMismatch::MissingOutputMarker => "no '} output: \"' marker",
            ChunkMismatch::UnterminatedBody => "output body is not terminated by '\"'",
            ChunkMismatch::EmbeddedNewline => "identifier or body spans a line break",
        };
        f.write_str(s)
    }
}

/// Why a quantity string was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityFault {
    Empty,
    InvalidNumber,
    UnknownSuffix,
    Overflow,
}

impl fmt::Display for QuantityFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuantityFault::Empty => "empty quantity",
            QuantityFault::InvalidNumber => "invalid number",
            QuantityFault::UnknownSuffix => "unknown suffix",
            QuantityFault::Overflow => "value out of range",
        };
        f.write_str(s)
    }
}

/// Errors returned by the analysis engine
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed chunk: {reason}")]
    MalformedChunk { reason: ChunkMismatch },

    #[error("malformed node line (missing {missing}): {line}")]
    MalformedNodeLine { line: String, missing: &'static str },

    #[error("malformed quantity {text:?}: {reason}")]
    MalformedQuantity { text: String, reason: QuantityFault },

    #[error("{resource} allocatable is zero")]
    ZeroAllocatable { resource: Resource },

    #[error("{resource} threshold {value} is outside [0, 100)")]
    InvalidThreshold { resource: Resource, value: u64 },

    #[error("invalid reservation brackets: {0}")]
    InvalidBrackets(String),

    #[error("line {line_number} exceeds the {limit} byte line limit")]
    LineTooLong { line_number: u64, limit: usize },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("threshold sweep task failed: {0}")]
    Sweep(String),
}

impl AnalysisError {
    /// Returns true for errors that only invalidate a single chunk or node
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::MalformedChunk { .. }
                | AnalysisError::MalformedNodeLine { .. }
                | AnalysisError::MalformedQuantity { .. }
                | AnalysisError::ZeroAllocatable { .. }
        )
    }
}
