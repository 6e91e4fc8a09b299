//! Outer chunk grammar
//!
//! A chunk is one log line of the form `{<identifier>} output: "<body>"`.
//! Matching follows the greedy semantics of `^\{.*\}\s*output:\s*"(.*)"$`:
//! the identifier runs to the right-most `}` that is followed by the
//! `output: "` marker, and the body runs to the final `"` of the line.
//! Neither may contain a line break; only the whitespace around the marker
//! can.

use crate::error::{AnalysisError, ChunkMismatch};

const OUTPUT_MARKER: &str = "output:";

/// Borrowed pieces of a chunk line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParts<'a> {
    /// Text between the outer braces, untrimmed
    pub identifier: &'a str,
    /// Text between the quotes, still containing literal `\n` separators
    pub body: &'a str,
}

/// Whitespace as matched by `\s` in the capture tooling's regex dialect
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Split a line into identifier and body, or report which part is missing
pub fn split_chunk(line: &str) -> Result<ChunkParts<'_>, AnalysisError> {
    let mismatch = |reason| AnalysisError::MalformedChunk { reason };

    let rest = line
        .strip_prefix('{')
        .ok_or_else(|| mismatch(ChunkMismatch::MissingOpenBrace))?;

    let mut saw_marker = false;
    let mut saw_newline = false;
    for (pos, _) in rest.rmatch_indices('}') {
        let after = rest[pos + 1..].trim_start_matches(is_space);
        let Some(after) = after.strip_prefix(OUTPUT_MARKER) else {
            continue;
        };
        let Some(quoted) = after.trim_start_matches(is_space).strip_prefix('"') else {
            continue;
        };
        saw_marker = true;
        let Some(body) = quoted.strip_suffix('"') else {
            continue;
        };
        let identifier = &rest[..pos];
        if identifier.contains('\n') || body.contains('\n') {
            saw_newline = true;
            continue;
        }
        return Ok(ChunkParts { identifier, body });
    }

    if saw_newline {
        Err(mismatch(ChunkMismatch::EmbeddedNewline))
    } else if saw_marker {
        Err(mismatch(ChunkMismatch::UnterminatedBody))
    } else {
        Err(mismatch(ChunkMismatch::MissingOutputMarker))
    }
}
