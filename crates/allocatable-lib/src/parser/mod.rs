//! Log chunk parsing
//!
//! Turns one captured log line into a [`ClusterRecord`]. Lines that are not
//! chunks at all come back as `MalformedChunk` so the caller can skip them;
//! node sub-lines that do not parse are collected in
//! [`ParsedChunk::skipped`] instead of silently disappearing.

mod chunk;
mod node;


pub use chunk::{split_chunk, ChunkParts};
pub use node::parse_node_line;

use crate::error::AnalysisError;
use crate::models::{ClusterRecord, NodeRecord};

/// Literal two-character separator between node sub-lines (`\` then `n`)
pub const NODE_LINE_SEPARATOR: &str = "\\n";

/// A node sub-line that was dropped while parsing a chunk
#[derive(Debug)]
pub struct SkippedNode {
    /// Position of the sub-line within the chunk body
    pub index: usize,
    pub line: String,
    pub error: AnalysisError,
}

/// Result of parsing a chunk whose outer grammar matched
#[derive(Debug)]
pub struct ParsedChunk {
    pub cluster: ClusterRecord,
    pub skipped: Vec<SkippedNode>,
}

/// Parse a chunk line into its cluster record
pub fn parse_chunk(line: &str) -> Result<ParsedChunk, AnalysisError> {
    let parts = split_chunk(line)?;

    let identifier = parts.identifier.trim();
    let identifier = (!identifier.is_empty()).then(|| identifier.to_string());

    let mut nodes = Vec::new();
    let mut skipped = Vec::new();
    for (index, sub_line) in parts.body.split(NODE_LINE_SEPARATOR).enumerate() {
        if sub_line.is_empty() {
            continue;
        }
        match parse_node_line(sub_line) {
            Ok(node) => nodes.push(node),
            Err(error) => skipped.push(SkippedNode {
                index,
                line: sub_line.to_string(),
                error,
            }),
        }
    }

    Ok(ParsedChunk {
        cluster: ClusterRecord::new(identifier, nodes),
        skipped,
    })
}

/// Render nodes in the chunk grammar, the inverse of [`parse_chunk`]
pub fn format_chunk(identifier: Option<&str>, nodes: &[NodeRecord]) -> String {
    let body = nodes
        .iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(NODE_LINE_SEPARATOR);
    format!("{{{}}} output: \"{}\"", identifier.unwrap_or(""), body)
}
