//! Node sub-line grammar
//!
//! `NodeName: <name>, Memory: <req> / <alloc> = <pct>%, CPU: <req> / <alloc> = <pct>%`
//!
//! Matching follows the greedy, backtracking semantics of
//! `^NodeName: (.+), Memory: (.+) / (.+) = .*, CPU: (.+) / (.+) = .*$`.
//! Separator candidates are tried right-to-left and a candidate is dropped
//! when the text after it cannot complete the line. The logged percentages
//! are never read; they are recomputed from the quantities.

use crate::error::AnalysisError;
use crate::models::NodeRecord;

const NAME_PREFIX: &str = "NodeName: ";
const MEMORY_SEPARATOR: &str = ", Memory: ";
const CPU_SEPARATOR: &str = ", CPU: ";
const RATIO_SEPARATOR: &str = " / ";
const PERCENT_SEPARATOR: &str = " = ";

/// Byte offsets of every occurrence of `needle`, overlapping ones included
fn positions<'a>(
    haystack: &'a str,
    needle: &'a str,
) -> impl DoubleEndedIterator<Item = usize> + 'a {
    haystack
        .as_bytes()
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, window)| *window == needle.as_bytes())
        .map(|(pos, _)| pos)
}

/// Split `<req> / <alloc> = <pct>%` into (req, alloc)
///
/// Both captures are non-empty and as long as the rest of the segment allows.
fn split_ratio(segment: &str) -> Option<(&str, &str)> {
    let percent_at = positions(segment, PERCENT_SEPARATOR).next_back()?;
    let ratio_at = positions(segment, RATIO_SEPARATOR)
        .rev()
        .find(|&pos| pos > 0 && pos + RATIO_SEPARATOR.len() < percent_at)?;
    Some((
        &segment[..ratio_at],
        &segment[ratio_at + RATIO_SEPARATOR.len()..percent_at],
    ))
}

/// Parse one node sub-line into a record
///
/// Returns `MalformedNodeLine` when the line does not follow the grammar and
/// `MalformedQuantity` when one of the four figures is not a quantity.
pub fn parse_node_line(line: &str) -> Result<NodeRecord, AnalysisError> {
    let malformed = |missing| AnalysisError::MalformedNodeLine {
        line: line.to_string(),
        missing,
    };

    let rest = line
        .strip_prefix(NAME_PREFIX)
        .ok_or_else(|| malformed("NodeName"))?;
    if rest.contains('\n') {
        return Err(malformed("single line"));
    }
    if positions(rest, CPU_SEPARATOR).next().is_none() {
        return Err(malformed("CPU"));
    }
    if positions(rest, MEMORY_SEPARATOR).next().is_none() {
        return Err(malformed("Memory"));
    }

    // the `.*` ahead of `, CPU: ` is greedy, so the last workable separator wins
    let (cpu_at, (cpu_requested, cpu_allocatable)) = positions(rest, CPU_SEPARATOR)
        .rev()
        .find_map(|pos| split_ratio(&rest[pos + CPU_SEPARATOR.len()..]).map(|ratio| (pos, ratio)))
        .ok_or_else(|| malformed("cpu requested / allocatable"))?;

    let mut named = false;
    for memory_at in positions(rest, MEMORY_SEPARATOR).rev() {
        if memory_at == 0 {
            continue;
        }
        named = true;
        let start = memory_at + MEMORY_SEPARATOR.len();
        if start > cpu_at {
            continue;
        }
        let Some((memory_requested, memory_allocatable)) = split_ratio(&rest[start..cpu_at])
        else {
            continue;
        };

        return Ok(NodeRecord {
            name: rest[..memory_at].to_string(),
            memory_allocatable: memory_allocatable.parse()?,
            memory_requested: memory_requested.parse()?,
            cpu_allocatable: cpu_allocatable.parse()?,
            cpu_requested: cpu_requested.parse()?,
        });
    }

    if named {
        Err(malformed("memory requested / allocatable"))
    } else {
        Err(malformed("node name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_line() {
        let node = parse_node_line(
            "NodeName: gke-pool-1-abcd, Memory: 1536Mi / 2.5Gi = 60%, CPU: 410m / 940m = 43%",
        )
        .unwrap();
        assert_eq!(node.name, "gke-pool-1-abcd");
        assert_eq!(node.memory_requested.value(), 1536 << 20);
        assert_eq!(node.memory_allocatable.value(), 2560 << 20);
        assert_eq!(node.cpu_requested.milli_value(), 410);
        assert_eq!(node.cpu_allocatable.milli_value(), 940);
    }

    #[test]
    fn test_logged_percent_is_ignored() {
        let node = parse_node_line(
            "NodeName: n1, Memory: 1Gi / 2Gi = 9999%, CPU: 1 / 4 = garbage",
        )
        .unwrap();
        assert_eq!(node.memory_percent().unwrap(), 50);
        assert_eq!(node.cpu_percent().unwrap(), 25);
    }

    #[test]
    fn test_name_containing_separator_text() {
        let node = parse_node_line(
            "NodeName: odd, CPU: name, Memory: 1Gi / 2Gi = 50%, CPU: 1 / 2 = 50%",
        )
        .unwrap();
        assert_eq!(node.name, "odd, CPU: name");
        assert_eq!(node.cpu_allocatable.milli_value(), 2000);
    }

    #[test]
    fn test_separator_text_in_trailing_percent() {
        let node =
            parse_node_line("NodeName: n1, Memory: 1Gi / 2Gi = 50%, CPU: 1 / 2 = 50%, CPU: x")
                .unwrap();
        assert_eq!(node.name, "n1");
        assert_eq!(node.memory_requested.value(), 1 << 30);
        assert_eq!(node.memory_allocatable.value(), 2 << 30);
        assert_eq!(node.cpu_requested.milli_value(), 1000);
        assert_eq!(node.cpu_allocatable.milli_value(), 2000);
    }

    #[test]
    fn test_memory_separator_in_memory_percent() {
        // the last ", Memory: " leaves nothing usable, so the name stops at the first
        let node = parse_node_line(
            "NodeName: n1, Memory: 1Gi / 2Gi = 50%, Memory: junk, CPU: 1 / 2 = 50%",
        )
        .unwrap();
        assert_eq!(node.name, "n1");
        assert_eq!(node.memory_allocatable.value(), 2 << 30);
    }

    #[test]
    fn test_overlapping_percent_separators() {
        // " = = " holds two overlapping " = " matches; the allocatable runs to the later one
        let err = parse_node_line("NodeName: n1, Memory: 1Gi / 2Gi = = 5%, CPU: 1 / 2 = 5%")
            .unwrap_err();
        match err {
            AnalysisError::MalformedQuantity { text, .. } => assert_eq!(text, "2Gi ="),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_parts() {
        let missing = |line: &str| match parse_node_line(line) {
            Err(AnalysisError::MalformedNodeLine { missing, .. }) => missing,
            other => panic!("expected malformed line, got {other:?}"),
        };
        assert_eq!(missing("Node: n1"), "NodeName");
        assert_eq!(missing("NodeName: n1, Memory: 1Gi / 2Gi = 50%"), "CPU");
        assert_eq!(missing("NodeName: n1, CPU: 1 / 2 = 50%"), "Memory");
        assert_eq!(
            missing("NodeName: , Memory: 1Gi / 2Gi = 50%, CPU: 1 / 2 = 50%"),
            "node name"
        );
        assert_eq!(
            missing("NodeName: n1, Memory: 1Gi = 50%, CPU: 1 / 2 = 50%"),
            "memory requested / allocatable"
        );
        assert_eq!(
            missing("NodeName: n1, Memory: 1Gi / 2Gi = 50%, CPU: 1 / 2"),
            "cpu requested / allocatable"
        );
        assert_eq!(
            missing("NodeName: n1, Memory: 1Gi / 2Gi = 50%, CPU: 1 / 2 = 50%\nmore"),
            "single line"
        );
    }

    #[test]
    fn test_bad_quantity_is_reported() {
        let err = parse_node_line("NodeName: n1, Memory: 1Gb / 2Gi = 50%, CPU: 1 / 2 = 50%")
            .unwrap_err();
        match err {
            AnalysisError::MalformedQuantity { text, .. } => assert_eq!(text, "1Gb"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
