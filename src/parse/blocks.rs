//! Marker-delimited Key/Value Blocks
//!
//! Many vendor utilities print one record per device as
//!
//! ```text
//! Adapter ID:     0
//! Product:        1b4b-9230
//! Firmware version: 2.3.0.1077
//!
//! Adapter ID:     1
//! ...
//! ```
//!
//! A record starts at any line containing the marker and runs until the
//! first blank line (or end of input). Each line is split on its first
//! colon into a trimmed key and value; lines without a colon are skipped.
//! The marker line itself is part of the record.

use std::collections::BTreeMap;

/// One parsed record: key → value.
pub type Block = BTreeMap<String, String>;

/// Raw lines of every record started by `marker`, in input order.
pub fn block_lines<'a>(input: &'a str, marker: &str) -> Vec<Vec<&'a str>> {
    let lines: Vec<&str> = input.lines().collect();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(marker))
        .map(|(start, _)| {
            lines[start..]
                .iter()
                .take_while(|line| !line.trim().is_empty())
                .copied()
                .collect()
        })
        .collect()
}

/// Key/value pairs of a record's lines.
pub fn parse_kv_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Block {
    lines
        .into_iter()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Every record started by `marker`, in input order.
///
/// A marker immediately followed by a blank line yields an empty map when the
/// marker line has no colon; callers decide whether that means "no data".
pub fn parse_blocks(input: &str, marker: &str) -> Vec<Block> {
    block_lines(input, marker)
        .into_iter()
        .map(parse_kv_lines)
        .collect()
}

/// First non-empty value among `keys`.
pub fn value_of<'a>(block: &'a Block, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| block.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}
