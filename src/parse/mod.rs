//! Shared Output Parsing
//!
//! Grammar-independent helpers used by the vendor utility parsers in
//! [`crate::adapters`].

pub mod blocks;

pub use blocks::{block_lines, parse_blocks, parse_kv_lines, value_of, Block};

/// Parse a size such as "480.00GB", "1.92 TB" or "512 bytes" into bytes.
///
/// Units are decimal (SI), as printed by the RAID and drive utilities.
pub fn parse_size_bytes(input: &str) -> Option<i64> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let split = compact
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(compact.len());
    let (number, unit) = compact.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: f64 = match unit.to_lowercase().as_str() {
        "" | "b" | "bytes" => 1.0,
        "kb" => 1e3,
        "mb" => 1e6,
        "gb" => 1e9,
        "tb" => 1e12,
        "pb" => 1e15,
        _ => return None,
    };

    Some((number * multiplier).round() as i64)
}

/// Insert colons into a bare hex MAC address ("b8cef6a1b2c3").
pub fn format_mac(raw: &str) -> String {
    let raw = raw.trim().to_lowercase();
    if raw.len() != 12 || raw.contains(':') || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
        return raw;
    }

    raw.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}
