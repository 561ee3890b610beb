//! Vendor Name Canonicalization
//!
//! Utilities and DMI tables spell the same vendor many ways ("Dell Inc.",
//! "DELL", "Super Micro Computer, Inc."). Everything that dispatches on a
//! vendor works with the canonical key returned by [`canonical_vendor`].
//!
//! The tables are built once per process and never mutated.

use std::collections::HashMap;

use once_cell::sync::Lazy;

pub const DELL: &str = "dell";
pub const SUPERMICRO: &str = "supermicro";
pub const HPE: &str = "hpe";
pub const LENOVO: &str = "lenovo";
pub const QUANTA: &str = "quanta";
pub const ASROCKRACK: &str = "asrockrack";
pub const GIGABYTE: &str = "gigabyte";
pub const INTEL: &str = "intel";
pub const MELLANOX: &str = "mellanox";
pub const BROADCOM: &str = "broadcom";
pub const MARVELL: &str = "marvell";
pub const MICRON: &str = "micron";
pub const SAMSUNG: &str = "samsung";
pub const TOSHIBA: &str = "toshiba";
pub const SEAGATE: &str = "seagate";
pub const WESTERN_DIGITAL: &str = "westerndigital";

/// Known spellings (lowercased) → canonical key.
static VENDOR_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("dell", DELL),
        ("dell inc.", DELL),
        ("dell inc", DELL),
        ("dell emc", DELL),
        ("supermicro", SUPERMICRO),
        ("super micro", SUPERMICRO),
        ("super micro computer", SUPERMICRO),
        ("super micro computer, inc.", SUPERMICRO),
        ("smc", SUPERMICRO),
        ("hpe", HPE),
        ("hp", HPE),
        ("hewlett packard enterprise", HPE),
        ("hewlett-packard", HPE),
        ("lenovo", LENOVO),
        ("quanta", QUANTA),
        ("quanta cloud technology inc.", QUANTA),
        ("qct", QUANTA),
        ("asrockrack", ASROCKRACK),
        ("asrock rack", ASROCKRACK),
        ("asrock", ASROCKRACK),
        ("gigabyte", GIGABYTE),
        ("giga computing", GIGABYTE),
        ("intel", INTEL),
        ("intel corporation", INTEL),
        ("intel corp.", INTEL),
        ("mellanox", MELLANOX),
        ("mellanox technologies", MELLANOX),
        ("nvidia", MELLANOX),
        ("broadcom", BROADCOM),
        ("broadcom / lsi", BROADCOM),
        ("lsi", BROADCOM),
        ("lsi logic", BROADCOM),
        ("lsi logic / symbios logic", BROADCOM),
        ("avago", BROADCOM),
        ("avago technologies", BROADCOM),
        ("marvell", MARVELL),
        ("marvell technology group ltd.", MARVELL),
        ("micron", MICRON),
        ("micron technology", MICRON),
        ("micron technology inc", MICRON),
        ("samsung", SAMSUNG),
        ("samsung electronics co ltd", SAMSUNG),
        ("toshiba", TOSHIBA),
        ("kioxia", TOSHIBA),
        ("seagate", SEAGATE),
        ("western digital", WESTERN_DIGITAL),
        ("wdc", WESTERN_DIGITAL),
    ])
});

/// Model-name prefixes that identify the drive vendor when the utility
/// reports a generic vendor such as "ATA".
static DRIVE_MODEL_PREFIXES: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("micron", MICRON),
        ("mtfd", MICRON),
        ("samsung", SAMSUNG),
        ("mz", SAMSUNG),
        ("intel", INTEL),
        ("ssdsc", INTEL),
        ("toshiba", TOSHIBA),
        ("kxg", TOSHIBA),
        ("st", SEAGATE),
        ("wdc", WESTERN_DIGITAL),
    ]
});

/// Canonical vendor key: lowercased, trimmed and alias-collapsed.
///
/// Names missing from the alias table come back lowercased and trimmed.
pub fn canonical_vendor(name: &str) -> String {
    let normalized = name.trim().to_lowercase();
    VENDOR_ALIASES
        .get(normalized.as_str())
        .map(|v| v.to_string())
        .unwrap_or(normalized)
}

/// Best-effort vendor key derived from a drive model string.
pub fn vendor_from_drive_model(model: &str) -> Option<&'static str> {
    let normalized = model.trim().to_lowercase();
    let normalized = normalized.replace('_', " ");
    DRIVE_MODEL_PREFIXES
        .iter()
        .find(|(prefix, _)| normalized.starts_with(prefix))
        .map(|(_, vendor)| *vendor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_vendor_collapses_aliases() {
        assert_eq!(canonical_vendor("Dell Inc."), DELL);
        assert_eq!(canonical_vendor("  DELL  "), DELL);
        assert_eq!(canonical_vendor("Super Micro Computer, Inc."), SUPERMICRO);
        assert_eq!(canonical_vendor("LSI Logic / Symbios Logic"), BROADCOM);
        assert_eq!(canonical_vendor("Mellanox Technologies"), MELLANOX);
    }

    #[test]
    fn test_unknown_vendor_is_lowercased() {
        assert_eq!(canonical_vendor("Nonexistent-OEM "), "nonexistent-oem");
        assert_eq!(canonical_vendor(""), "");
    }

    #[test]
    fn test_vendor_from_drive_model() {
        assert_eq!(vendor_from_drive_model("Micron_5200_MTFDDAK480TDN"), Some(MICRON));
        assert_eq!(vendor_from_drive_model("MTFDDAK480TDN"), Some(MICRON));
        assert_eq!(vendor_from_drive_model("SAMSUNG MZ7LH480HAHQ"), Some(SAMSUNG));
        assert_eq!(vendor_from_drive_model("QEMU HARDDISK"), None);
    }
}
