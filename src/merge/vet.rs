//! Non-destructive Change Filter
//!
//! Collected data may fill gaps but must never regress known-good data:
//!
//! 1. Deletes are always dropped
//! 2. Updates over a non-empty value are dropped, except for the top-level
//!    `Vendor` and `Model` fields when the collected value is non-empty
//! 3. Creates and updates over empty values are kept

use super::diff::{Change, ChangeKind};

/// Top-level fields a later, more specific utility may correct.
pub const OVERWRITABLE_FIELDS: [&str; 2] = ["Vendor", "Model"];

/// Filter a change list down to the changes that are safe to apply.
pub fn vet(changes: Vec<Change>) -> Vec<Change> {
    changes.into_iter().filter(accepts).collect()
}

/// Whether a single change survives the filter.
pub fn accepts(change: &Change) -> bool {
    match change.kind {
        ChangeKind::Delete => false,
        ChangeKind::Create => true,
        ChangeKind::Update => {
            if is_overwritable(&change.path) && change.to.as_ref().is_some_and(|v| !v.is_empty())
            {
                return true;
            }

            change.from.as_ref().map_or(true, |v| v.is_empty())
        }
    }
}

fn is_overwritable(path: &[String]) -> bool {
    matches!(path, [field] if OVERWRITABLE_FIELDS.contains(&field.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Value;

    fn update(path: &[&str], from: Value, to: Value) -> Change {
        Change {
            kind: ChangeKind::Update,
            path: path.iter().map(|s| s.to_string()).collect(),
            from: Some(from),
            to: Some(to),
        }
    }

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn test_deletes_are_dropped() {
        let change = Change {
            kind: ChangeKind::Delete,
            path: vec!["Metadata".into(), "slot".into()],
            from: Some(s("1")),
            to: None,
        };
        assert!(vet(vec![change]).is_empty());
    }

    #[test]
    fn test_creates_are_kept() {
        let change = Change {
            kind: ChangeKind::Create,
            path: vec!["Firmware".into(), "Installed".into()],
            from: None,
            to: Some(s("1.0")),
        };
        assert_eq!(vet(vec![change]).len(), 1);
    }

    #[test]
    fn test_updates_over_non_empty_are_dropped() {
        assert!(!accepts(&update(&["Description"], s("SSD"), s("Disk"))));
        assert!(!accepts(&update(&["Description"], s("SSD"), s(""))));
        assert!(!accepts(&update(&["CapacityBytes"], Value::I64(10), Value::I64(20))));
        assert!(!accepts(&update(&["Slot"], Value::I32(-3), Value::I32(0))));
    }

    #[test]
    fn test_updates_over_empty_are_kept() {
        assert!(accepts(&update(&["Description"], s(""), s("Disk"))));
        assert!(accepts(&update(&["CapacityBytes"], Value::I64(0), Value::I64(20))));
    }

    #[test]
    fn test_untracked_types_never_block() {
        assert!(accepts(&update(&["Oem"], Value::Bool(true), Value::Bool(false))));
        assert!(accepts(&update(&["SizeBytes"], Value::U64(512), Value::U64(0))));
    }

    #[test]
    fn test_vendor_and_model_may_be_corrected() {
        assert!(accepts(&update(&["Vendor"], s("ATA"), s("Micron"))));
        assert!(accepts(&update(&["Model"], s("Generic"), s("5200"))));

        // Never cleared by an empty collected value
        assert!(!accepts(&update(&["Model"], s("Old"), s(""))));

        // Only the top-level fields qualify
        assert!(!accepts(&update(&["Firmware", "Vendor"], s("a"), s("b"))));
    }
}
