//! Property-Based Tests for the Merge Engine
//!
//! # Test Properties
//!
//! 1. **Non-destructive**: known non-empty values survive any merge
//! 2. **Gap filling**: empty values take the collected value
//! 3. **Vendor/Model override**: a non-empty collected value always wins
//! 4. **Idempotence**: merging the same fragment twice applies nothing new
//! 5. **Join**: fragments pair by case-insensitive serial, the rest are reported

#![cfg(test)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use super::{merge, merge_by_serial};
use crate::model::{Common, Drive, Firmware};

// =============================================================================
// Property Strategies
// =============================================================================

/// Mostly short words, often empty.
fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z]{1,4}"]
}

/// Serials from a tiny alphabet so joins actually collide.
fn serial_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-cA-C]{1,2}"]
}

fn metadata_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-c]", text_strategy(), 0..3)
}

fn firmware_strategy() -> impl Strategy<Value = Option<Firmware>> {
    prop::option::of((text_strategy(), text_strategy(), metadata_strategy()).prop_map(
        |(installed, available, metadata)| Firmware {
            installed,
            available,
            metadata,
        },
    ))
}

fn common_strategy() -> impl Strategy<Value = Common> {
    (
        text_strategy(),
        text_strategy(),
        serial_strategy(),
        text_strategy(),
        text_strategy(),
        any::<bool>(),
        firmware_strategy(),
        metadata_strategy(),
    )
        .prop_map(
            |(vendor, model, serial, description, product_name, oem, firmware, metadata)| Common {
                vendor,
                model,
                serial,
                description,
                product_name,
                oem,
                firmware,
                metadata,
            },
        )
}

fn drive_strategy() -> impl Strategy<Value = Drive> {
    (
        common_strategy(),
        text_strategy(),
        text_strategy(),
        prop_oneof![Just(0i64), 1i64..4_000_000_000_000],
        text_strategy(),
        prop::collection::btree_map("[a-c]", any::<bool>(), 0..3),
    )
        .prop_map(
            |(common, protocol, logical_name, capacity_bytes, wwn, capabilities)| Drive {
                common,
                protocol,
                logical_name,
                capacity_bytes,
                wwn,
                capabilities,
                ..Default::default()
            },
        )
}

fn kept_or_filled(before: &str, collected: &str, after: &str) -> bool {
    if before.is_empty() {
        after == collected
    } else {
        after == before
    }
}

// =============================================================================
// Single Record Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_protected_fields_are_kept_or_filled(existing in drive_strategy(), collected in drive_strategy()) {
        let mut merged = existing.clone();
        merge(&mut merged, &collected).unwrap();

        prop_assert!(kept_or_filled(&existing.common.serial, &collected.common.serial, &merged.common.serial));
        prop_assert!(kept_or_filled(&existing.common.description, &collected.common.description, &merged.common.description));
        prop_assert!(kept_or_filled(&existing.common.product_name, &collected.common.product_name, &merged.common.product_name));
        prop_assert!(kept_or_filled(&existing.protocol, &collected.protocol, &merged.protocol));
        prop_assert!(kept_or_filled(&existing.logical_name, &collected.logical_name, &merged.logical_name));
        prop_assert!(kept_or_filled(&existing.wwn, &collected.wwn, &merged.wwn));

        if existing.capacity_bytes != 0 {
            prop_assert_eq!(merged.capacity_bytes, existing.capacity_bytes);
        } else {
            prop_assert_eq!(merged.capacity_bytes, collected.capacity_bytes);
        }
    }

    #[test]
    fn prop_vendor_and_model_follow_non_empty_collected(existing in drive_strategy(), collected in drive_strategy()) {
        let mut merged = existing.clone();
        merge(&mut merged, &collected).unwrap();

        for (before, after, offered) in [
            (&existing.common.vendor, &merged.common.vendor, &collected.common.vendor),
            (&existing.common.model, &merged.common.model, &collected.common.model),
        ] {
            if offered.is_empty() {
                prop_assert_eq!(after, before);
            } else {
                prop_assert_eq!(after, offered);
            }
        }
    }

    #[test]
    fn prop_map_entries_are_never_removed(existing in drive_strategy(), collected in drive_strategy()) {
        let mut merged = existing.clone();
        merge(&mut merged, &collected).unwrap();

        for (key, value) in &existing.common.metadata {
            let after = merged.common.metadata.get(key);
            prop_assert!(after.is_some());
            if !value.is_empty() {
                prop_assert_eq!(after, Some(value));
            }
        }

        let keys: BTreeSet<&String> = existing.capabilities.keys().collect();
        for key in keys {
            prop_assert!(merged.capabilities.contains_key(key));
        }
    }

    #[test]
    fn prop_known_firmware_survives(existing in drive_strategy(), collected in drive_strategy()) {
        let mut merged = existing.clone();
        merge(&mut merged, &collected).unwrap();

        match (&existing.common.firmware, &collected.common.firmware) {
            (Some(before), _) => {
                let after = merged.common.firmware.as_ref().unwrap();
                if !before.installed.is_empty() {
                    prop_assert_eq!(&after.installed, &before.installed);
                }
            }
            (None, Some(offered)) => prop_assert_eq!(merged.common.firmware.as_ref(), Some(offered)),
            (None, None) => prop_assert!(merged.common.firmware.is_none()),
        }
    }

    #[test]
    fn prop_merge_is_idempotent(existing in drive_strategy(), collected in drive_strategy()) {
        let mut merged = existing.clone();
        merge(&mut merged, &collected).unwrap();
        let once = merged.clone();

        let applied = merge(&mut merged, &collected).unwrap();

        prop_assert_eq!(applied, 0);
        prop_assert_eq!(merged, once);
    }

    #[test]
    fn prop_empty_fragment_only_touches_flags(existing in drive_strategy()) {
        let mut merged = existing.clone();
        merge(&mut merged, &Drive::default()).unwrap();

        // Booleans never count as known data; missing map entries are deletes
        let mut expected = existing.clone();
        expected.common.oem = false;
        prop_assert_eq!(merged, expected);
    }
}

// =============================================================================
// Join Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_join_reports_exactly_the_unmatched(
        existing in prop::collection::vec(drive_strategy(), 0..5),
        collected in prop::collection::vec(drive_strategy(), 0..5),
    ) {
        let known: BTreeSet<String> = existing
            .iter()
            .map(|d| d.common.serial.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let expected_unmatched: Vec<String> = collected
            .iter()
            .map(|d| d.common.serial.clone())
            .filter(|s| s.is_empty() || !known.contains(&s.to_lowercase()))
            .collect();

        let expected_matched: usize = collected
            .iter()
            .filter(|c| !c.common.serial.is_empty())
            .map(|c| {
                existing
                    .iter()
                    .filter(|e| e.common.serial.to_lowercase() == c.common.serial.to_lowercase())
                    .count()
            })
            .sum();

        let mut merged = existing.clone();
        let summary = merge_by_serial(&mut merged, &collected).unwrap();

        prop_assert_eq!(summary.unmatched, expected_unmatched);
        prop_assert_eq!(summary.matched, expected_matched);
        prop_assert_eq!(merged.len(), existing.len());
    }

    #[test]
    fn prop_join_leaves_serial_less_records_alone(
        existing in drive_strategy(),
        collected in prop::collection::vec(drive_strategy(), 0..5),
    ) {
        let mut record = existing.clone();
        record.common.serial.clear();

        let mut merged = vec![record.clone()];
        merge_by_serial(&mut merged, &collected).unwrap();

        prop_assert_eq!(&merged[0], &record);
    }
}
