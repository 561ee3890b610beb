//! Structural Diff
//!
//! Walks two records of the same type field by field and emits one
//! [`Change`] per differing leaf. Nested records are recursed into; a nested
//! record present on only one side produces create (or delete) entries for
//! each of its leaves.

use std::collections::BTreeSet;

use serde::Serialize;

use super::record::{Field, Record, Value};
use crate::error::{Error, Result};

// =============================================================================
// Change Entries
// =============================================================================

/// Kind of a field-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    /// The field (or map entry / nested record) did not exist before
    Create,
    /// The field exists on both sides with different values
    Update,
    /// The field exists only on the existing side
    Delete,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "create"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// One field-level difference between an existing and a collected fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// Field names from the fragment root down to the leaf
    pub path: Vec<String>,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

impl Change {
    /// Path joined with dots, for logs and errors.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<Value>| v.as_ref().map_or("<none>".to_string(), |v| v.to_string());
        write!(
            f,
            "{} {}: {} -> {}",
            self.kind,
            self.path_string(),
            show(&self.from),
            show(&self.to)
        )
    }
}

// =============================================================================
// Diff
// =============================================================================

/// Compute the change list that turns `existing` into `collected`.
pub fn diff(existing: &dyn Record, collected: &dyn Record) -> Result<Vec<Change>> {
    let mut changes = Vec::new();
    let mut path = Vec::new();
    diff_records(&mut path, existing, collected, &mut changes)?;
    Ok(changes)
}

fn diff_error(path: &[String], reason: impl Into<String>) -> Error {
    Error::Diff {
        path: path.join("."),
        reason: reason.into(),
    }
}

fn diff_records(
    path: &mut Vec<String>,
    existing: &dyn Record,
    collected: &dyn Record,
    changes: &mut Vec<Change>,
) -> Result<()> {
    let from_fields = existing.fields();
    let to_fields = collected.fields();

    if from_fields.len() != to_fields.len() {
        return Err(diff_error(
            path,
            format!(
                "records expose {} and {} fields",
                from_fields.len(),
                to_fields.len()
            ),
        ));
    }

    for ((from_name, from), (to_name, to)) in from_fields.into_iter().zip(to_fields) {
        if from_name != to_name {
            return Err(diff_error(
                path,
                format!("field order mismatch: {} vs {}", from_name, to_name),
            ));
        }

        path.push(from_name.to_string());
        diff_field(path, from, to, changes)?;
        path.pop();
    }

    Ok(())
}

fn diff_field(
    path: &mut Vec<String>,
    from: Field<'_>,
    to: Field<'_>,
    changes: &mut Vec<Change>,
) -> Result<()> {
    match (from, to) {
        (Field::Value(a), Field::Value(b)) => {
            if a.type_name() != b.type_name() {
                return Err(diff_error(
                    path,
                    format!("type mismatch: {} vs {}", a.type_name(), b.type_name()),
                ));
            }
            if a != b {
                changes.push(Change {
                    kind: ChangeKind::Update,
                    path: path.clone(),
                    from: Some(a),
                    to: Some(b),
                });
            }
        }
        (Field::Map(a), Field::Map(b)) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                let (before, after) = (a.get(key), b.get(key));
                let kind = match (before, after) {
                    (Some(x), Some(y)) if x == y => continue,
                    (Some(x), Some(y)) if x.type_name() != y.type_name() => {
                        return Err(diff_error(
                            path,
                            format!("map entry '{}' changes type", key),
                        ));
                    }
                    (Some(_), Some(_)) => ChangeKind::Update,
                    (None, Some(_)) => ChangeKind::Create,
                    (Some(_), None) => ChangeKind::Delete,
                    (None, None) => continue,
                };
                let mut entry_path = path.clone();
                entry_path.push(key.clone());
                changes.push(Change {
                    kind,
                    path: entry_path,
                    from: before.cloned(),
                    to: after.cloned(),
                });
            }
        }
        (Field::Record(a), Field::Record(b)) => match (a, b) {
            (Some(a), Some(b)) => diff_records(path, a, b, changes)?,
            (None, Some(b)) => emit_all(path, b, ChangeKind::Create, changes),
            (Some(a), None) => emit_all(path, a, ChangeKind::Delete, changes),
            (None, None) => {}
        },
        (a, b) => {
            return Err(diff_error(
                path,
                format!("unsupported field pairing: {} vs {}", a.kind_name(), b.kind_name()),
            ));
        }
    }

    Ok(())
}

/// Emit a create (or delete) entry for every leaf of a one-sided record.
fn emit_all(path: &mut Vec<String>, record: &dyn Record, kind: ChangeKind, changes: &mut Vec<Change>) {
    let side = |v: Value| match kind {
        ChangeKind::Delete => (Some(v), None),
        _ => (None, Some(v)),
    };

    for (name, field) in record.fields() {
        path.push(name.to_string());
        match field {
            Field::Value(v) => {
                let (from, to) = side(v);
                changes.push(Change {
                    kind,
                    path: path.clone(),
                    from,
                    to,
                });
            }
            Field::Map(entries) => {
                for (key, v) in entries {
                    let (from, to) = side(v);
                    let mut entry_path = path.clone();
                    entry_path.push(key);
                    changes.push(Change {
                        kind,
                        path: entry_path,
                        from,
                        to,
                    });
                }
            }
            Field::Record(Some(nested)) => emit_all(path, nested, kind, changes),
            Field::Record(None) => {}
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Drive, Firmware};

    fn drive(serial: &str, vendor: &str, model: &str) -> Drive {
        let mut d = Drive::default();
        d.common.serial = serial.to_string();
        d.common.vendor = vendor.to_string();
        d.common.model = model.to_string();
        d
    }

    #[test]
    fn test_identical_records_have_no_changes() {
        let a = drive("S1", "Acme", "X1");
        assert!(diff(&a, &a.clone()).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_updates() {
        let a = drive("S1", "", "Old");
        let b = drive("S1", "Acme", "");

        let changes = diff(&a, &b).unwrap();
        assert_eq!(changes.len(), 2);

        assert_eq!(changes[0].path, vec!["Vendor"]);
        assert_eq!(changes[0].kind, ChangeKind::Update);
        assert_eq!(changes[0].from, Some(Value::String(String::new())));
        assert_eq!(changes[0].to, Some(Value::String("Acme".to_string())));

        assert_eq!(changes[1].path, vec!["Model"]);
        assert_eq!(changes[1].to, Some(Value::String(String::new())));
    }

    #[test]
    fn test_nested_record_create_and_delete() {
        let bare = drive("S1", "", "");
        let mut with_fw = bare.clone();
        with_fw.common.firmware = Some(Firmware {
            installed: "1.0".to_string(),
            ..Default::default()
        });

        let created = diff(&bare, &with_fw).unwrap();
        assert!(created.iter().all(|c| c.kind == ChangeKind::Create));
        assert!(created
            .iter()
            .any(|c| c.path == vec!["Firmware", "Installed"]
                && c.to == Some(Value::String("1.0".into()))));

        let deleted = diff(&with_fw, &bare).unwrap();
        assert!(!deleted.is_empty());
        assert!(deleted.iter().all(|c| c.kind == ChangeKind::Delete));
    }

    #[test]
    fn test_map_entries() {
        let mut a = drive("S1", "", "");
        a.common.metadata.insert("slot".into(), "1".into());
        a.common.metadata.insert("gone".into(), "x".into());

        let mut b = drive("S1", "", "");
        b.common.metadata.insert("slot".into(), "2".into());
        b.common.metadata.insert("new".into(), "y".into());

        let changes = diff(&a, &b).unwrap();
        let kinds: Vec<(String, ChangeKind)> = changes
            .iter()
            .map(|c| (c.path_string(), c.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("Metadata.gone".to_string(), ChangeKind::Delete),
                ("Metadata.new".to_string(), ChangeKind::Create),
                ("Metadata.slot".to_string(), ChangeKind::Update),
            ]
        );
    }

    struct Lopsided(bool);

    impl Record for Lopsided {
        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            if self.0 {
                vec![("Serial", Field::Value(Value::String("S".into())))]
            } else {
                vec![("Serial", Field::Value(Value::I32(1)))]
            }
        }

        fn field_mut(&mut self, _name: &str) -> Option<crate::merge::FieldMut<'_>> {
            None
        }
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let err = diff(&Lopsided(true), &Lopsided(false)).unwrap_err();
        assert!(matches!(err, Error::Diff { ref path, .. } if path == "Serial"));
    }
}
