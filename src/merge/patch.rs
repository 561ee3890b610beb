//! Change Application
//!
//! Applies a change list to a record in place, walking each change path
//! through [`Record::field_mut`]. Absent nested records are materialised with
//! their defaults when a change addresses one of their fields.

use super::diff::{Change, ChangeKind};
use super::record::{FieldMut, Record};
use crate::error::{Error, Result};

/// Apply every change to `target`, stopping at the first failure.
///
/// Changes before the failing one stay applied. Callers needing all or
/// nothing patch a copy, as [`merge`](super::merge()) does.
pub fn patch(target: &mut dyn Record, changes: &[Change]) -> Result<()> {
    for change in changes {
        apply(target, &change.path, change)?;
    }
    Ok(())
}

fn patch_error(change: &Change, reason: impl Into<String>) -> Error {
    Error::Patch {
        path: change.path_string(),
        reason: reason.into(),
    }
}

fn apply(record: &mut dyn Record, path: &[String], change: &Change) -> Result<()> {
    let (name, rest) = path
        .split_first()
        .ok_or_else(|| patch_error(change, "empty path"))?;

    let field = record
        .field_mut(name)
        .ok_or_else(|| patch_error(change, format!("unknown field '{}'", name)))?;

    match (field, rest) {
        (FieldMut::Value(slot), []) => {
            if change.kind == ChangeKind::Delete {
                slot.clear();
                return Ok(());
            }
            let value = change
                .to
                .clone()
                .ok_or_else(|| patch_error(change, "missing target value"))?;
            slot.set(value).map_err(|reason| patch_error(change, reason))
        }
        (FieldMut::Map(map), [key]) => {
            if change.kind == ChangeKind::Delete {
                map.remove(key);
                return Ok(());
            }
            let value = change
                .to
                .clone()
                .ok_or_else(|| patch_error(change, "missing target value"))?;
            map.insert(key, value)
                .map_err(|reason| patch_error(change, reason))
        }
        (FieldMut::Record(slot), rest) if !rest.is_empty() => {
            if change.kind == ChangeKind::Delete && slot.is_absent() {
                return Ok(());
            }
            apply(slot.get_or_insert(), rest, change)
        }
        _ => Err(patch_error(change, "path does not address a patchable field")),
    }
}
