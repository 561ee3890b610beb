//! Merge Engine
//!
//! Folds newly collected component fragments into the records already held
//! by a [`Device`](crate::model::Device) without regressing known data.
//!
//! # Pipeline
//!
//! ```text
//! join (by serial) → diff → vet → patch
//! ```
//!
//! - **join**: pairs collected fragments with existing ones by
//!   case-insensitive serial; unmatched collected fragments are dropped
//! - **diff**: structural, field-level change list ([`diff()`])
//! - **vet**: non-destructive filter ([`vet()`])
//! - **patch**: application to a staged copy ([`patch()`]), committed only
//!   when every change applied

mod diff;
mod patch;
#[cfg(test)]
mod proptest;
mod record;
mod vet;

pub use diff::{diff, Change, ChangeKind};
pub use patch::patch;
pub(crate) use record::impl_record;
pub use record::{AsField, Field, FieldMut, MapSlot, Record, RecordSlot, Value, ValueSlot};
pub use vet::{accepts, vet, OVERWRITABLE_FIELDS};

use tracing::{debug, trace};

use crate::error::Result;

// =============================================================================
// Single Record Merge
// =============================================================================

/// Merge `collected` into `existing`, returning the number of applied changes.
///
/// A diff or patch failure leaves `existing` untouched; a vet step that
/// declines every change is a successful merge of zero changes.
pub fn merge<R: Record + Clone>(existing: &mut R, collected: &R) -> Result<usize> {
    let changes = diff(&*existing, collected)?;
    commit(existing, changes)
}

/// Merge only the top-level `field` of `collected` into `existing`.
///
/// Every other difference between the two records is ignored, so a fragment
/// carrying one fact cannot disturb the rest of the record.
pub fn merge_field<R: Record + Clone>(existing: &mut R, collected: &R, field: &str) -> Result<usize> {
    let changes = diff(&*existing, collected)?
        .into_iter()
        .filter(|change| change.path.first().is_some_and(|name| name == field))
        .collect();
    commit(existing, changes)
}

/// Vet `changes` and apply the survivors to a copy of `existing`, swapping it
/// in only once every change applied.
fn commit<R: Record + Clone>(existing: &mut R, changes: Vec<Change>) -> Result<usize> {
    let total = changes.len();
    let accepted = vet(changes);

    for change in &accepted {
        trace!(change = %change, "applying change");
    }

    let mut staged = existing.clone();
    patch(&mut staged, &accepted)?;
    *existing = staged;

    if total > accepted.len() {
        debug!(
            declined = total - accepted.len(),
            applied = accepted.len(),
            "declined destructive changes"
        );
    }

    Ok(accepted.len())
}

// =============================================================================
// Serial Join
// =============================================================================

/// A multi-instance component identified by its serial number.
pub trait Identified {
    fn serial(&self) -> &str;
}

/// Outcome of merging a collected list into an existing list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSummary {
    /// Existing records that had a collected counterpart
    pub matched: usize,
    /// Total changes applied across all matched records
    pub applied: usize,
    /// Serials of collected fragments with no existing counterpart
    pub unmatched: Vec<String>,
}

fn same_serial(a: &str, b: &str) -> bool {
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Merge each collected fragment into every existing record with the same
/// serial (case-insensitive).
///
/// Collected fragments without a counterpart are reported in
/// [`JoinSummary::unmatched`] and are not appended. Empty serials never
/// join.
pub fn merge_by_serial<T: Record + Identified + Clone>(
    existing: &mut [T],
    collected: &[T],
) -> Result<JoinSummary> {
    let mut summary = JoinSummary::default();

    for fragment in collected {
        let mut found = false;

        for current in existing
            .iter_mut()
            .filter(|current| same_serial(current.serial(), fragment.serial()))
        {
            found = true;
            summary.matched += 1;
            summary.applied += merge(current, fragment)?;
        }

        if !found {
            debug!(serial = %fragment.serial(), "collected fragment has no existing counterpart, dropped");
            summary.unmatched.push(fragment.serial().to_string());
        }
    }

    Ok(summary)
}
