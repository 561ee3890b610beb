//! Inventory Collection
//!
//! Sequences one collection pass over a [`Device`](crate::model::Device):
//! the baseline inventory first, then every component class through its
//! collectors, each behind its own fault isolation boundary, and finally the
//! device-wide defaults.
//!
//! # Example
//!
//! ```ignore
//! let action = InventoryAction::from_config(CollectorConfig::default());
//! let mut device = Device::default();
//! let summary = action.collect(&cancel, Some(&mut device), None).await?;
//! ```

mod action;
mod baseline;
mod collectors;
mod guard;

pub use action::{ClassOutcome, ClassReport, CollectionSummary, Fault, InventoryAction};
pub use baseline::absorb_baseline;
pub use collectors::Collectors;
pub use guard::{isolate, Guarded};
