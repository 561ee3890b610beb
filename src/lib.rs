//! hwinventory - Server Hardware Inventory Collection & Merge Engine
//!
//! Collects component facts (drives, NICs, BMC, BIOS, CPLD, storage
//! controllers) from independent vendor utilities and folds them into one
//! [`Device`] record without destroying previously known good data.
//!
//! # Architecture
//!
//! ```text
//! Collectors (adapters) → Orchestrator (inventory) → Merge Engine (merge)
//!          ▲                       │
//!          └──── Resolver ─────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Vendor utility adapters implementing domain ports
//! - [`config`] - Collector configuration
//! - [`domain`] - Capability ports (collector and updater traits)
//! - [`error`] - Error types
//! - [`executor`] - Run-and-capture of external utilities
//! - [`inventory`] - Collection orchestrator and fault isolation
//! - [`merge`] - Diff, vet and patch of component records
//! - [`model`] - Device and component records
//! - [`parse`] - Shared output parsing helpers
//! - [`resolver`] - Vendor and class dispatch of collectors and updaters

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod merge;
pub mod model;
pub mod parse;
pub mod resolver;

// Re-export commonly used types
pub use config::CollectorConfig;
pub use error::{Error, Result};
pub use inventory::{ClassOutcome, CollectionSummary, Collectors, InventoryAction};
pub use merge::{merge, merge_by_serial, merge_field, JoinSummary};
pub use model::{ComponentKind, Device};
pub use resolver::{
    resolve_drive_capability_collector, resolve_drive_collector, resolve_storage_controller_collector,
    resolve_updater,
};
