//! Domain Layer
//!
//! Capability ports the orchestrator depends on. Concrete vendor utility
//! adapters live in [`crate::adapters`].
//!
//! # Usage
//!
//! ```ignore
//! use hwinventory::domain::ports::DriveCollector;
//!
//! async fn count_drives<C: DriveCollector>(collector: &C, cancel: &CancellationToken) -> Result<usize> {
//!     Ok(collector.drives(cancel).await?.len())
//! }
//! ```

pub mod ports;

pub use ports::{
    BiosCollector, BmcCollector, CpldCollector, DriveCapabilityCollector, DriveCollector,
    DriveTransport, FirmwareUpdater, InventoryCollector, NicCollector, SharedBiosCollector,
    SharedBmcCollector, SharedCpldCollector, SharedDriveCapabilityCollector, SharedDriveCollector,
    SharedFirmwareUpdater, SharedInventoryCollector, SharedNicCollector,
    SharedStorageControllerCollector, StorageControllerCollector, Utility,
};
