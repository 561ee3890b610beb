//! Collector Capability Ports
//!
//! Narrow, per-concern contracts implemented by the vendor utility adapters.
//! One adapter may satisfy several capabilities (a RAID utility reports both
//! its controllers and the drives behind them); the orchestrator holds each
//! capability as an independent handle, never as one vendor object.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Capability Ports                         │
//! │  InventoryCollector │ DriveCollector │ NicCollector │ ...    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Utility Adapters                           │
//! │  Lshw │ Smartctl │ Nvme │ Mlxup │ Mvcli │ StoreCli │ ...     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::model::{Bios, Bmc, ComponentKind, Cpld, Device, Drive, Nic, StorageController};

// =============================================================================
// Utility Identity
// =============================================================================

/// Every adapter names the utility it drives.
pub trait Utility: Send + Sync {
    /// Utility name as used in `disabled_utilities` (e.g. "smartctl").
    fn name(&self) -> &'static str;
}

// =============================================================================
// Inventory Port
// =============================================================================

/// Baseline collector that establishes the device shape.
///
/// Unlike the class collectors it works on the device directly: it is the
/// first writer and every later class merges into what it produced.
#[async_trait]
pub trait InventoryCollector: Utility {
    async fn collect_inventory(&self, cancel: &CancellationToken, device: &mut Device) -> Result<()>;
}

// =============================================================================
// Component Class Ports
// =============================================================================

/// Produces drive fragments.
#[async_trait]
pub trait DriveCollector: Utility {
    async fn drives(&self, cancel: &CancellationToken) -> Result<Vec<Drive>>;
}

/// Produces NIC fragments.
#[async_trait]
pub trait NicCollector: Utility {
    async fn nics(&self, cancel: &CancellationToken) -> Result<Vec<Nic>>;
}

/// Produces the BMC fragment.
#[async_trait]
pub trait BmcCollector: Utility {
    async fn bmc(&self, cancel: &CancellationToken) -> Result<Bmc>;
}

/// Produces the CPLD fragment.
#[async_trait]
pub trait CpldCollector: Utility {
    async fn cpld(&self, cancel: &CancellationToken) -> Result<Cpld>;
}

/// Produces the BIOS fragment.
#[async_trait]
pub trait BiosCollector: Utility {
    async fn bios(&self, cancel: &CancellationToken) -> Result<Bios>;
}

/// Produces storage controller fragments.
#[async_trait]
pub trait StorageControllerCollector: Utility {
    async fn storage_controllers(&self, cancel: &CancellationToken) -> Result<Vec<StorageController>>;
}

// =============================================================================
// Drive Capability Port
// =============================================================================

/// Transport class a drive capability utility understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveTransport {
    Nvme,
    /// ATA and SCSI attached drives
    Ata,
}

impl DriveTransport {
    /// Transport class implied by a drive's OS device path.
    pub fn for_logical_name(logical_name: &str) -> Self {
        if logical_name.contains("nvme") {
            DriveTransport::Nvme
        } else {
            DriveTransport::Ata
        }
    }
}

impl std::fmt::Display for DriveTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveTransport::Nvme => write!(f, "nvme"),
            DriveTransport::Ata => write!(f, "ata"),
        }
    }
}

/// Reports the feature set of a single drive.
#[async_trait]
pub trait DriveCapabilityCollector: Utility {
    fn transport(&self) -> DriveTransport;

    /// Feature name → enabled, for the drive at `logical_name`.
    async fn drive_capabilities(
        &self,
        cancel: &CancellationToken,
        logical_name: &str,
    ) -> Result<Vec<(String, bool)>>;
}

// =============================================================================
// Updater Port
// =============================================================================

/// Installs a firmware file on a component through its vendor utility.
///
/// Obtaining the file and any reboot sequencing are the caller's concern.
#[async_trait]
pub trait FirmwareUpdater: Utility {
    /// Component kind this updater flashes.
    fn kind(&self) -> ComponentKind;

    /// Flash `firmware` onto the component. `target` selects the instance
    /// (logical name, controller index) where the utility needs one.
    async fn update(&self, cancel: &CancellationToken, firmware: &Path, target: Option<&str>) -> Result<()>;
}

// =============================================================================
// Shared Handles
// =============================================================================

pub type SharedInventoryCollector = Arc<dyn InventoryCollector>;
pub type SharedDriveCollector = Arc<dyn DriveCollector>;
pub type SharedNicCollector = Arc<dyn NicCollector>;
pub type SharedBmcCollector = Arc<dyn BmcCollector>;
pub type SharedCpldCollector = Arc<dyn CpldCollector>;
pub type SharedBiosCollector = Arc<dyn BiosCollector>;
pub type SharedStorageControllerCollector = Arc<dyn StorageControllerCollector>;
pub type SharedDriveCapabilityCollector = Arc<dyn DriveCapabilityCollector>;
pub type SharedFirmwareUpdater = Arc<dyn FirmwareUpdater>;
