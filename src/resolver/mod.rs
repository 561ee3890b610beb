//! Vendor/Class Resolver
//!
//! Pure dispatch from a (component kind, vendor) pair to the adapter that
//! services it. Lookups go through immutable tables keyed by the canonical
//! vendor name; nothing here mutates state or guesses. An unrecognized
//! vendor is [`Error::UtilityNotIdentified`], a routine outcome callers are
//! expected to handle and move past.
//!
//! # Usage
//!
//! ```ignore
//! let executor = HostExecutor::default().into_boxed();
//! match resolve_storage_controller_collector("LSI Logic / Symbios Logic", executor) {
//!     Ok(collector) => println!("using {}", collector.name()),
//!     Err(e) if e.is_identification_failure() => println!("no RAID utility: {e}"),
//!     Err(e) => return Err(e),
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::adapters::{Hdparm, Mlxup, Msecli, Mvcli, Nvme, StoreCli, Sum};
use crate::domain::ports::{
    DriveCapabilityCollector, DriveTransport, SharedDriveCapabilityCollector, SharedDriveCollector,
    SharedFirmwareUpdater, SharedStorageControllerCollector, Utility,
};
use crate::error::{Error, Result};
use crate::executor::BoxedExecutor;
use crate::model::vendors::{self, canonical_vendor};
use crate::model::ComponentKind;

// =============================================================================
// Dispatch Tables
// =============================================================================

type StorageControllerCtor = fn(BoxedExecutor) -> SharedStorageControllerCollector;
type DriveCtor = fn(BoxedExecutor) -> SharedDriveCollector;
type UpdaterCtor = fn(BoxedExecutor) -> SharedFirmwareUpdater;

fn mvcli_controllers(executor: BoxedExecutor) -> SharedStorageControllerCollector {
    Arc::new(Mvcli::new(executor))
}

fn storcli_controllers(executor: BoxedExecutor) -> SharedStorageControllerCollector {
    Arc::new(StoreCli::new(executor))
}

fn msecli_drives(executor: BoxedExecutor) -> SharedDriveCollector {
    Arc::new(Msecli::new(executor))
}

fn mvcli_drives(executor: BoxedExecutor) -> SharedDriveCollector {
    Arc::new(Mvcli::new(executor))
}

fn storcli_drives(executor: BoxedExecutor) -> SharedDriveCollector {
    Arc::new(StoreCli::new(executor))
}

fn mlxup_updater(executor: BoxedExecutor) -> SharedFirmwareUpdater {
    Arc::new(Mlxup::new(executor))
}

fn msecli_updater(executor: BoxedExecutor) -> SharedFirmwareUpdater {
    Arc::new(Msecli::new(executor))
}

fn mvcli_updater(executor: BoxedExecutor) -> SharedFirmwareUpdater {
    Arc::new(Mvcli::new(executor))
}

fn storcli_updater(executor: BoxedExecutor) -> SharedFirmwareUpdater {
    Arc::new(StoreCli::new(executor))
}

fn sum_bios_updater(executor: BoxedExecutor) -> SharedFirmwareUpdater {
    Arc::new(Sum::bios(executor))
}

fn sum_bmc_updater(executor: BoxedExecutor) -> SharedFirmwareUpdater {
    Arc::new(Sum::bmc(executor))
}

static STORAGE_CONTROLLER_COLLECTORS: Lazy<HashMap<&'static str, StorageControllerCtor>> =
    Lazy::new(|| {
        HashMap::from([
            (vendors::MARVELL, mvcli_controllers as StorageControllerCtor),
            (vendors::BROADCOM, storcli_controllers as StorageControllerCtor),
        ])
    });

static DRIVE_COLLECTORS: Lazy<HashMap<&'static str, DriveCtor>> = Lazy::new(|| {
    HashMap::from([
        (vendors::MICRON, msecli_drives as DriveCtor),
        (vendors::MARVELL, mvcli_drives as DriveCtor),
        (vendors::BROADCOM, storcli_drives as DriveCtor),
    ])
});

/// Component kind → canonical vendor → updater.
static UPDATERS: Lazy<HashMap<ComponentKind, HashMap<&'static str, UpdaterCtor>>> = Lazy::new(|| {
    HashMap::from([
        (
            ComponentKind::Nic,
            HashMap::from([(vendors::MELLANOX, mlxup_updater as UpdaterCtor)]),
        ),
        (
            ComponentKind::Drive,
            HashMap::from([(vendors::MICRON, msecli_updater as UpdaterCtor)]),
        ),
        (
            ComponentKind::StorageController,
            HashMap::from([
                (vendors::MARVELL, mvcli_updater as UpdaterCtor),
                (vendors::BROADCOM, storcli_updater as UpdaterCtor),
            ]),
        ),
        (
            ComponentKind::Bios,
            HashMap::from([(vendors::SUPERMICRO, sum_bios_updater as UpdaterCtor)]),
        ),
        (
            ComponentKind::Bmc,
            HashMap::from([(vendors::SUPERMICRO, sum_bmc_updater as UpdaterCtor)]),
        ),
    ])
});

// =============================================================================
// Entry Points
// =============================================================================

/// Storage controller collector for a controller vendor.
pub fn resolve_storage_controller_collector(
    vendor: &str,
    executor: BoxedExecutor,
) -> Result<SharedStorageControllerCollector> {
    let key = canonical_vendor(vendor);
    STORAGE_CONTROLLER_COLLECTORS
        .get(key.as_str())
        .map(|ctor| ctor(executor))
        .ok_or_else(|| Error::not_identified(ComponentKind::StorageController.to_string(), vendor))
}

/// Vendor-specific drive collector for a drive vendor.
pub fn resolve_drive_collector(vendor: &str, executor: BoxedExecutor) -> Result<SharedDriveCollector> {
    let key = canonical_vendor(vendor);
    DRIVE_COLLECTORS
        .get(key.as_str())
        .map(|ctor| ctor(executor))
        .ok_or_else(|| Error::not_identified(ComponentKind::Drive.to_string(), vendor))
}

/// Firmware updater for a component kind and vendor.
pub fn resolve_updater(
    kind: ComponentKind,
    vendor: &str,
    executor: BoxedExecutor,
) -> Result<SharedFirmwareUpdater> {
    let key = canonical_vendor(vendor);
    UPDATERS
        .get(&kind)
        .and_then(|by_vendor| by_vendor.get(key.as_str()))
        .map(|ctor| ctor(executor))
        .ok_or_else(|| Error::not_identified(kind.to_string(), vendor))
}

/// Capability collector for the drive at `logical_name`.
///
/// A configured collector whose transport matches the drive's path wins;
/// otherwise a default for that transport is built fresh.
pub fn resolve_drive_capability_collector(
    logical_name: &str,
    configured: &[SharedDriveCapabilityCollector],
    executor: BoxedExecutor,
) -> SharedDriveCapabilityCollector {
    let transport = DriveTransport::for_logical_name(logical_name);

    if let Some(collector) = configured.iter().find(|c| c.transport() == transport) {
        debug!(logical_name, utility = collector.name(), "using configured capability collector");
        return Arc::clone(collector);
    }

    match transport {
        DriveTransport::Nvme => Arc::new(Nvme::new(executor)),
        DriveTransport::Ata => Arc::new(Hdparm::new(executor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FirmwareUpdater;
    use crate::executor::FakeExecutor;
    use assert_matches::assert_matches;

    fn executor() -> BoxedExecutor {
        FakeExecutor::new().as_executor()
    }

    #[test]
    fn test_storage_controller_dispatch() {
        let c = resolve_storage_controller_collector("Marvell Technology Group Ltd.", executor()).unwrap();
        assert_eq!(c.name(), "mvcli");

        let c = resolve_storage_controller_collector("LSI Logic / Symbios Logic", executor()).unwrap();
        assert_eq!(c.name(), "storcli");
    }

    #[test]
    fn test_drive_dispatch_is_case_insensitive() {
        assert_eq!(resolve_drive_collector("MICRON", executor()).unwrap().name(), "msecli");
        assert_eq!(resolve_drive_collector(" micron technology ", executor()).unwrap().name(), "msecli");
    }

    #[test]
    fn test_unknown_vendor_is_not_identified() {
        let err = resolve_storage_controller_collector("nonexistent-oem", executor())
            .err()
            .expect("unknown vendor resolved");
        assert!(err.is_identification_failure());
        assert_matches!(
            err,
            Error::UtilityNotIdentified { ref kind, ref vendor }
                if kind == "storage_controller" && vendor == "nonexistent-oem"
        );

        assert!(resolve_drive_collector("nonexistent-oem", executor())
            .err()
            .is_some_and(|e| e.is_identification_failure()));
        assert!(resolve_updater(ComponentKind::Nic, "nonexistent-oem", executor())
            .err()
            .is_some_and(|e| e.is_identification_failure()));
    }

    #[test]
    fn test_updater_dispatch() {
        let cases = [
            (ComponentKind::Nic, "Mellanox Technologies", "mlxup"),
            (ComponentKind::Drive, "Micron", "msecli"),
            (ComponentKind::StorageController, "marvell", "mvcli"),
            (ComponentKind::StorageController, "Broadcom / LSI", "storcli"),
            (ComponentKind::Bios, "Supermicro", "sum"),
            (ComponentKind::Bmc, "Super Micro Computer, Inc.", "sum"),
        ];

        for (kind, vendor, utility) in cases {
            let updater = resolve_updater(kind, vendor, executor()).unwrap();
            assert_eq!(updater.name(), utility, "{kind} / {vendor}");
            assert_eq!(updater.kind(), kind);
        }
    }

    #[test]
    fn test_updater_kind_must_match() {
        // Mellanox makes NICs, not BIOS images.
        assert!(resolve_updater(ComponentKind::Bios, "mellanox", executor()).is_err());
        assert!(resolve_updater(ComponentKind::Cpld, "supermicro", executor()).is_err());
    }

    #[test]
    fn test_capability_default_by_transport() {
        let nvme = resolve_drive_capability_collector("/dev/nvme0n1", &[], executor());
        assert_eq!(nvme.name(), "nvme");

        let ata = resolve_drive_capability_collector("/dev/sda", &[], executor());
        assert_eq!(ata.name(), "hdparm");
    }

    #[test]
    fn test_configured_capability_collector_wins() {
        let configured: SharedDriveCapabilityCollector = Arc::new(Hdparm::new(executor()));
        let nvme_configured: SharedDriveCapabilityCollector = Arc::new(Nvme::new(executor()));
        let list = vec![configured.clone(), nvme_configured.clone()];

        let picked = resolve_drive_capability_collector("/dev/sdb", &list, executor());
        assert!(Arc::ptr_eq(&picked, &configured));

        let picked = resolve_drive_capability_collector("/dev/nvme1n1", &list, executor());
        assert!(Arc::ptr_eq(&picked, &nvme_configured));
    }
}
