//! Collectors registry: one optional handle per component class.

use std::sync::Arc;

use tracing::debug;

use crate::adapters::{Dmidecode, Ipmitool, Lshw, Mlxup, Nvme, Smartctl};
use crate::config::CollectorConfig;
use crate::domain::ports::{
    SharedBiosCollector, SharedBmcCollector, SharedCpldCollector, SharedDriveCapabilityCollector,
    SharedDriveCollector, SharedInventoryCollector, SharedNicCollector, SharedStorageControllerCollector,
    Utility,
};
use crate::executor::BoxedExecutor;

/// Capability handles for one collection run.
///
/// An absent handle (or empty list) means "skip this class". Drives and
/// storage controllers take several collectors since generic and vendor
/// utilities each see a different subset of the hardware.
#[derive(Clone, Default)]
pub struct Collectors {
    pub inventory: Option<SharedInventoryCollector>,
    pub drives: Vec<SharedDriveCollector>,
    pub nics: Option<SharedNicCollector>,
    pub bmc: Option<SharedBmcCollector>,
    pub bios: Option<SharedBiosCollector>,
    pub cpld: Option<SharedCpldCollector>,
    pub storage_controllers: Vec<SharedStorageControllerCollector>,
    /// Consulted first when drive capabilities are collected
    pub drive_capabilities: Vec<SharedDriveCapabilityCollector>,
}

impl std::fmt::Debug for Collectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn names<T: Utility + ?Sized>(list: &[Arc<T>]) -> Vec<&'static str> {
            list.iter().map(|c| c.name()).collect()
        }

        f.debug_struct("Collectors")
            .field("inventory", &self.inventory.as_ref().map(|c| c.name()))
            .field("drives", &names(&self.drives))
            .field("nics", &self.nics.as_ref().map(|c| c.name()))
            .field("bmc", &self.bmc.as_ref().map(|c| c.name()))
            .field("bios", &self.bios.as_ref().map(|c| c.name()))
            .field("cpld", &self.cpld.as_ref().map(|c| c.name()))
            .field("storage_controllers", &names(&self.storage_controllers))
            .field("drive_capabilities", &names(&self.drive_capabilities))
            .finish()
    }
}

impl Collectors {
    /// Registry with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inventory(mut self, collector: SharedInventoryCollector) -> Self {
        self.inventory = Some(collector);
        self
    }

    pub fn with_drives(mut self, collector: SharedDriveCollector) -> Self {
        self.drives.push(collector);
        self
    }

    pub fn with_nics(mut self, collector: SharedNicCollector) -> Self {
        self.nics = Some(collector);
        self
    }

    pub fn with_bmc(mut self, collector: SharedBmcCollector) -> Self {
        self.bmc = Some(collector);
        self
    }

    pub fn with_bios(mut self, collector: SharedBiosCollector) -> Self {
        self.bios = Some(collector);
        self
    }

    pub fn with_cpld(mut self, collector: SharedCpldCollector) -> Self {
        self.cpld = Some(collector);
        self
    }

    pub fn with_storage_controllers(mut self, collector: SharedStorageControllerCollector) -> Self {
        self.storage_controllers.push(collector);
        self
    }

    pub fn with_drive_capabilities(mut self, collector: SharedDriveCapabilityCollector) -> Self {
        self.drive_capabilities.push(collector);
        self
    }

    /// Fill only the empty slots with the host defaults.
    ///
    /// The baseline inventory collector is always installed. Class defaults
    /// named in `disabled_utilities` are left out; caller-supplied handles
    /// are never replaced. CPLD and storage controllers have no generic
    /// utility and stay empty unless supplied.
    pub fn fill_defaults(&mut self, config: &CollectorConfig, executor: &BoxedExecutor) {
        let enabled = |utility: &dyn Utility| {
            let keep = !config.is_disabled(utility.name());
            if !keep {
                debug!(utility = utility.name(), "default collector disabled by config");
            }
            keep
        };

        if self.inventory.is_none() {
            self.inventory = Some(Arc::new(Lshw::new(executor.clone())));
        }

        if self.drives.is_empty() {
            let smartctl = Smartctl::new(executor.clone());
            if enabled(&smartctl) {
                self.drives.push(Arc::new(smartctl));
            }
            let nvme = Nvme::new(executor.clone());
            if enabled(&nvme) {
                self.drives.push(Arc::new(nvme));
            }
        }

        if self.nics.is_none() {
            let mlxup = Mlxup::new(executor.clone());
            if enabled(&mlxup) {
                self.nics = Some(Arc::new(mlxup));
            }
        }

        if self.bmc.is_none() {
            let ipmitool = Ipmitool::new(executor.clone());
            if enabled(&ipmitool) {
                self.bmc = Some(Arc::new(ipmitool));
            }
        }

        if self.bios.is_none() {
            let dmidecode = Dmidecode::new(executor.clone());
            if enabled(&dmidecode) {
                self.bios = Some(Arc::new(dmidecode));
            }
        }
    }

    /// Host defaults for every slot.
    pub fn defaults(config: &CollectorConfig, executor: &BoxedExecutor) -> Self {
        let mut collectors = Self::new();
        collectors.fill_defaults(config, executor);
        collectors
    }
}
