//! Vendor Utility Adapters
//!
//! Concrete implementations of the capability ports in
//! [`crate::domain::ports`], one module per vendor utility.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Capability Ports (Traits)                    │
//! │  InventoryCollector │ DriveCollector │ NicCollector │ Updater   │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  lshw │ smartctl │ nvme │ hdparm │ mlxup │ mvcli │ msecli       │
//! │  storcli │ ipmitool │ dmidecode │ sum                           │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                    Executor (run and capture)
//! ```
//!
//! Each adapter keeps its output grammar in a pure `parse_*` function so it
//! can be tested against fixed fixtures without running the utility.

mod dmidecode;
mod hdparm;
mod ipmitool;
mod lshw;
mod mlxup;
mod msecli;
mod mvcli;
mod nvme;
mod smartctl;
mod storecli;
mod sum;

pub use dmidecode::{parse_bios_info, Dmidecode};
pub use hdparm::{parse_hdparm_features, Hdparm};
pub use ipmitool::{parse_mc_info, Ipmitool};
pub use lshw::{parse_lshw, Lshw};
pub use mlxup::{parse_mlxup_query, Mlxup};
pub use msecli::{parse_msecli_list, Msecli};
pub use mvcli::{parse_mvcli_hba, parse_mvcli_pd, Mvcli};
pub use nvme::{parse_id_ctrl, parse_nvme_list, Nvme};
pub use smartctl::{parse_smartctl_info, parse_smartctl_scan, Smartctl};
pub use storecli::{parse_storcli_show_all, StoreCli};
pub use sum::Sum;

// =============================================================================
// Utility Names
// =============================================================================

pub const LSHW: &str = "lshw";
pub const SMARTCTL: &str = "smartctl";
pub const NVME: &str = "nvme";
pub const HDPARM: &str = "hdparm";
pub const MLXUP: &str = "mlxup";
pub const MVCLI: &str = "mvcli";
pub const MSECLI: &str = "msecli";
pub const STORCLI: &str = "storcli";
pub const IPMITOOL: &str = "ipmitool";
pub const DMIDECODE: &str = "dmidecode";
pub const SUM: &str = "sum";

/// Every utility name an adapter in this module answers to.
pub const ALL_UTILITIES: [&str; 11] = [
    LSHW, SMARTCTL, NVME, HDPARM, MLXUP, MVCLI, MSECLI, STORCLI, IPMITOOL, DMIDECODE, SUM,
];

/// Treat "N/A"-style placeholders as absent data.
pub(crate) fn clean(value: &str) -> String {
    let value = value.trim();
    match value.to_lowercase().as_str() {
        "n/a" | "na" | "none" | "unknown" | "not specified" | "to be filled by o.e.m." => {
            String::new()
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_placeholders() {
        assert_eq!(clean(" N/A "), "");
        assert_eq!(clean("To Be Filled By O.E.M."), "");
        assert_eq!(clean(" 14.27.1016 "), "14.27.1016");
    }
}
