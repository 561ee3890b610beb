//! Component Record Model
//!
//! Vendor-neutral shape for every hardware part the collectors report, and
//! the [`Device`] aggregate that owns them.
//!
//! Any field may be empty or zero on a freshly collected fragment: that is
//! absence of data, not a claim that the part lacks the attribute.

pub mod vendors;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::merge::{impl_record, Identified};

// =============================================================================
// Component Kinds
// =============================================================================

/// Component classes known to the collectors and updaters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Drive,
    Nic,
    Bmc,
    Bios,
    Cpld,
    StorageController,
}

impl ComponentKind {
    /// All kinds, in collection order.
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Drive,
        ComponentKind::Nic,
        ComponentKind::Bios,
        ComponentKind::Cpld,
        ComponentKind::Bmc,
        ComponentKind::StorageController,
    ];
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Drive => write!(f, "drive"),
            ComponentKind::Nic => write!(f, "nic"),
            ComponentKind::Bmc => write!(f, "bmc"),
            ComponentKind::Bios => write!(f, "bios"),
            ComponentKind::Cpld => write!(f, "cpld"),
            ComponentKind::StorageController => write!(f, "storage_controller"),
        }
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "drive" | "disk" => Ok(ComponentKind::Drive),
            "nic" => Ok(ComponentKind::Nic),
            "bmc" => Ok(ComponentKind::Bmc),
            "bios" => Ok(ComponentKind::Bios),
            "cpld" => Ok(ComponentKind::Cpld),
            "storage_controller" | "raid" => Ok(ComponentKind::StorageController),
            other => Err(format!("unknown component kind: {}", other)),
        }
    }
}

// =============================================================================
// Shared Attributes
// =============================================================================

/// Firmware versions of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firmware {
    /// Version currently running
    pub installed: String,
    /// Version offered by the vendor utility, if it reports one
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub available: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Firmware {
    pub fn new(installed: impl Into<String>) -> Self {
        Self {
            installed: installed.into(),
            ..Default::default()
        }
    }
}

impl_record!(Firmware {
    "Installed" => installed,
    "Available" => available,
    "Metadata" => metadata,
});

/// Attributes every component carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Common {
    pub vendor: String,
    pub model: String,
    pub serial: String,
    pub description: String,
    pub product_name: String,
    /// Reported by an OEM-specific utility rather than a generic one
    pub oem: bool,
    pub firmware: Option<Firmware>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Common {
    /// Installed firmware version, empty when unknown.
    pub fn firmware_installed(&self) -> &str {
        self.firmware
            .as_ref()
            .map(|f| f.installed.as_str())
            .unwrap_or_default()
    }
}

impl_record!(Common {
    "Vendor" => vendor,
    "Model" => model,
    "Serial" => serial,
    "Description" => description,
    "ProductName" => product_name,
    "Oem" => oem,
    "Firmware" => firmware,
    "Metadata" => metadata,
});

// =============================================================================
// Components
// =============================================================================

/// A physical drive (SATA, SAS or NVMe).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    #[serde(flatten)]
    pub common: Common,
    /// Bus protocol (sata, sas, nvme)
    pub protocol: String,
    /// HDD, SSD or NVMe-SSD
    pub drive_type: String,
    /// OS device path, e.g. /dev/nvme0n1
    pub logical_name: String,
    pub capacity_bytes: i64,
    pub block_size_bytes: i64,
    pub wwn: String,
    pub smart_status: String,
    /// Controller the drive hangs off, when known
    pub storage_controller: String,
    /// Feature name → enabled
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capabilities: BTreeMap<String, bool>,
}

impl_record!(Drive embeds common {
    "Protocol" => protocol,
    "DriveType" => drive_type,
    "LogicalName" => logical_name,
    "CapacityBytes" => capacity_bytes,
    "BlockSizeBytes" => block_size_bytes,
    "WWN" => wwn,
    "SmartStatus" => smart_status,
    "StorageController" => storage_controller,
    "Capabilities" => capabilities,
});

/// A network interface card. The serial is the base MAC address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    #[serde(flatten)]
    pub common: Common,
    pub pci_address: String,
    pub speed_bits: i64,
    pub physical_id: String,
}

impl_record!(Nic embeds common {
    "PCIAddress" => pci_address,
    "SpeedBits" => speed_bits,
    "PhysicalID" => physical_id,
});

/// The baseboard management controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bmc {
    #[serde(flatten)]
    pub common: Common,
    pub id: String,
    pub ipmi_version: String,
}

impl_record!(Bmc embeds common {
    "ID" => id,
    "IPMIVersion" => ipmi_version,
});

/// The system firmware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bios {
    #[serde(flatten)]
    pub common: Common,
    pub release_date: String,
    pub size_bytes: i64,
    pub capacity_bytes: i64,
}

impl_record!(Bios embeds common {
    "ReleaseDate" => release_date,
    "SizeBytes" => size_bytes,
    "CapacityBytes" => capacity_bytes,
});

/// The board CPLD.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpld {
    #[serde(flatten)]
    pub common: Common,
}

impl_record!(Cpld embeds common {});

/// A RAID/HBA storage controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageController {
    #[serde(flatten)]
    pub common: Common,
    pub pci_address: String,
    pub supported_raid: String,
    /// Host interface (sata, sas, nvme)
    pub interface: String,
    pub physical_id: String,
    pub max_physical_disks: i32,
}

impl_record!(StorageController embeds common {
    "PCIAddress" => pci_address,
    "SupportedRAID" => supported_raid,
    "Interface" => interface,
    "PhysicalID" => physical_id,
    "MaxPhysicalDisks" => max_physical_disks,
});

macro_rules! identified {
    ($($ty:ident),*) => {
        $(
            impl Identified for $ty {
                fn serial(&self) -> &str {
                    &self.common.serial
                }
            }
        )*
    };
}

identified!(Drive, Nic, StorageController);

// =============================================================================
// Device
// =============================================================================

/// Root aggregate for one server.
///
/// Collection mutates a device in place; it never replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(flatten)]
    pub common: Common,
    #[serde(default)]
    pub drives: Vec<Drive>,
    #[serde(default)]
    pub nics: Vec<Nic>,
    #[serde(default)]
    pub bmc: Bmc,
    #[serde(default)]
    pub bios: Bios,
    #[serde(default)]
    pub cpld: Cpld,
    #[serde(default)]
    pub storage_controllers: Vec<StorageController>,
}

impl Device {
    /// Create an empty device with the given identity.
    pub fn new(vendor: impl Into<String>, model: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            common: Common {
                vendor: vendor.into(),
                model: model.into(),
                serial: serial.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Look up a drive by its OS device path.
    pub fn drive_by_logical_name(&self, logical_name: &str) -> Option<&Drive> {
        self.drives.iter().find(|d| d.logical_name == logical_name)
    }

    /// Number of components held, across all classes.
    pub fn component_count(&self) -> usize {
        self.drives.len() + self.nics.len() + self.storage_controllers.len() + 3
    }
}
