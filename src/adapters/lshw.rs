//! lshw Adapter
//!
//! Baseline inventory from `lshw -json`: system identity, BIOS, NICs,
//! storage controllers and drives, read from the lshw device tree.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{clean, LSHW};
use crate::domain::ports::{InventoryCollector, Utility};
use crate::error::{Error, Result};
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::inventory::absorb_baseline;
use crate::model::{Bios, Common, Device, Drive, Firmware, Nic, StorageController};

// =============================================================================
// lshw JSON Tree
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LshwNode {
    id: String,
    class: String,
    description: String,
    product: String,
    vendor: String,
    serial: String,
    version: String,
    businfo: String,
    physid: String,
    date: String,
    /// A single path or a list of paths
    logicalname: serde_json::Value,
    size: Option<u64>,
    capacity: Option<u64>,
    configuration: serde_json::Map<String, serde_json::Value>,
    children: Vec<LshwNode>,
}

impl LshwNode {
    fn logical_name(&self) -> String {
        match &self.logicalname {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(names) => names
                .iter()
                .find_map(|n| n.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        }
    }

    fn config(&self, key: &str) -> String {
        self.configuration
            .get(key)
            .and_then(|v| v.as_str())
            .map(clean)
            .unwrap_or_default()
    }

    fn common(&self) -> Common {
        Common {
            vendor: clean(&self.vendor),
            model: clean(&self.product),
            serial: clean(&self.serial),
            description: clean(&self.description),
            product_name: clean(&self.product),
            ..Default::default()
        }
    }

    fn pci_address(&self) -> String {
        self.businfo
            .strip_prefix("pci@")
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

fn to_i64(value: Option<u64>) -> i64 {
    value.and_then(|v| i64::try_from(v).ok()).unwrap_or_default()
}

// =============================================================================
// Parser
// =============================================================================

/// Parse `lshw -json` output into a device shape.
///
/// Accepts both the object form and the single-element array form printed
/// by newer lshw releases.
pub fn parse_lshw(output: &str) -> Result<Device> {
    let root: LshwNode = match serde_json::from_str::<serde_json::Value>(output)? {
        serde_json::Value::Array(mut nodes) if !nodes.is_empty() => {
            serde_json::from_value(nodes.swap_remove(0))?
        }
        value @ serde_json::Value::Object(_) => serde_json::from_value(value)?,
        _ => return Err(Error::parse(LSHW, "expected a device tree object")),
    };

    let mut device = Device {
        common: root.common(),
        ..Default::default()
    };
    walk(&root, &mut device);

    Ok(device)
}

fn walk(node: &LshwNode, device: &mut Device) {
    match node.class.as_str() {
        "memory" if node.id == "firmware" => device.bios = bios(node),
        "network" => device.nics.push(nic(node)),
        "storage" => device.storage_controllers.push(storage_controller(node)),
        "disk" if !node.id.starts_with("cdrom") && node.size.is_some() => {
            device.drives.push(drive(node))
        }
        _ => {}
    }

    for child in &node.children {
        walk(child, device);
    }
}

fn bios(node: &LshwNode) -> Bios {
    let mut common = node.common();
    common.firmware = Some(Firmware::new(clean(&node.version)));

    Bios {
        common,
        release_date: clean(&node.date),
        size_bytes: to_i64(node.size),
        capacity_bytes: to_i64(node.capacity),
    }
}

fn nic(node: &LshwNode) -> Nic {
    let mut common = node.common();
    common.serial = common.serial.to_lowercase();

    // "14.27.1016 (MT_2420110034)"
    let firmware = node.config("firmware");
    if let Some(version) = firmware.split_whitespace().next() {
        common.firmware = Some(Firmware::new(version));
    }

    Nic {
        common,
        pci_address: node.pci_address(),
        speed_bits: to_i64(node.capacity.or(node.size)),
        physical_id: node.physid.clone(),
    }
}

fn storage_controller(node: &LshwNode) -> StorageController {
    let description = node.description.to_lowercase();
    let interface = if description.contains("nvme") || node.product.to_lowercase().contains("nvme") {
        "nvme"
    } else if description.contains("sas") || description.contains("raid") {
        "sas"
    } else if description.contains("sata") || description.contains("ahci") {
        "sata"
    } else {
        ""
    };

    StorageController {
        common: node.common(),
        pci_address: node.pci_address(),
        interface: interface.to_string(),
        physical_id: node.physid.clone(),
        ..Default::default()
    }
}

fn drive(node: &LshwNode) -> Drive {
    let logical_name = node.logical_name();
    let mut common = node.common();
    let version = clean(&node.version);
    if !version.is_empty() {
        common.firmware = Some(Firmware::new(version));
    }

    let protocol = match node.businfo.split('@').next().unwrap_or_default() {
        "nvme" => "nvme",
        "scsi" if node.config("ansiversion").is_empty() => "sata",
        "scsi" => "sas",
        _ => "",
    };

    let drive_type = if logical_name.contains("nvme") { "NVMe-SSD" } else { "" };

    Drive {
        common,
        protocol: protocol.to_string(),
        drive_type: drive_type.to_string(),
        logical_name,
        capacity_bytes: to_i64(node.size),
        block_size_bytes: node.config("logicalsectorsize").parse().unwrap_or_default(),
        ..Default::default()
    }
}

// =============================================================================
// Collector
// =============================================================================

/// Baseline inventory collector backed by lshw.
#[derive(Clone)]
pub struct Lshw {
    executor: BoxedExecutor,
}

impl Lshw {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Lshw {
    fn name(&self) -> &'static str {
        LSHW
    }
}

#[async_trait]
impl InventoryCollector for Lshw {
    #[instrument(skip(self, cancel, device))]
    async fn collect_inventory(&self, cancel: &CancellationToken, device: &mut Device) -> Result<()> {
        let command = CommandSpec::new(LSHW).args(["-json", "-quiet"]);
        let output = self.executor.exec(cancel, &command).await?;
        let found = parse_lshw(&output.stdout_str())?;

        debug!(
            drives = found.drives.len(),
            nics = found.nics.len(),
            storage_controllers = found.storage_controllers.len(),
            "lshw inventory parsed"
        );

        absorb_baseline(device, found)
    }
}
