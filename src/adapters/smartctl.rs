//! smartctl Adapter
//!
//! ATA and SCSI drive inventory through smartmontools' JSON output:
//! `smartctl --scan -j` lists devices, `smartctl -i -j <dev>` describes one.
//! NVMe devices are left to the nvme adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{clean, SMARTCTL};
use crate::domain::ports::{DriveCollector, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{vendors, Common, Drive, Firmware};

// =============================================================================
// JSON Shapes
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Scan {
    devices: Vec<ScanDevice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScanDevice {
    name: String,
    #[serde(rename = "type")]
    device_type: String,
    protocol: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Info {
    device: ScanDevice,
    model_family: String,
    model_name: String,
    scsi_vendor: String,
    scsi_product: String,
    scsi_revision: String,
    serial_number: String,
    firmware_version: String,
    wwn: Option<Wwn>,
    user_capacity: Capacity,
    logical_block_size: i64,
    rotation_rate: Option<i64>,
    smart_status: Option<SmartStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Wwn {
    naa: u64,
    oui: u64,
    id: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Capacity {
    bytes: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmartStatus {
    passed: bool,
}

// =============================================================================
// Parsers
// =============================================================================

/// Device paths from `smartctl --scan -j`, NVMe devices excluded.
pub fn parse_smartctl_scan(output: &str) -> Result<Vec<String>> {
    let scan: Scan = serde_json::from_str(output)?;
    Ok(scan
        .devices
        .into_iter()
        .filter(|d| !d.protocol.eq_ignore_ascii_case("nvme") && d.device_type != "nvme")
        .map(|d| d.name)
        .collect())
}

/// Drive fragment from `smartctl -i -j <dev>`.
pub fn parse_smartctl_info(output: &str) -> Result<Drive> {
    let info: Info = serde_json::from_str(output)?;

    let model = clean(if info.model_name.is_empty() {
        &info.scsi_product
    } else {
        &info.model_name
    });
    let vendor = if info.scsi_vendor.trim().is_empty() {
        vendors::vendor_from_drive_model(&model)
            .map(ToString::to_string)
            .unwrap_or_default()
    } else {
        clean(&info.scsi_vendor)
    };
    let firmware = clean(if info.firmware_version.is_empty() {
        &info.scsi_revision
    } else {
        &info.firmware_version
    });

    let drive_type = match info.rotation_rate {
        Some(0) => "SSD",
        Some(_) => "HDD",
        None => "",
    };

    Ok(Drive {
        common: Common {
            vendor,
            model,
            serial: clean(&info.serial_number),
            description: clean(&info.model_family),
            firmware: (!firmware.is_empty()).then(|| Firmware::new(firmware)),
            ..Default::default()
        },
        protocol: info.device.protocol.to_lowercase(),
        drive_type: drive_type.to_string(),
        logical_name: info.device.name,
        capacity_bytes: info.user_capacity.bytes,
        block_size_bytes: info.logical_block_size,
        wwn: info
            .wwn
            .map(|w| format!("{:x}{:06x}{:09x}", w.naa, w.oui, w.id))
            .unwrap_or_default(),
        smart_status: match info.smart_status {
            Some(SmartStatus { passed: true }) => "PASSED".to_string(),
            Some(SmartStatus { passed: false }) => "FAILED".to_string(),
            None => String::new(),
        },
        ..Default::default()
    })
}

// =============================================================================
// Collector
// =============================================================================

/// ATA/SCSI drive collector backed by smartctl.
#[derive(Clone)]
pub struct Smartctl {
    executor: BoxedExecutor,
}

impl Smartctl {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Smartctl {
    fn name(&self) -> &'static str {
        SMARTCTL
    }
}

#[async_trait]
impl DriveCollector for Smartctl {
    #[instrument(skip(self, cancel))]
    async fn drives(&self, cancel: &CancellationToken) -> Result<Vec<Drive>> {
        let scan = self
            .executor
            .exec(cancel, &CommandSpec::new(SMARTCTL).args(["--scan", "-j"]))
            .await?;

        let mut drives = Vec::new();
        for device in parse_smartctl_scan(&scan.stdout_str())? {
            let command = CommandSpec::new(SMARTCTL).args(["-i", "-j"]).arg(device.as_str());
            let info = self.executor.exec(cancel, &command).await?;
            drives.push(parse_smartctl_info(&info.stdout_str())?);
        }

        debug!(count = drives.len(), "smartctl reported drives");
        Ok(drives)
    }
}
