//! mvcli Adapter
//!
//! Marvell storage controllers (`mvcli info -o hba`), the drives attached
//! to them (`mvcli info -o pd`) and controller flashing.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{clean, MVCLI};
use crate::domain::ports::{DriveCollector, FirmwareUpdater, StorageControllerCollector, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{vendors, Common, ComponentKind, Drive, Firmware, StorageController};
use crate::parse::{parse_blocks, value_of, Block};

const HBA_MARKER: &str = "Adapter ID";
const PD_MARKER: &str = "PD ID";

fn firmware_of(block: &Block, keys: &[&str]) -> Option<Firmware> {
    value_of(block, keys).map(clean).filter(|v| !v.is_empty()).map(Firmware::new)
}

fn text(block: &Block, keys: &[&str]) -> String {
    value_of(block, keys).map(clean).unwrap_or_default()
}

/// Parse `mvcli info -o hba` output into controller fragments.
pub fn parse_mvcli_hba(output: &str) -> Vec<StorageController> {
    parse_blocks(output, HBA_MARKER)
        .into_iter()
        .map(|block| StorageController {
            common: Common {
                vendor: vendors::MARVELL.to_string(),
                model: text(&block, &["Product"]),
                description: text(&block, &["Sub Product"]),
                firmware: firmware_of(&block, &["Firmware version"]),
                ..Default::default()
            },
            supported_raid: text(&block, &["Supported RAID mode"]),
            interface: text(&block, &["Supported port type"]).to_lowercase(),
            physical_id: text(&block, &[HBA_MARKER]),
            max_physical_disks: value_of(&block, &["Max PD supported"])
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            ..Default::default()
        })
        .collect()
}

/// mvcli prints drive sizes in KiB with a trailing "K". Sizes that do not
/// fit in bytes are treated as unknown.
fn size_kib(value: &str) -> i64 {
    value
        .trim()
        .trim_end_matches(['K', 'k'])
        .parse::<i64>()
        .ok()
        .and_then(|kib| kib.checked_mul(1024))
        .unwrap_or_default()
}

/// Parse `mvcli info -o pd` output into drive fragments.
pub fn parse_mvcli_pd(output: &str) -> Vec<Drive> {
    parse_blocks(output, PD_MARKER)
        .into_iter()
        .map(|block| Drive {
            common: Common {
                model: text(&block, &["model", "Model"]),
                serial: text(&block, &["Serial"]),
                firmware: firmware_of(&block, &["FW version"]),
                ..Default::default()
            },
            protocol: text(&block, &["Port type"]).to_lowercase(),
            drive_type: text(&block, &["Device type"]),
            capacity_bytes: value_of(&block, &["Size"]).map(size_kib).unwrap_or_default(),
            storage_controller: text(&block, &[HBA_MARKER]),
            ..Default::default()
        })
        .collect()
}

/// Marvell controller and drive collector.
#[derive(Clone)]
pub struct Mvcli {
    executor: BoxedExecutor,
}

impl Mvcli {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }

    async fn info(&self, cancel: &CancellationToken, object: &str) -> Result<String> {
        let command = CommandSpec::new(MVCLI).args(["info", "-o", object]);
        Ok(self.executor.exec(cancel, &command).await?.stdout_str())
    }
}

impl Utility for Mvcli {
    fn name(&self) -> &'static str {
        MVCLI
    }
}

#[async_trait]
impl StorageControllerCollector for Mvcli {
    #[instrument(skip(self, cancel))]
    async fn storage_controllers(&self, cancel: &CancellationToken) -> Result<Vec<StorageController>> {
        let controllers = parse_mvcli_hba(&self.info(cancel, "hba").await?);
        debug!(count = controllers.len(), "mvcli reported adapters");
        Ok(controllers)
    }
}

#[async_trait]
impl DriveCollector for Mvcli {
    #[instrument(skip(self, cancel))]
    async fn drives(&self, cancel: &CancellationToken) -> Result<Vec<Drive>> {
        let drives = parse_mvcli_pd(&self.info(cancel, "pd").await?);
        debug!(count = drives.len(), "mvcli reported drives");
        Ok(drives)
    }
}

#[async_trait]
impl FirmwareUpdater for Mvcli {
    fn kind(&self) -> ComponentKind {
        ComponentKind::StorageController
    }

    #[instrument(skip(self, cancel))]
    async fn update(&self, cancel: &CancellationToken, firmware: &Path, target: Option<&str>) -> Result<()> {
        let mut command = CommandSpec::new(MVCLI)
            .args(["flash", "-a", "update", "-t", "raw", "-f"])
            .arg(firmware.display().to_string());
        if let Some(adapter) = target {
            command = command.args(["--adapter", adapter]);
        }

        self.executor.exec(cancel, &command).await?;
        info!(firmware = %firmware.display(), "mvcli firmware installed");
        Ok(())
    }
}
