//! msecli Adapter
//!
//! Micron drive inventory (`msecli -L`) and drive firmware updates.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{clean, MSECLI};
use crate::domain::ports::{DriveCollector, FirmwareUpdater, Utility};
use crate::error::{Error, Result};
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{vendors, Common, ComponentKind, Drive, Firmware};
use crate::parse::{parse_blocks, parse_size_bytes, value_of};

const MARKER: &str = "Device Name";

/// Parse `msecli -L` output into drive fragments.
pub fn parse_msecli_list(output: &str) -> Vec<Drive> {
    parse_blocks(output, MARKER)
        .into_iter()
        .map(|block| {
            let get = |keys: &[&str]| value_of(&block, keys).map(clean).unwrap_or_default();
            let firmware = get(&["FW-Rev"]);

            Drive {
                common: Common {
                    vendor: vendors::MICRON.to_string(),
                    model: get(&["Model No"]),
                    serial: get(&["Serial No"]),
                    oem: true,
                    firmware: (!firmware.is_empty()).then(|| Firmware::new(firmware)),
                    ..Default::default()
                },
                logical_name: get(&[MARKER]),
                capacity_bytes: parse_size_bytes(&get(&["Total Size"])).unwrap_or_default(),
                smart_status: get(&["Drive Status"]),
                ..Default::default()
            }
        })
        .collect()
}

/// Micron drive collector and updater.
#[derive(Clone)]
pub struct Msecli {
    executor: BoxedExecutor,
}

impl Msecli {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Msecli {
    fn name(&self) -> &'static str {
        MSECLI
    }
}

#[async_trait]
impl DriveCollector for Msecli {
    #[instrument(skip(self, cancel))]
    async fn drives(&self, cancel: &CancellationToken) -> Result<Vec<Drive>> {
        let output = self
            .executor
            .exec(cancel, &CommandSpec::new(MSECLI).arg("-L"))
            .await?;

        let drives = parse_msecli_list(&output.stdout_str());
        debug!(count = drives.len(), "msecli reported drives");
        Ok(drives)
    }
}

#[async_trait]
impl FirmwareUpdater for Msecli {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Drive
    }

    /// msecli flashes one drive at a time, so `target` is required.
    #[instrument(skip(self, cancel))]
    async fn update(&self, cancel: &CancellationToken, firmware: &Path, target: Option<&str>) -> Result<()> {
        let device = target.ok_or_else(|| Error::Config("msecli update needs a drive logical name".into()))?;

        // msecli asks for confirmation before flashing.
        let command = CommandSpec::new(MSECLI)
            .args(["-F", "-U"])
            .arg(firmware.display().to_string())
            .args(["-n", device])
            .stdin("y\n");

        self.executor.exec(cancel, &command).await?;
        info!(device, firmware = %firmware.display(), "msecli firmware installed");
        Ok(())
    }
}
