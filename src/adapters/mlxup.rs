//! mlxup Adapter
//!
//! Mellanox NIC inventory from `mlxup --query` and firmware flashing with
//! `mlxup -u`.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{clean, MLXUP};
use crate::domain::ports::{FirmwareUpdater, NicCollector, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{vendors, Common, ComponentKind, Firmware, Nic};
use crate::parse::{block_lines, format_mac, parse_kv_lines, value_of};

const MARKER: &str = "Device Type";

/// Parse `mlxup --query` output into NIC fragments.
///
/// Each device block carries a version table without colons:
///
/// ```text
///   Versions:         Current        Available
///      FW             14.27.1016     14.32.1010
/// ```
///
/// The `FW` row gives installed and available firmware.
pub fn parse_mlxup_query(output: &str) -> Vec<Nic> {
    block_lines(output, MARKER)
        .into_iter()
        .map(|lines| {
            let block = parse_kv_lines(lines.iter().copied());

            let mut firmware = lines
                .iter()
                .map(|line| line.split_whitespace().collect::<Vec<_>>())
                .find(|cols| cols.first() == Some(&"FW"))
                .map(|cols| Firmware {
                    installed: cols.get(1).map(|v| clean(v)).unwrap_or_default(),
                    available: cols.get(2).map(|v| clean(v)).unwrap_or_default(),
                    ..Default::default()
                })
                .unwrap_or_default();

            if let Some(psid) = value_of(&block, &["PSID"]) {
                firmware.metadata.insert("psid".to_string(), psid.to_string());
            }

            let model = value_of(&block, &["Part Number"]).map(clean).unwrap_or_default();

            Nic {
                common: Common {
                    vendor: vendors::MELLANOX.to_string(),
                    model: model.clone(),
                    serial: value_of(&block, &["Base MAC"]).map(format_mac).unwrap_or_default(),
                    description: value_of(&block, &["Description"]).map(clean).unwrap_or_default(),
                    product_name: value_of(&block, &[MARKER]).map(clean).unwrap_or_default(),
                    oem: false,
                    firmware: (!firmware.installed.is_empty()).then_some(firmware),
                    ..Default::default()
                },
                pci_address: value_of(&block, &["PCI Device Name"]).map(clean).unwrap_or_default(),
                ..Default::default()
            }
        })
        .collect()
}

/// Mellanox NIC collector and firmware updater.
#[derive(Clone)]
pub struct Mlxup {
    executor: BoxedExecutor,
}

impl Mlxup {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Mlxup {
    fn name(&self) -> &'static str {
        MLXUP
    }
}

#[async_trait]
impl NicCollector for Mlxup {
    #[instrument(skip(self, cancel))]
    async fn nics(&self, cancel: &CancellationToken) -> Result<Vec<Nic>> {
        let output = self
            .executor
            .exec(cancel, &CommandSpec::new(MLXUP).arg("--query"))
            .await?;

        let nics = parse_mlxup_query(&output.stdout_str());
        debug!(count = nics.len(), "mlxup reported NICs");
        Ok(nics)
    }
}

#[async_trait]
impl FirmwareUpdater for Mlxup {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Nic
    }

    #[instrument(skip(self, cancel))]
    async fn update(&self, cancel: &CancellationToken, firmware: &Path, target: Option<&str>) -> Result<()> {
        let mut command = CommandSpec::new(MLXUP)
            .args(["--yes", "--update", "--image-file"])
            .arg(firmware.display().to_string());
        if let Some(device) = target {
            command = command.args(["--dev", device]);
        }

        self.executor.exec(cancel, &command).await?;
        info!(firmware = %firmware.display(), "mlxup firmware installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::executor::{FakeExecutor, Output};
    use assert_matches::assert_matches;

    const QUERY: &str = "\
Querying Mellanox devices firmware ...

Device #1:
----------

  Device Type:      ConnectX4LX
  Part Number:      MCX4121A-ACA_Ax
  Description:      ConnectX-4 Lx EN network interface card; 25GbE dual-port SFP28
  PSID:             MT_2420110034
  PCI Device Name:  0000:3b:00.0
  Base MAC:         b8cef6a1b2c3
  Versions:         Current        Available
     FW             14.27.1016     14.32.1010
     PXE            3.6.0102       3.6.0301

  Status:           Update required

Device #2:
----------

  Device Type:      ConnectX5
  Part Number:      MCX512A-ACA_Ax_Bx
  Description:      ConnectX-5 EN network interface card
  PSID:             MT_0000000080
  PCI Device Name:  0000:5e:00.0
  Base MAC:         0c42a1b2c3d4
  Versions:         Current        Available
     FW             16.28.2006     N/A

  Status:           Up to date
";

    #[test]
    fn test_parse_query_blocks() {
        let nics = parse_mlxup_query(QUERY);
        assert_eq!(nics.len(), 2);

        let first = &nics[0];
        assert_eq!(first.common.vendor, "mellanox");
        assert_eq!(first.common.model, "MCX4121A-ACA_Ax");
        assert_eq!(first.common.serial, "b8:ce:f6:a1:b2:c3");
        assert_eq!(first.pci_address, "0000:3b:00.0");

        let firmware = first.common.firmware.as_ref().unwrap();
        assert_eq!(firmware.installed, "14.27.1016");
        assert_eq!(firmware.available, "14.32.1010");
        assert_eq!(firmware.metadata.get("psid").unwrap(), "MT_2420110034");

        let second = nics[1].common.firmware.as_ref().unwrap();
        assert_eq!(second.installed, "16.28.2006");
        assert_eq!(second.available, "");
    }

    #[test]
    fn test_parse_query_without_devices() {
        assert!(parse_mlxup_query("Querying Mellanox devices firmware ...\n\nNo devices found\n").is_empty());
    }

    #[tokio::test]
    async fn test_collect_nics() {
        let fake = FakeExecutor::new();
        fake.on_command("mlxup --query", Output::success(QUERY));

        let nics = Mlxup::new(fake.as_executor())
            .nics(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(nics.len(), 2);
    }

    #[tokio::test]
    async fn test_update_passes_device_and_image() {
        let fake = FakeExecutor::new();
        fake.on_program("mlxup", Output::success(""));

        Mlxup::new(fake.clone().as_executor())
            .update(&CancellationToken::new(), Path::new("/tmp/fw.bin"), Some("0000:3b:00.0"))
            .await
            .unwrap();

        assert_eq!(
            fake.command_lines(),
            vec!["mlxup --yes --update --image-file /tmp/fw.bin --dev 0000:3b:00.0"]
        );
    }

    #[tokio::test]
    async fn test_update_failure_propagates() {
        let fake = FakeExecutor::new();
        fake.on_program("mlxup", Output::failure(1, "image does not match PSID"));

        let err = Mlxup::new(fake.as_executor())
            .update(&CancellationToken::new(), Path::new("/tmp/fw.bin"), None)
            .await
            .unwrap_err();
        assert_matches!(err, Error::CommandFailed { exit_code: 1, .. });
    }
}
