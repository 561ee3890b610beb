//! storcli Adapter
//!
//! Broadcom/LSI MegaRAID controllers and their drives through storcli's JSON
//! output (`J` suffix), plus controller firmware flashing.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{clean, STORCLI};
use crate::domain::ports::{DriveCollector, FirmwareUpdater, StorageControllerCollector, Utility};
use crate::error::{Error, Result};
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{vendors, Common, ComponentKind, Drive, Firmware, StorageController};
use crate::parse::parse_size_bytes;

const BINARY: &str = "storcli64";
const DETAIL_SUFFIX: &str = " - Detailed Information";

fn str_at(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => clean(s),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// `Response Data` of every controller that answered successfully.
fn responses(output: &str) -> Result<Vec<Value>> {
    let root: Value = serde_json::from_str(output)?;
    let controllers = root
        .get("Controllers")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::parse(STORCLI, "missing Controllers array"))?;

    Ok(controllers
        .iter()
        .filter(|c| {
            let status = c
                .pointer("/Command Status/Status")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if status != "Success" {
                warn!(status, "storcli controller query did not succeed");
            }
            status == "Success"
        })
        .filter_map(|c| c.get("Response Data").cloned())
        .collect())
}

fn controller_of(response: &Value) -> Option<StorageController> {
    let basics = response.get("Basics")?;
    let version = response.get("Version").cloned().unwrap_or_default();
    let capabilities = response.get("Capabilities").cloned().unwrap_or_default();
    let firmware = str_at(&version, "Firmware Version");

    Some(StorageController {
        common: Common {
            vendor: vendors::BROADCOM.to_string(),
            model: str_at(basics, "Model"),
            serial: str_at(basics, "Serial Number"),
            firmware: (!firmware.is_empty()).then(|| {
                let mut fw = Firmware::new(firmware);
                let package = str_at(&version, "Firmware Package Build");
                if !package.is_empty() {
                    fw.metadata.insert("package_build".to_string(), package);
                }
                fw
            }),
            ..Default::default()
        },
        pci_address: str_at(basics, "PCI Address"),
        supported_raid: str_at(&capabilities, "RAID Level Supported"),
        interface: str_at(&capabilities, "Supported Drives").to_lowercase(),
        physical_id: str_at(basics, "Controller"),
        ..Default::default()
    })
}

/// Drives from `Drive /cX/eY/sZ` summaries joined with their
/// `... - Detailed Information` device attributes.
fn drives_of(response: &Value) -> Vec<Drive> {
    let Some(entries) = response.as_object() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(key, detail)| {
            let name = key.strip_suffix(DETAIL_SUFFIX)?;
            let attributes = detail.get(format!("{name} Device attributes").as_str())?;
            let summary = entries
                .get(name)
                .and_then(Value::as_array)
                .and_then(|rows| rows.first())
                .cloned()
                .unwrap_or_default();

            let model = str_at(attributes, "Model Number");
            let manufacturer = str_at(attributes, "Manufacturer Id");
            let vendor = if manufacturer.is_empty() || manufacturer.eq_ignore_ascii_case("ATA") {
                vendors::vendor_from_drive_model(&model)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            } else {
                manufacturer
            };
            let firmware = str_at(attributes, "Firmware Revision");
            let controller = name
                .trim_start_matches("Drive /c")
                .split('/')
                .next()
                .unwrap_or_default()
                .to_string();

            Some(Drive {
                common: Common {
                    vendor,
                    model,
                    serial: str_at(attributes, "SN"),
                    firmware: (!firmware.is_empty()).then(|| Firmware::new(firmware)),
                    ..Default::default()
                },
                protocol: str_at(&summary, "Intf").to_lowercase(),
                drive_type: str_at(&summary, "Med"),
                capacity_bytes: parse_size_bytes(&str_at(&summary, "Size")).unwrap_or_default(),
                wwn: str_at(attributes, "WWN").to_lowercase(),
                storage_controller: controller,
                ..Default::default()
            })
        })
        .collect()
}

/// Parse storcli `show all J` output into controllers and drives.
///
/// Controller output (`/call show all`) carries `Basics`; drive output
/// (`/call/eall/sall show all`) carries per-drive detail objects. Either
/// list is empty when the corresponding section is absent.
pub fn parse_storcli_show_all(output: &str) -> Result<(Vec<StorageController>, Vec<Drive>)> {
    let responses = responses(output)?;
    let controllers = responses.iter().filter_map(controller_of).collect();
    let drives = responses.iter().flat_map(drives_of).collect();
    Ok((controllers, drives))
}

/// Broadcom/LSI controller and drive collector.
#[derive(Clone)]
pub struct StoreCli {
    executor: BoxedExecutor,
}

impl StoreCli {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }

    async fn show_all(&self, cancel: &CancellationToken, object: &str) -> Result<String> {
        let command = CommandSpec::new(BINARY).args([object, "show", "all", "J"]);
        Ok(self.executor.exec(cancel, &command).await?.stdout_str())
    }
}

impl Utility for StoreCli {
    fn name(&self) -> &'static str {
        STORCLI
    }
}

#[async_trait]
impl StorageControllerCollector for StoreCli {
    #[instrument(skip(self, cancel))]
    async fn storage_controllers(&self, cancel: &CancellationToken) -> Result<Vec<StorageController>> {
        let (controllers, _) = parse_storcli_show_all(&self.show_all(cancel, "/call").await?)?;
        debug!(count = controllers.len(), "storcli reported controllers");
        Ok(controllers)
    }
}

#[async_trait]
impl DriveCollector for StoreCli {
    #[instrument(skip(self, cancel))]
    async fn drives(&self, cancel: &CancellationToken) -> Result<Vec<Drive>> {
        let (_, drives) = parse_storcli_show_all(&self.show_all(cancel, "/call/eall/sall").await?)?;
        debug!(count = drives.len(), "storcli reported drives");
        Ok(drives)
    }
}

#[async_trait]
impl FirmwareUpdater for StoreCli {
    fn kind(&self) -> ComponentKind {
        ComponentKind::StorageController
    }

    /// `target` is the controller index; defaults to controller 0.
    #[instrument(skip(self, cancel))]
    async fn update(&self, cancel: &CancellationToken, firmware: &Path, target: Option<&str>) -> Result<()> {
        let controller = format!("/c{}", target.unwrap_or("0"));
        let command = CommandSpec::new(BINARY)
            .args([controller.as_str(), "download"])
            .arg(format!("file={}", firmware.display()))
            .args(["noverchk", "J"]);

        self.executor.exec(cancel, &command).await?;
        info!(controller = %controller, firmware = %firmware.display(), "storcli firmware installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{FakeExecutor, Output};
    use assert_matches::assert_matches;

    const CONTROLLERS: &str = r#"{
      "Controllers": [{
        "Command Status": {"CLI Version": "007.1017", "Controller": 0, "Status": "Success", "Description": "None"},
        "Response Data": {
          "Basics": {
            "Controller": 0,
            "Model": "AVAGO MegaRAID SAS 9361-8i",
            "Serial Number": "SK12345678",
            "PCI Address": "00:5e:00:00"
          },
          "Version": {
            "Firmware Package Build": "24.21.0-0097",
            "Firmware Version": "4.680.00-8527"
          },
          "Capabilities": {
            "Supported Drives": "SAS, SATA",
            "RAID Level Supported": "RAID0, RAID1, RAID5, RAID6, RAID10"
          }
        }
      }, {
        "Command Status": {"Controller": 1, "Status": "Failure", "Description": "Controller 1 not found"}
      }]
    }"#;

    const DRIVES: &str = r#"{
      "Controllers": [{
        "Command Status": {"Controller": 0, "Status": "Success", "Description": "Show Drive Information Succeeded."},
        "Response Data": {
          "Drive /c0/e252/s0": [
            {"EID:Slt": "252:0", "DID": 8, "State": "Onln", "Size": "1.745 TB", "Intf": "SATA", "Med": "SSD", "Model": "MTFDDAK1T9TDN   "}
          ],
          "Drive /c0/e252/s0 - Detailed Information": {
            "Drive /c0/e252/s0 State": {"Shield Counter": 0},
            "Drive /c0/e252/s0 Device attributes": {
              "SN": "        1822207B3D2A",
              "Manufacturer Id": "ATA     ",
              "Model Number": "MTFDDAK1T9TDN",
              "WWN": "500A07511B3D2A00",
              "Firmware Revision": "D1MU004 "
            }
          }
        }
      }]
    }"#;

    #[test]
    fn test_parse_controllers() {
        let (controllers, drives) = parse_storcli_show_all(CONTROLLERS).unwrap();
        assert!(drives.is_empty());
        assert_eq!(controllers.len(), 1);

        let c = &controllers[0];
        assert_eq!(c.common.vendor, "broadcom");
        assert_eq!(c.common.model, "AVAGO MegaRAID SAS 9361-8i");
        assert_eq!(c.common.serial, "SK12345678");
        assert_eq!(c.common.firmware_installed(), "4.680.00-8527");
        assert_eq!(c.supported_raid, "RAID0, RAID1, RAID5, RAID6, RAID10");
        assert_eq!(c.physical_id, "0");
    }

    #[test]
    fn test_parse_drives() {
        let (controllers, drives) = parse_storcli_show_all(DRIVES).unwrap();
        assert!(controllers.is_empty());
        assert_eq!(drives.len(), 1);

        let d = &drives[0];
        assert_eq!(d.common.serial, "1822207B3D2A");
        assert_eq!(d.common.vendor, "micron");
        assert_eq!(d.common.firmware_installed(), "D1MU004");
        assert_eq!(d.protocol, "sata");
        assert_eq!(d.capacity_bytes, 1_745_000_000_000);
        assert_eq!(d.wwn, "500a07511b3d2a00");
        assert_eq!(d.storage_controller, "0");
    }

    #[test]
    fn test_parse_without_controllers_array() {
        assert_matches!(parse_storcli_show_all("{}"), Err(Error::Parse { .. }));
    }

    #[tokio::test]
    async fn test_update_targets_controller() {
        let fake = FakeExecutor::new();
        fake.on_program(BINARY, Output::success("{}"));

        StoreCli::new(fake.clone().as_executor())
            .update(&CancellationToken::new(), Path::new("/tmp/mr3108fw.rom"), Some("1"))
            .await
            .unwrap();

        assert_eq!(
            fake.command_lines(),
            vec!["storcli64 /c1 download file=/tmp/mr3108fw.rom noverchk J"]
        );
    }

    #[tokio::test]
    async fn test_collectors_use_separate_queries() {
        let fake = FakeExecutor::new();
        fake.on_command("storcli64 /call show all J", Output::success(CONTROLLERS))
            .on_command("storcli64 /call/eall/sall show all J", Output::success(DRIVES));

        let storcli = StoreCli::new(fake.as_executor());
        let cancel = CancellationToken::new();
        assert_eq!(storcli.storage_controllers(&cancel).await.unwrap().len(), 1);
        assert_eq!(storcli.drives(&cancel).await.unwrap().len(), 1);
    }
}
