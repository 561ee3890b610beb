//! nvme-cli Adapter
//!
//! NVMe drive inventory (`nvme list -o json`) and per-controller feature
//! bits (`nvme id-ctrl -o json <dev>`).

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{clean, NVME};
use crate::domain::ports::{DriveCapabilityCollector, DriveCollector, DriveTransport, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{vendors, Common, Drive, Firmware};

// =============================================================================
// Identify Controller Bits
// =============================================================================

/// Optional Admin Command Support (OACS) bits.
const OACS_BITS: [(u32, &str); 9] = [
    (0, "security-send-receive"),
    (1, "format-nvm"),
    (2, "firmware-download-commit"),
    (3, "namespace-management"),
    (4, "device-self-test"),
    (5, "directives"),
    (6, "nvme-mi-send-receive"),
    (7, "virtualization-management"),
    (8, "doorbell-buffer-config"),
];

/// Format NVM Attributes (FNA) bits.
const FNA_BITS: [(u32, &str); 3] = [
    (0, "format-applies-to-all-namespaces"),
    (1, "secure-erase-applies-to-all-namespaces"),
    (2, "cryptographic-erase"),
];

/// Sanitize Capabilities (SANICAP) bits.
const SANICAP_BITS: [(u32, &str); 3] = [
    (0, "sanitize-crypto-erase"),
    (1, "sanitize-block-erase"),
    (2, "sanitize-overwrite"),
];

// =============================================================================
// JSON Shapes
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct NvmeList {
    devices: Vec<NvmeDevice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct NvmeDevice {
    device_path: String,
    model_number: String,
    serial_number: String,
    firmware: String,
    physical_size: i64,
    sector_size: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdCtrl {
    oacs: u32,
    fna: u32,
    sanicap: u32,
}

// =============================================================================
// Parsers
// =============================================================================

/// Drive fragments from `nvme list -o json`.
pub fn parse_nvme_list(output: &str) -> Result<Vec<Drive>> {
    // nvme-cli prints nothing at all when no controller is present
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }

    let list: NvmeList = serde_json::from_str(output)?;
    Ok(list
        .devices
        .into_iter()
        .map(|d| {
            let model = clean(&d.model_number);
            let firmware = clean(&d.firmware);

            Drive {
                common: Common {
                    vendor: vendors::vendor_from_drive_model(&model)
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    model,
                    serial: clean(&d.serial_number),
                    firmware: (!firmware.is_empty()).then(|| Firmware::new(firmware)),
                    ..Default::default()
                },
                protocol: "nvme".to_string(),
                drive_type: "NVMe-SSD".to_string(),
                logical_name: d.device_path,
                capacity_bytes: d.physical_size,
                block_size_bytes: d.sector_size,
                ..Default::default()
            }
        })
        .collect())
}

/// Named feature bits from `nvme id-ctrl -o json`.
pub fn parse_id_ctrl(output: &str) -> Result<Vec<(String, bool)>> {
    let id: IdCtrl = serde_json::from_str(output)?;

    let bits = |value: u32, table: &[(u32, &str)]| {
        table
            .iter()
            .map(move |(bit, name)| (name.to_string(), value & (1 << bit) != 0))
            .collect::<Vec<_>>()
    };

    let mut capabilities = bits(id.oacs, &OACS_BITS);
    capabilities.extend(bits(id.fna, &FNA_BITS));
    capabilities.extend(bits(id.sanicap, &SANICAP_BITS));
    Ok(capabilities)
}

// =============================================================================
// Collector
// =============================================================================

/// NVMe drive and capability collector backed by nvme-cli.
#[derive(Clone)]
pub struct Nvme {
    executor: BoxedExecutor,
}

impl Nvme {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Nvme {
    fn name(&self) -> &'static str {
        NVME
    }
}

#[async_trait]
impl DriveCollector for Nvme {
    #[instrument(skip(self, cancel))]
    async fn drives(&self, cancel: &CancellationToken) -> Result<Vec<Drive>> {
        let command = CommandSpec::new(NVME).args(["list", "-o", "json"]);
        let output = self.executor.exec(cancel, &command).await?;

        let drives = parse_nvme_list(&output.stdout_str())?;
        debug!(count = drives.len(), "nvme reported drives");
        Ok(drives)
    }
}

#[async_trait]
impl DriveCapabilityCollector for Nvme {
    fn transport(&self) -> DriveTransport {
        DriveTransport::Nvme
    }

    #[instrument(skip(self, cancel))]
    async fn drive_capabilities(
        &self,
        cancel: &CancellationToken,
        logical_name: &str,
    ) -> Result<Vec<(String, bool)>> {
        let command = CommandSpec::new(NVME).args(["id-ctrl", "-o", "json", logical_name]);
        let output = self.executor.exec(cancel, &command).await?;
        parse_id_ctrl(&output.stdout_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{FakeExecutor, Output};

    const LIST: &str = r#"{
      "Devices": [
        {
          "NameSpace": 1,
          "DevicePath": "/dev/nvme0n1",
          "Firmware": "EDA7602Q",
          "Index": 0,
          "ModelNumber": "SAMSUNG MZQLB1T9HAJR-00007",
          "SerialNumber": "S439NA0M123456",
          "UsedBytes": 25383563264,
          "MaximumLBA": 3750748848,
          "PhysicalSize": 1920383410176,
          "SectorSize": 512
        }
      ]
    }"#;

    #[test]
    fn test_parse_nvme_list() {
        let drives = parse_nvme_list(LIST).unwrap();
        assert_eq!(drives.len(), 1);

        let d = &drives[0];
        assert_eq!(d.logical_name, "/dev/nvme0n1");
        assert_eq!(d.common.vendor, "samsung");
        assert_eq!(d.common.serial, "S439NA0M123456");
        assert_eq!(d.common.firmware_installed(), "EDA7602Q");
        assert_eq!(d.capacity_bytes, 1920383410176);
        assert_eq!(d.protocol, "nvme");
    }

    #[test]
    fn test_parse_empty_nvme_list() {
        assert!(parse_nvme_list("").unwrap().is_empty());
        assert!(parse_nvme_list(r#"{"Devices": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_id_ctrl_bits() {
        // oacs 0x17: security, format, firmware, self-test
        let caps = parse_id_ctrl(r#"{"vid": 5197, "oacs": 23, "fna": 4, "sanicap": 0}"#).unwrap();
        let enabled = |name: &str| caps.iter().find(|(n, _)| n == name).map(|(_, on)| *on);

        assert_eq!(caps.len(), 15);
        assert_eq!(enabled("security-send-receive"), Some(true));
        assert_eq!(enabled("format-nvm"), Some(true));
        assert_eq!(enabled("firmware-download-commit"), Some(true));
        assert_eq!(enabled("namespace-management"), Some(false));
        assert_eq!(enabled("device-self-test"), Some(true));
        assert_eq!(enabled("cryptographic-erase"), Some(true));
        assert_eq!(enabled("sanitize-block-erase"), Some(false));
    }

    #[tokio::test]
    async fn test_capabilities_query_the_device() {
        let fake = FakeExecutor::new();
        fake.on_command(
            "nvme id-ctrl -o json /dev/nvme0n1",
            Output::success(r#"{"oacs": 2, "fna": 0}"#),
        );

        let caps = Nvme::new(fake.as_executor())
            .drive_capabilities(&CancellationToken::new(), "/dev/nvme0n1")
            .await
            .unwrap();
        assert!(caps.contains(&("format-nvm".to_string(), true)));
    }
}
