//! ipmitool Adapter
//!
//! BMC identity and firmware from `ipmitool mc info`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::{clean, IPMITOOL};
use crate::domain::ports::{BmcCollector, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{Bmc, Common, Firmware};
use crate::parse::{parse_blocks, value_of};

const MARKER: &str = "Device ID";

/// Parse `ipmitool mc info` output. `None` when no record is present.
pub fn parse_mc_info(output: &str) -> Option<Bmc> {
    let block = parse_blocks(output, MARKER).into_iter().next()?;
    let get = |key: &str| value_of(&block, &[key]).map(clean).unwrap_or_default();

    // "Unknown (0x1B11)" when the BMC has no product string
    let product = get("Product Name");
    let product = if product.to_lowercase().starts_with("unknown") {
        String::new()
    } else {
        product
    };

    let firmware = get("Firmware Revision");

    Some(Bmc {
        common: Common {
            vendor: get("Manufacturer Name"),
            model: product.clone(),
            product_name: product,
            firmware: (!firmware.is_empty()).then(|| Firmware::new(firmware)),
            ..Default::default()
        },
        id: get(MARKER),
        ipmi_version: get("IPMI Version"),
    })
}

/// BMC collector backed by ipmitool.
#[derive(Clone)]
pub struct Ipmitool {
    executor: BoxedExecutor,
}

impl Ipmitool {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Ipmitool {
    fn name(&self) -> &'static str {
        IPMITOOL
    }
}

#[async_trait]
impl BmcCollector for Ipmitool {
    #[instrument(skip(self, cancel))]
    async fn bmc(&self, cancel: &CancellationToken) -> Result<Bmc> {
        let command = CommandSpec::new(IPMITOOL).args(["mc", "info"]);
        let output = self.executor.exec(cancel, &command).await?;

        Ok(parse_mc_info(&output.stdout_str()).unwrap_or_else(|| {
            warn!("ipmitool mc info printed no device record");
            Bmc::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{FakeExecutor, Output};

    const MC_INFO: &str = "\
Device ID                 : 32
Device Revision           : 1
Firmware Revision         : 1.73
IPMI Version              : 2.0
Manufacturer ID           : 10876
Manufacturer Name         : Super Micro Computer Inc.
Product ID                : 6929 (0x1b11)
Product Name              : Unknown (0x1B11)
Device Available          : yes
Provides Device SDRs      : no
Additional Device Support :
    Sensor Device
    SEL Device
";

    #[test]
    fn test_parse_mc_info() {
        let bmc = parse_mc_info(MC_INFO).unwrap();
        assert_eq!(bmc.id, "32");
        assert_eq!(bmc.ipmi_version, "2.0");
        assert_eq!(bmc.common.vendor, "Super Micro Computer Inc.");
        assert_eq!(bmc.common.firmware_installed(), "1.73");
        assert_eq!(bmc.common.model, "");
    }

    #[test]
    fn test_parse_mc_info_without_record() {
        assert!(parse_mc_info("Could not open device at /dev/ipmi0\n").is_none());
    }

    #[tokio::test]
    async fn test_collect_bmc_without_record_is_empty() {
        let fake = FakeExecutor::new();
        fake.on_command("ipmitool mc info", Output::success(""));

        let bmc = Ipmitool::new(fake.as_executor())
            .bmc(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(bmc, Bmc::default());
    }
}
