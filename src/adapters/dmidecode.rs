//! dmidecode Adapter
//!
//! BIOS vendor, version and sizes from the SMBIOS type 0 table
//! (`dmidecode -t 0`).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use super::{clean, DMIDECODE};
use crate::domain::ports::{BiosCollector, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::{Bios, Common, Firmware};
use crate::parse::{parse_blocks, value_of};

const MARKER: &str = "BIOS Information";

/// SMBIOS sizes are binary: "64 kB" is 65536 bytes.
fn smbios_size(value: &str) -> i64 {
    let mut parts = value.split_whitespace();
    let number: i64 = match parts.next().and_then(|n| n.parse().ok()) {
        Some(n) => n,
        None => return 0,
    };

    let shift = match parts.next().map(str::to_lowercase).as_deref() {
        Some("bytes") | None => 0,
        Some("kb") => 10,
        Some("mb") => 20,
        Some("gb") => 30,
        _ => return 0,
    };

    number.checked_mul(1 << shift).unwrap_or_default()
}

/// Parse `dmidecode -t 0` output. `None` when no BIOS record is present.
pub fn parse_bios_info(output: &str) -> Option<Bios> {
    let block = parse_blocks(output, MARKER).into_iter().next()?;
    let get = |key: &str| value_of(&block, &[key]).map(clean).unwrap_or_default();
    let version = get("Version");

    Some(Bios {
        common: Common {
            vendor: get("Vendor"),
            description: MARKER.to_string(),
            firmware: (!version.is_empty()).then(|| Firmware::new(version)),
            ..Default::default()
        },
        release_date: get("Release Date"),
        size_bytes: smbios_size(&get("Runtime Size")),
        capacity_bytes: smbios_size(&get("ROM Size")),
    })
}

/// BIOS collector backed by dmidecode.
#[derive(Clone)]
pub struct Dmidecode {
    executor: BoxedExecutor,
}

impl Dmidecode {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Dmidecode {
    fn name(&self) -> &'static str {
        DMIDECODE
    }
}

#[async_trait]
impl BiosCollector for Dmidecode {
    #[instrument(skip(self, cancel))]
    async fn bios(&self, cancel: &CancellationToken) -> Result<Bios> {
        let command = CommandSpec::new(DMIDECODE).args(["-t", "0"]);
        let output = self.executor.exec(cancel, &command).await?;

        Ok(parse_bios_info(&output.stdout_str()).unwrap_or_else(|| {
            warn!("dmidecode printed no BIOS record");
            Bios::default()
        }))
    }
}
