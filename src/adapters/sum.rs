//! Supermicro Update Manager Adapter
//!
//! Flashes Supermicro BIOS and BMC firmware in-band with `sum`.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::SUM;
use crate::domain::ports::{FirmwareUpdater, Utility};
use crate::error::Result;
use crate::executor::{BoxedExecutor, CommandSpec};
use crate::model::ComponentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Bios,
    Bmc,
}

/// BIOS or BMC updater backed by `sum`.
#[derive(Clone)]
pub struct Sum {
    executor: BoxedExecutor,
    target: Target,
}

impl Sum {
    pub fn bios(executor: BoxedExecutor) -> Self {
        Self {
            executor,
            target: Target::Bios,
        }
    }

    pub fn bmc(executor: BoxedExecutor) -> Self {
        Self {
            executor,
            target: Target::Bmc,
        }
    }

    fn sum_command(&self) -> &'static str {
        match self.target {
            Target::Bios => "UpdateBios",
            Target::Bmc => "UpdateBmc",
        }
    }
}

impl Utility for Sum {
    fn name(&self) -> &'static str {
        SUM
    }
}

#[async_trait]
impl FirmwareUpdater for Sum {
    fn kind(&self) -> ComponentKind {
        match self.target {
            Target::Bios => ComponentKind::Bios,
            Target::Bmc => ComponentKind::Bmc,
        }
    }

    /// `sum` addresses the local board; `target` is ignored.
    #[instrument(skip(self, cancel))]
    async fn update(&self, cancel: &CancellationToken, firmware: &Path, _target: Option<&str>) -> Result<()> {
        let command = CommandSpec::new(SUM)
            .args(["-c", self.sum_command(), "--file"])
            .arg(firmware.display().to_string());

        self.executor.exec(cancel, &command).await?;
        info!(kind = %self.kind(), firmware = %firmware.display(), "sum firmware installed");
        Ok(())
    }
}
