//! hdparm Adapter
//!
//! ATA drive feature sets from the "Commands/features" section of
//! `hdparm -I <dev>`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use super::HDPARM;
use crate::domain::ports::{DriveCapabilityCollector, DriveTransport, Utility};
use crate::error::{Error, Result};
use crate::executor::{BoxedExecutor, CommandSpec};

const SECTION: &str = "Commands/features:";

/// Feature name → enabled, from `hdparm -I` output.
///
/// The section runs from its header to the next non-indented line. A leading
/// `*` marks a feature as enabled; unmarked rows are supported but off.
pub fn parse_hdparm_features(output: &str) -> Result<Vec<(String, bool)>> {
    let mut lines = output.lines().skip_while(|line| line.trim() != SECTION);
    if lines.next().is_none() {
        return Err(Error::parse(HDPARM, "no Commands/features section"));
    }

    Ok(lines
        .take_while(|line| line.starts_with([' ', '\t']))
        .filter_map(|line| {
            let row = line.trim();
            if row.is_empty() || row.starts_with("Enabled") {
                return None;
            }
            match row.strip_prefix('*') {
                Some(name) => Some((name.trim().to_string(), true)),
                None => Some((row.to_string(), false)),
            }
        })
        .collect())
}

/// ATA capability collector backed by hdparm.
#[derive(Clone)]
pub struct Hdparm {
    executor: BoxedExecutor,
}

impl Hdparm {
    pub fn new(executor: BoxedExecutor) -> Self {
        Self { executor }
    }
}

impl Utility for Hdparm {
    fn name(&self) -> &'static str {
        HDPARM
    }
}

#[async_trait]
impl DriveCapabilityCollector for Hdparm {
    fn transport(&self) -> DriveTransport {
        DriveTransport::Ata
    }

    #[instrument(skip(self, cancel))]
    async fn drive_capabilities(
        &self,
        cancel: &CancellationToken,
        logical_name: &str,
    ) -> Result<Vec<(String, bool)>> {
        let command = CommandSpec::new(HDPARM).args(["-I", logical_name]);
        let output = self.executor.exec(cancel, &command).await?;
        parse_hdparm_features(&output.stdout_str())
    }
}
