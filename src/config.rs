//! Collector Configuration
//!
//! Settings for one collection run, loadable from YAML and overridable from
//! the command line.
//!
//! ```yaml
//! command_timeout_secs: 120
//! disabled_utilities: [ipmitool]
//! collect_drive_capabilities: true
//! trace_output: false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::{ALL_UTILITIES, LSHW};
use crate::error::{Error, Result};
use crate::executor::{BoxedExecutor, HostExecutor};

/// Configuration for the collection orchestrator and host executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Per-command timeout in seconds
    pub command_timeout_secs: u64,

    /// Utilities never used as defaults (e.g. "ipmitool" on hosts without a BMC)
    pub disabled_utilities: Vec<String>,

    /// Collect per-drive feature sets after the drive merge
    pub collect_drive_capabilities: bool,

    /// Log raw utility output at trace level
    pub trace_output: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 300,
            disabled_utilities: Vec::new(),
            collect_drive_capabilities: false,
            trace_output: false,
        }
    }
}

impl CollectorConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading collector config");
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 {
            return Err(Error::Config("command_timeout_secs must be positive".into()));
        }

        if let Some(unknown) = self
            .disabled_utilities
            .iter()
            .find(|name| !ALL_UTILITIES.contains(&name.to_lowercase().as_str()))
        {
            return Err(Error::Config(format!("unknown utility in disabled_utilities: {}", unknown)));
        }

        if self.is_disabled(LSHW) {
            return Err(Error::Config("lshw is the baseline collector and cannot be disabled".into()));
        }

        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Whether `utility` was disabled, case-insensitively.
    pub fn is_disabled(&self, utility: &str) -> bool {
        self.disabled_utilities
            .iter()
            .any(|name| name.eq_ignore_ascii_case(utility))
    }

    /// Host executor honouring the timeout and trace settings.
    pub fn host_executor(&self) -> BoxedExecutor {
        HostExecutor::new(self.command_timeout())
            .with_trace_output(self.trace_output)
            .into_boxed()
    }
}
