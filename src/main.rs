//! hwinventory
//!
//! Collects the hardware inventory of the local server with its vendor
//! utilities and prints it as JSON.
//!
//! ```text
//! hwinventory inventory [--device known.json]      one collection pass
//! hwinventory resolve --kind drive --vendor micron  dispatch lookup
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hwinventory::domain::Utility;
use hwinventory::error::Result;
use hwinventory::{
    resolve_drive_collector, resolve_storage_controller_collector, resolve_updater, CollectionSummary,
    CollectorConfig, ComponentKind, Device, InventoryAction,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Server hardware inventory collection
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML collector configuration file
    #[arg(long, env = "HWINVENTORY_CONFIG")]
    config: Option<PathBuf>,

    /// Per-command timeout in seconds (overrides the config file)
    #[arg(long, env = "COMMAND_TIMEOUT_SECS")]
    command_timeout_secs: Option<u64>,

    /// Utilities never used as defaults, comma separated
    #[arg(long, env = "DISABLED_UTILITIES", value_delimiter = ',')]
    disable: Vec<String>,

    /// Collect per-drive feature sets
    #[arg(long, env = "COLLECT_DRIVE_CAPABILITIES")]
    drive_capabilities: bool,

    /// Log raw utility output at trace level
    #[arg(long, env = "TRACE_OUTPUT")]
    trace_output: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one inventory pass on this host and print the device as JSON
    Inventory {
        /// Previously known device record (JSON) to merge into
        #[arg(long)]
        device: Option<PathBuf>,
    },

    /// Show which utility the resolver picks for a component class and vendor
    Resolve {
        /// Component class (drive, nic, bmc, bios, cpld, storage_controller)
        #[arg(long)]
        kind: ComponentKind,

        /// Component vendor as reported by the hardware
        #[arg(long)]
        vendor: String,
    },
}

/// Printed by the `inventory` command.
#[derive(Debug, Serialize)]
struct InventoryReport {
    collected_at: DateTime<Utc>,
    device: Device,
    summary: CollectionSummary,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;
    info!(
        timeout_secs = config.command_timeout_secs,
        disabled = ?config.disabled_utilities,
        drive_capabilities = config.collect_drive_capabilities,
        "configuration loaded"
    );

    match &args.command {
        Command::Inventory { device } => run_inventory(config, device.as_ref()).await,
        Command::Resolve { kind, vendor } => run_resolve(&config, *kind, vendor),
    }
}

/// File values first, then CLI flags on top.
fn load_config(args: &Args) -> Result<CollectorConfig> {
    let mut config = match &args.config {
        Some(path) => CollectorConfig::from_yaml_file(path)?,
        None => CollectorConfig::default(),
    };

    if let Some(secs) = args.command_timeout_secs {
        config.command_timeout_secs = secs;
    }
    config
        .disabled_utilities
        .extend(args.disable.iter().map(|name| name.trim().to_string()));
    config.collect_drive_capabilities |= args.drive_capabilities;
    config.trace_output |= args.trace_output;

    config.validate()?;
    Ok(config)
}

// =============================================================================
// Commands
// =============================================================================

async fn run_inventory(config: CollectorConfig, known: Option<&PathBuf>) -> Result<()> {
    let mut device = match known {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Device::default(),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling collection");
            on_signal.cancel();
        }
    });

    let action = InventoryAction::from_config(config);
    let summary = action
        .collect(&cancel, Some(&mut device), None)
        .await
        .map_err(|e| {
            error!(error = %e, "inventory collection failed");
            e
        })?;

    if !summary.is_clean() {
        warn!(faults = summary.faults.len(), "some collectors faulted, their data is missing");
    }

    let report = InventoryReport {
        collected_at: Utc::now(),
        device,
        summary,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_resolve(config: &CollectorConfig, kind: ComponentKind, vendor: &str) -> Result<()> {
    let executor = config.host_executor();

    let collector = match kind {
        ComponentKind::Drive => Some(resolve_drive_collector(vendor, executor.clone()).map(|c| c.name())),
        ComponentKind::StorageController => {
            Some(resolve_storage_controller_collector(vendor, executor.clone()).map(|c| c.name()))
        }
        _ => None,
    };
    let updater = resolve_updater(kind, vendor, executor).map(|u| u.name());

    let describe = |found: Result<&'static str>| match found {
        Ok(name) => name.to_string(),
        Err(e) if e.is_identification_failure() => format!("none ({})", e),
        Err(e) => format!("error ({})", e),
    };

    if let Some(collector) = collector {
        println!("collector: {}", describe(collector));
    }
    println!("updater:   {}", describe(updater));
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries the report
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
