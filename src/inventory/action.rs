//! Collection Orchestrator
//!
//! One inventory pass over a device:
//!
//! ```text
//! validate device → fill collector defaults → baseline inventory
//!     → drives → nics → bios → cpld → bmc → storage controllers
//!     → device-wide defaults
//! ```
//!
//! Classes run one after another, never in parallel: several vendor
//! utilities share a management channel (IPMI, the RAID firmware mailbox)
//! and interleave badly.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::collectors::Collectors;
use super::guard::{isolate, Guarded};
use crate::config::CollectorConfig;
use crate::domain::ports::{
    BiosCollector, BmcCollector, CpldCollector, DriveCapabilityCollector, DriveCollector, NicCollector,
    StorageControllerCollector, Utility,
};
use crate::error::{Error, Result};
use crate::executor::BoxedExecutor;
use crate::merge::{merge, merge_by_serial, merge_field, Identified, Record};
use crate::model::{ComponentKind, Device, Drive};
use crate::resolver::resolve_drive_capability_collector;

// =============================================================================
// Summary
// =============================================================================

/// How one component class fared during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassOutcome {
    /// No collector configured
    Skipped,
    /// Collectors ran and reported nothing
    Empty,
    Merged {
        fragments: usize,
        applied: usize,
        /// Serials of collected fragments with no existing counterpart
        unmatched: Vec<String>,
    },
    /// Every collector of the class panicked
    Faulted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    pub kind: ComponentKind,
    #[serde(flatten)]
    pub outcome: ClassOutcome,
}

/// A collector panic contained by the fault boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub kind: ComponentKind,
    pub utility: String,
    pub reason: String,
}

/// Result of one collection pass, alongside the mutated device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub classes: Vec<ClassReport>,
    pub faults: Vec<Fault>,
    /// Drive capability changes applied, when capability collection is on
    pub capability_changes: usize,
}

impl CollectionSummary {
    pub fn outcome(&self, kind: ComponentKind) -> Option<&ClassOutcome> {
        self.classes
            .iter()
            .find(|report| report.kind == kind)
            .map(|report| &report.outcome)
    }

    /// No collector faulted during the pass.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    fn record(&mut self, kind: ComponentKind, outcome: ClassOutcome) {
        debug!(class = %kind, outcome = ?outcome, "class collected");
        self.classes.push(ClassReport { kind, outcome });
    }
}

// =============================================================================
// Class Plumbing
// =============================================================================

type Call<'a, T> = (&'static str, BoxFuture<'a, Result<Vec<T>>>);

/// Run every call of a class inside the fault boundary.
///
/// `None` when every call faulted; a returned error aborts immediately.
async fn gather<T>(
    kind: ComponentKind,
    calls: Vec<Call<'_, T>>,
    summary: &mut CollectionSummary,
) -> Result<Option<Vec<T>>> {
    let class = kind.to_string();
    let mut fragments = Vec::new();
    let mut completed = 0;

    for (utility, call) in calls {
        match isolate(&class, utility, call).await? {
            Guarded::Completed(found) => {
                completed += 1;
                fragments.extend(found);
            }
            Guarded::Faulted(reason) => summary.faults.push(Fault {
                kind,
                utility: utility.to_string(),
                reason,
            }),
        }
    }

    Ok((completed > 0).then_some(fragments))
}

fn merge_list<T: Record + Identified + Clone>(existing: &mut [T], fragments: Vec<T>) -> Result<ClassOutcome> {
    if fragments.is_empty() {
        return Ok(ClassOutcome::Empty);
    }

    let join = merge_by_serial(existing, &fragments)?;
    if !join.unmatched.is_empty() {
        warn!(unmatched = ?join.unmatched, "collected components without a known serial were dropped");
    }

    Ok(ClassOutcome::Merged {
        fragments: fragments.len(),
        applied: join.applied,
        unmatched: join.unmatched,
    })
}

fn merge_single<T: Record + Default + PartialEq + Clone>(existing: &mut T, fragments: Vec<T>) -> Result<ClassOutcome> {
    let empty = T::default();
    let mut merged = 0;
    let mut applied = 0;

    for fragment in fragments.iter().filter(|f| **f != empty) {
        merged += 1;
        applied += merge(existing, fragment)?;
    }

    if merged == 0 {
        return Ok(ClassOutcome::Empty);
    }

    Ok(ClassOutcome::Merged {
        fragments: merged,
        applied,
        unmatched: Vec::new(),
    })
}

fn single<'a, T: Send + 'a>(
    utility: &'static str,
    call: BoxFuture<'a, Result<T>>,
) -> Vec<Call<'a, T>> {
    vec![(utility, call.map(|r| r.map(|fragment| vec![fragment])).boxed())]
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs inventory passes with a fixed configuration and executor.
#[derive(Clone)]
pub struct InventoryAction {
    config: CollectorConfig,
    executor: BoxedExecutor,
}

impl InventoryAction {
    pub fn new(config: CollectorConfig, executor: BoxedExecutor) -> Self {
        Self { config, executor }
    }

    /// Orchestrator running utilities on the local host.
    pub fn from_config(config: CollectorConfig) -> Self {
        let executor = config.host_executor();
        Self::new(config, executor)
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run one full inventory pass, mutating `device` in place.
    ///
    /// `collectors` may be partial or absent; empty slots get the host
    /// defaults. A reported collector error ends the pass; a collector
    /// panic only empties that collector's contribution.
    #[instrument(skip_all)]
    pub async fn collect(
        &self,
        cancel: &CancellationToken,
        device: Option<&mut Device>,
        collectors: Option<Collectors>,
    ) -> Result<CollectionSummary> {
        let device = device.ok_or(Error::DeviceMissing)?;

        let mut collectors = collectors.unwrap_or_default();
        collectors.fill_defaults(&self.config, &self.executor);
        info!(collectors = ?collectors, "starting inventory collection");

        if let Some(inventory) = &collectors.inventory {
            inventory
                .collect_inventory(cancel, device)
                .await
                .map_err(|e| Error::collector("inventory", e))?;
        }

        let mut summary = CollectionSummary::default();
        for kind in ComponentKind::ALL {
            check_cancelled(cancel)?;
            self.collect_class(kind, cancel, device, &collectors, &mut summary).await?;
        }

        apply_device_defaults(device);

        info!(
            components = device.component_count(),
            faults = summary.faults.len(),
            "inventory collection finished"
        );
        Ok(summary)
    }

    async fn collect_class(
        &self,
        kind: ComponentKind,
        cancel: &CancellationToken,
        device: &mut Device,
        collectors: &Collectors,
        summary: &mut CollectionSummary,
    ) -> Result<()> {
        let outcome = match kind {
            ComponentKind::Drive => {
                let calls = collectors
                    .drives
                    .iter()
                    .map(|c| (c.name(), c.drives(cancel)))
                    .collect();
                let outcome = self.run_list(kind, calls, &mut device.drives, summary).await?;

                if self.config.collect_drive_capabilities {
                    summary.capability_changes += self
                        .collect_capabilities(cancel, &mut device.drives, collectors, summary)
                        .await?;
                }
                outcome
            }
            ComponentKind::Nic => {
                let calls = collectors
                    .nics
                    .iter()
                    .map(|c| (c.name(), c.nics(cancel)))
                    .collect();
                self.run_list(kind, calls, &mut device.nics, summary).await?
            }
            ComponentKind::StorageController => {
                let calls = collectors
                    .storage_controllers
                    .iter()
                    .map(|c| (c.name(), c.storage_controllers(cancel)))
                    .collect();
                self.run_list(kind, calls, &mut device.storage_controllers, summary)
                    .await?
            }
            ComponentKind::Bmc => {
                let calls = collectors
                    .bmc
                    .iter()
                    .flat_map(|c| single(c.name(), c.bmc(cancel)))
                    .collect();
                self.run_single(kind, calls, &mut device.bmc, summary).await?
            }
            ComponentKind::Bios => {
                let calls = collectors
                    .bios
                    .iter()
                    .flat_map(|c| single(c.name(), c.bios(cancel)))
                    .collect();
                self.run_single(kind, calls, &mut device.bios, summary).await?
            }
            ComponentKind::Cpld => {
                let calls = collectors
                    .cpld
                    .iter()
                    .flat_map(|c| single(c.name(), c.cpld(cancel)))
                    .collect();
                self.run_single(kind, calls, &mut device.cpld, summary).await?
            }
        };

        summary.record(kind, outcome);
        Ok(())
    }

    async fn run_list<T: Record + Identified + Clone>(
        &self,
        kind: ComponentKind,
        calls: Vec<Call<'_, T>>,
        existing: &mut [T],
        summary: &mut CollectionSummary,
    ) -> Result<ClassOutcome> {
        if calls.is_empty() {
            return Ok(ClassOutcome::Skipped);
        }

        match gather(kind, calls, summary).await? {
            Some(fragments) => merge_list(existing, fragments).map_err(|e| Error::collector(kind.to_string(), e)),
            None => Ok(ClassOutcome::Faulted),
        }
    }

    async fn run_single<T: Record + Default + PartialEq + Clone>(
        &self,
        kind: ComponentKind,
        calls: Vec<Call<'_, T>>,
        existing: &mut T,
        summary: &mut CollectionSummary,
    ) -> Result<ClassOutcome> {
        if calls.is_empty() {
            return Ok(ClassOutcome::Skipped);
        }

        match gather(kind, calls, summary).await? {
            Some(fragments) => merge_single(existing, fragments).map_err(|e| Error::collector(kind.to_string(), e)),
            None => Ok(ClassOutcome::Faulted),
        }
    }

    /// Collect and merge the feature set of every drive with a device path.
    async fn collect_capabilities(
        &self,
        cancel: &CancellationToken,
        drives: &mut [Drive],
        collectors: &Collectors,
        summary: &mut CollectionSummary,
    ) -> Result<usize> {
        let class = ComponentKind::Drive.to_string();
        let mut applied = 0;

        for drive in drives.iter_mut().filter(|d| !d.logical_name.is_empty()) {
            check_cancelled(cancel)?;

            let collector = resolve_drive_capability_collector(
                &drive.logical_name,
                &collectors.drive_capabilities,
                self.executor.clone(),
            );
            let utility = collector.name();

            let guarded = isolate(&class, utility, collector.drive_capabilities(cancel, &drive.logical_name)).await?;
            match guarded {
                Guarded::Completed(capabilities) => {
                    let fragment = Drive {
                        capabilities: capabilities.into_iter().collect(),
                        ..Default::default()
                    };
                    // The fragment carries nothing else; a full merge would reset its flags
                    applied += merge_field(drive, &fragment, "Capabilities")
                        .map_err(|e| Error::collector(class.as_str(), e))?;
                }
                Guarded::Faulted(reason) => summary.faults.push(Fault {
                    kind: ComponentKind::Drive,
                    utility: utility.to_string(),
                    reason,
                }),
            }
        }

        Ok(applied)
    }
}

/// Singletons with no model of their own take the device model.
fn apply_device_defaults(device: &mut Device) {
    let model = device.common.model.clone();

    for common in [
        &mut device.bmc.common,
        &mut device.bios.common,
        &mut device.cpld.common,
    ] {
        if common.model.is_empty() {
            common.model = model.clone();
        }
    }
}
