//! Folding the baseline inventory into a device.
//!
//! The baseline collector is the first writer: it establishes which
//! components exist. Unlike class collectors its unmatched fragments are
//! appended, not dropped, and components already present are merged under
//! the usual non-destructive rules.

use tracing::debug;

use crate::error::Result;
use crate::merge::{merge, merge_by_serial, Identified, Record};
use crate::model::Device;

fn absorb_list<T: Record + Identified + Clone>(existing: &mut Vec<T>, found: Vec<T>) -> Result<usize> {
    let mut appended = 0;

    for fragment in found {
        let summary = merge_by_serial(existing.as_mut_slice(), std::slice::from_ref(&fragment))?;
        if summary.matched == 0 {
            existing.push(fragment);
            appended += 1;
        }
    }

    Ok(appended)
}

/// Merge a freshly discovered device shape into `device`.
pub fn absorb_baseline(device: &mut Device, found: Device) -> Result<()> {
    merge(&mut device.common, &found.common)?;
    merge(&mut device.bmc, &found.bmc)?;
    merge(&mut device.bios, &found.bios)?;
    merge(&mut device.cpld, &found.cpld)?;

    let drives = absorb_list(&mut device.drives, found.drives)?;
    let nics = absorb_list(&mut device.nics, found.nics)?;
    let controllers = absorb_list(&mut device.storage_controllers, found.storage_controllers)?;

    debug!(drives, nics, storage_controllers = controllers, "baseline components appended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Drive, Nic};

    fn drive(serial: &str, model: &str) -> Drive {
        let mut d = Drive::default();
        d.common.serial = serial.into();
        d.common.model = model.into();
        d
    }

    #[test]
    fn test_empty_device_takes_baseline_shape() {
        let mut found = Device::new("Supermicro", "SYS-510T-MR", "S421337X1");
        found.drives = vec![drive("A", "m1"), drive("B", "m2")];
        found.nics = vec![Nic::default()];

        let mut device = Device::default();
        absorb_baseline(&mut device, found.clone()).unwrap();

        assert_eq!(device, found);
    }

    #[test]
    fn test_known_components_are_merged_not_duplicated() {
        let mut device = Device::new("", "Known", "S1");
        let mut known = drive("a", "");
        known.logical_name = "/dev/sda".into();
        device.drives.push(known);

        let mut found = Device::new("Supermicro", "Guess", "S1");
        found.drives = vec![drive("A", "Micron_5200"), drive("C", "m3")];

        absorb_baseline(&mut device, found).unwrap();

        assert_eq!(device.common.vendor, "Supermicro");
        // Model is overwritable
        assert_eq!(device.common.model, "Guess");
        assert_eq!(device.drives.len(), 2);
        assert_eq!(device.drives[0].common.model, "Micron_5200");
        assert_eq!(device.drives[0].logical_name, "/dev/sda");
        assert_eq!(device.drives[1].common.serial, "C");
    }

    #[test]
    fn test_serial_less_components_are_appended() {
        let mut device = Device::default();
        device.nics.push(Nic::default());

        let mut found = Device::default();
        found.nics.push(Nic::default());

        absorb_baseline(&mut device, found).unwrap();
        assert_eq!(device.nics.len(), 2);
    }
}
