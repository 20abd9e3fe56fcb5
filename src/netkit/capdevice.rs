//! Live capture device enumeration.
//!
//! A thin wrapper over the `pcap` crate's device-listing API, not a
//! reimplementation — `CapDevice::instances` is `pcap::Device::list`
//! filtered down to the fields this crate's capture engine needs.

use crate::error::CapError;

/// One network interface `pcap` can open for live capture. The MAC address
/// and SNMP interface index the source exposes come from OS-specific
/// interfaces `pcap` itself does not surface; this port leaves them unset
/// rather than reimplement a platform ioctl/netlink lookup this crate has
/// no other use for.
#[derive(Debug, Clone)]
pub struct CapDevice {
    name: String,
    description: Option<String>,
    mac_addr: Option<[u8; 6]>,
    if_index: u32,
}

impl CapDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn mac_addr(&self) -> Option<[u8; 6]> {
        self.mac_addr
    }

    pub fn if_index(&self) -> u32 {
        self.if_index
    }

    /// Enumerate every device `pcap` can see.
    pub fn instances() -> Result<Vec<CapDevice>, CapError> {
        let devices = pcap::Device::list().map_err(|e| CapError::Pcap(e.to_string()))?;
        Ok(devices
            .into_iter()
            .enumerate()
            .map(|(i, d)| CapDevice { name: d.name, description: d.desc, mac_addr: None, if_index: i as u32 + 1 })
            .collect())
    }

    pub fn num_devices() -> Result<usize, CapError> {
        Ok(Self::instances()?.len())
    }

    pub fn instance(index: usize) -> Result<CapDevice, CapError> {
        Self::instances()?.into_iter().nth(index).ok_or(CapError::DeviceNotFound)
    }

    pub fn find(name: &str) -> Result<CapDevice, CapError> {
        Self::instances()?.into_iter().find(|d| d.name == name).ok_or(CapError::DeviceNotFound)
    }

    /// The device `pcap` considers the default capture-worthy interface.
    pub fn any() -> Result<CapDevice, CapError> {
        let d = pcap::Device::lookup().map_err(|e| CapError::Pcap(e.to_string()))?.ok_or(CapError::DeviceNotFound)?;
        Ok(CapDevice { name: d.name, description: d.desc, mac_addr: None, if_index: 0 })
    }
}
