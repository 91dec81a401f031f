//! Sensor discovery.
//!
//! Several identical sensors may share a host. A `DeviceSelector` narrows
//! the search by bus and device address; without one the first sensor in
//! enumeration order wins.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::protocol::{SENSOR_PRODUCT_ID, SENSOR_VENDOR_ID};
use crate::transport::{UsbBus, UsbError};

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("Invalid selector: a device address requires a bus number")]
    InvalidSelector,

    #[error("Failed to enumerate USB devices: {0}")]
    EnumerationFailed(#[source] UsbError),

    #[error("Device not found: VID={vid:04X} PID={pid:04X}{selector}")]
    NotFound {
        vid: u16,
        pid: u16,
        selector: DeviceSelector,
    },

    #[error("Failed to open {device}: {source}")]
    OpenFailed {
        device: DeviceDescriptor,
        #[source]
        source: UsbError,
    },
}

/// Identity of one enumerated USB device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub device_address: u8,
}

impl DeviceDescriptor {
    pub fn is_sensor(&self) -> bool {
        self.vendor_id == SENSOR_VENDOR_ID && self.product_id == SENSOR_PRODUCT_ID
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus {:03} device {:03}: ID {:04x}:{:04x}",
            self.bus_number, self.device_address, self.vendor_id, self.product_id
        )
    }
}

/// Caller-supplied filter over bus number and device address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    pub bus: Option<u8>,
    pub device_address: Option<u8>,
}

impl DeviceSelector {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn on_bus(bus: u8) -> Self {
        Self {
            bus: Some(bus),
            device_address: None,
        }
    }

    pub fn at(bus: u8, device_address: u8) -> Self {
        Self {
            bus: Some(bus),
            device_address: Some(device_address),
        }
    }

    /// An address is only meaningful together with its bus.
    pub fn validate(&self) -> Result<(), LocateError> {
        if self.device_address.is_some() && self.bus.is_none() {
            return Err(LocateError::InvalidSelector);
        }
        Ok(())
    }

    pub fn matches(&self, desc: &DeviceDescriptor) -> bool {
        self.bus.is_none_or(|bus| desc.bus_number == bus)
            && self
                .device_address
                .is_none_or(|addr| desc.device_address == addr)
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bus) = self.bus {
            write!(f, " on bus {bus:03}")?;
        }
        if let Some(addr) = self.device_address {
            write!(f, " at address {addr:03}")?;
        }
        Ok(())
    }
}

/// Open the first attached sensor accepted by `selector`.
///
/// An open failure is final: later matches are not tried.
#[instrument(level = "info", skip(bus))]
pub fn find_device<B: UsbBus>(
    bus: &B,
    selector: DeviceSelector,
) -> Result<B::Handle, LocateError> {
    selector.validate()?;

    let candidate = bus
        .enumerate()
        .map_err(LocateError::EnumerationFailed)?
        .into_iter()
        .find(|(desc, _)| desc.is_sensor() && selector.matches(desc));

    let Some((desc, candidate)) = candidate else {
        debug!("No suitable device found");
        return Err(LocateError::NotFound {
            vid: SENSOR_VENDOR_ID,
            pid: SENSOR_PRODUCT_ID,
            selector,
        });
    };

    info!(device = %desc, "Found sensor");

    let handle = bus.open(candidate).map_err(|source| LocateError::OpenFailed {
        device: desc,
        source,
    })?;

    info!("Device opened");
    Ok(handle)
}

/// Every attached sensor accepted by `selector`, in enumeration order.
pub fn list_sensors<B: UsbBus>(
    bus: &B,
    selector: DeviceSelector,
) -> Result<Vec<DeviceDescriptor>, LocateError> {
    selector.validate()?;

    Ok(bus
        .enumerate()
        .map_err(LocateError::EnumerationFailed)?
        .into_iter()
        .map(|(desc, _)| desc)
        .filter(|desc| desc.is_sensor() && selector.matches(desc))
        .collect())
}
