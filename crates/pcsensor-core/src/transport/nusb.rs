//! nusb-based USB backend.
//!
//! Key nusb 0.2 API patterns:
//! - `list_devices().wait()` for enumeration
//! - `device_info.open().wait()` to open
//! - `device.set_configuration(n).wait()` / `device.claim_interface(n).wait()`
//! - `interface.control_out(ControlOut { .. }, timeout).wait()`
//! - `interface.endpoint::<Interrupt, In>(addr)` + `submit` / `wait_next_complete`

use nusb::transfer::{ControlOut, ControlType, In, Interrupt, Recipient};
use nusb::{Device, DeviceInfo, Interface, MaybeFuture, list_devices};
use tracing::{debug, instrument, trace};

use super::traits::{ClaimedInterface, ControlSetup, UsbBus, UsbError, UsbHandle};
use crate::device::DeviceDescriptor;
use crate::protocol::{TRANSFER_TIMEOUT, TRANSFER_TIMEOUT_MS};

fn backend(e: impl std::fmt::Display) -> UsbError {
    UsbError::Backend(e.to_string())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn bus_number(info: &DeviceInfo) -> u8 {
    info.busnum()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn bus_number(info: &DeviceInfo) -> u8 {
    // Bus ids are only numeric on some platforms.
    info.bus_id().parse().unwrap_or_default()
}

fn descriptor(info: &DeviceInfo) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        bus_number: bus_number(info),
        device_address: info.device_address(),
    }
}

/// The host's USB buses, as seen by nusb.
#[derive(Debug, Default, Clone, Copy)]
pub struct NusbBus;

impl UsbBus for NusbBus {
    type Candidate = DeviceInfo;
    type Handle = NusbDevice;

    #[instrument(level = "debug", skip(self))]
    fn enumerate(&self) -> Result<Vec<(DeviceDescriptor, DeviceInfo)>, UsbError> {
        let devices: Vec<_> = list_devices()
            .wait()
            .map_err(backend)?
            .map(|info| (descriptor(&info), info))
            .collect();

        debug!(count = devices.len(), "Enumerated USB devices");
        Ok(devices)
    }

    fn open(&self, info: DeviceInfo) -> Result<NusbDevice, UsbError> {
        let descriptor = descriptor(&info);
        let device = info.open().wait().map_err(backend)?;
        Ok(NusbDevice { device, descriptor })
    }
}

/// An open device. nusb closes it once this and every claimed interface
/// are dropped.
pub struct NusbDevice {
    device: Device,
    descriptor: DeviceDescriptor,
}

impl UsbHandle for NusbDevice {
    type Claim = NusbInterface;

    fn descriptor(&self) -> DeviceDescriptor {
        self.descriptor
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn detach_kernel_driver(&self, interface: u8) -> Result<(), UsbError> {
        self.device
            .detach_kernel_driver(interface)
            .map_err(backend)
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn detach_kernel_driver(&self, _interface: u8) -> Result<(), UsbError> {
        Err(UsbError::Unsupported("kernel driver detach"))
    }

    fn set_configuration(&self, configuration: u8) -> Result<(), UsbError> {
        self.device
            .set_configuration(configuration)
            .wait()
            .map_err(backend)
    }

    fn claim_interface(&self, interface: u8) -> Result<NusbInterface, UsbError> {
        let claimed = self
            .device
            .claim_interface(interface)
            .wait()
            .map_err(backend)?;
        Ok(NusbInterface {
            interface: claimed,
            number: interface,
        })
    }
}

/// A claimed interface. Dropping it releases the claim.
pub struct NusbInterface {
    interface: Interface,
    number: u8,
}

fn split_request_type(request_type: u8) -> Result<(ControlType, Recipient), UsbError> {
    if request_type & 0x80 != 0 {
        return Err(backend(format!("0x{request_type:02x} is device-to-host")));
    }
    let control_type = match (request_type >> 5) & 0x03 {
        0 => ControlType::Standard,
        1 => ControlType::Class,
        2 => ControlType::Vendor,
        _ => return Err(backend(format!("reserved request type 0x{request_type:02x}"))),
    };
    let recipient = match request_type & 0x1f {
        0 => Recipient::Device,
        1 => Recipient::Interface,
        2 => Recipient::Endpoint,
        3 => Recipient::Other,
        _ => return Err(backend(format!("reserved recipient in 0x{request_type:02x}"))),
    };
    Ok((control_type, recipient))
}

impl ClaimedInterface for NusbInterface {
    fn interface_number(&self) -> u8 {
        self.number
    }

    #[instrument(skip(self, data), fields(interface = self.number, len = data.len()))]
    fn control_out(&self, setup: ControlSetup, data: &[u8]) -> Result<usize, UsbError> {
        let (control_type, recipient) = split_request_type(setup.request_type)?;

        self.interface
            .control_out(
                ControlOut {
                    control_type,
                    recipient,
                    request: setup.request,
                    value: setup.value,
                    index: setup.index,
                    data,
                },
                TRANSFER_TIMEOUT,
            )
            .wait()
            .map_err(backend)?;

        trace!(bytes_written = data.len(), "Control transfer complete");
        Ok(data.len())
    }

    #[instrument(skip(self, buf), fields(interface = self.number, endpoint = %format!("0x{:02X}", endpoint)))]
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize, UsbError> {
        let mut ep = self
            .interface
            .endpoint::<Interrupt, In>(endpoint)
            .map_err(backend)?;

        let request = ep.allocate(buf.len());
        ep.submit(request);

        let Some(completion) = ep.wait_next_complete(TRANSFER_TIMEOUT) else {
            ep.cancel_all();
            return Err(UsbError::Timeout {
                timeout_ms: TRANSFER_TIMEOUT_MS,
            });
        };
        completion.status.map_err(backend)?;

        let data = &completion.buffer[..];
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);

        trace!(bytes_read = n, "Interrupt transfer complete");
        Ok(n)
    }
}
