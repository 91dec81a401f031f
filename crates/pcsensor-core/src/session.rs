//! Exclusive access to an opened sensor.
//!
//! A `DeviceSession` exists only while both sensor interfaces are claimed.
//! Dropping it releases interface 1, then interface 0, then closes the
//! device.

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::protocol::{
    CONTROL_REQUEST, CONTROL_REQUEST_TYPE, FRAME_LEN, INIT_INDEX, INIT_VALUE, INTERRUPT_ENDPOINT,
    QUERY_INDEX, QUERY_VALUE, SENSOR_CONFIGURATION, SENSOR_INTERFACES,
};
use crate::transport::{
    ClaimedInterface, ControlSetup, SensorTransport, TransportError, UsbError, UsbHandle,
};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to set USB configuration: {0}")]
    ConfigureFailed(#[source] UsbError),

    #[error("Failed to claim interface {interface}: {source}")]
    ClaimFailed {
        interface: u8,
        #[source]
        source: UsbError,
    },
}

const INIT_SETUP: ControlSetup = ControlSetup {
    request_type: CONTROL_REQUEST_TYPE,
    request: CONTROL_REQUEST,
    value: INIT_VALUE,
    index: INIT_INDEX,
};

const QUERY_SETUP: ControlSetup = ControlSetup {
    request_type: CONTROL_REQUEST_TYPE,
    request: CONTROL_REQUEST,
    value: QUERY_VALUE,
    index: QUERY_INDEX,
};

/// An opened sensor with both interfaces claimed.
pub struct DeviceSession<H: UsbHandle> {
    // Fields drop in declaration order: release in reverse of acquisition,
    // then close.
    data_interface: H::Claim,
    primer_interface: H::Claim,
    handle: H,
}

/// Take exclusive control of `handle`.
///
/// On failure everything acquired so far is released and the handle is
/// closed before returning.
#[instrument(level = "info", skip(handle))]
pub fn establish<H: UsbHandle>(handle: H) -> Result<DeviceSession<H>, SessionError> {
    let [primer, data] = SENSOR_INTERFACES;

    for interface in SENSOR_INTERFACES {
        // Fails when no driver is bound; claiming reports real problems.
        if let Err(e) = handle.detach_kernel_driver(interface) {
            debug!(interface, error = %e, "Kernel driver not detached");
        }
    }

    handle
        .set_configuration(SENSOR_CONFIGURATION)
        .map_err(SessionError::ConfigureFailed)?;

    let primer_interface = claim(&handle, primer)?;
    let data_interface = claim(&handle, data)?;

    info!("Device claimed");
    Ok(DeviceSession {
        data_interface,
        primer_interface,
        handle,
    })
}

fn claim<H: UsbHandle>(handle: &H, interface: u8) -> Result<H::Claim, SessionError> {
    handle
        .claim_interface(interface)
        .map_err(|source| SessionError::ClaimFailed { interface, source })
}

impl<H: UsbHandle> DeviceSession<H> {
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Claimed interface numbers, in acquisition order.
    pub fn interfaces(&self) -> [u8; 2] {
        [
            self.primer_interface.interface_number(),
            self.data_interface.interface_number(),
        ]
    }
}

impl<H: UsbHandle> Drop for DeviceSession<H> {
    fn drop(&mut self) {
        debug!("Releasing device");
    }
}

fn control(
    interface: &impl ClaimedInterface,
    setup: ControlSetup,
    payload: &[u8],
) -> Result<(), TransportError> {
    let sent = interface
        .control_out(setup, payload)
        .map_err(|e| TransportError::ControlFailed(e.to_string()))?;
    if sent != payload.len() {
        return Err(TransportError::ControlFailed(format!(
            "device accepted {sent} of {} bytes",
            payload.len()
        )));
    }
    Ok(())
}

impl<H: UsbHandle> SensorTransport for DeviceSession<H> {
    fn send_control(&self, payload: &[u8]) -> Result<(), TransportError> {
        control(&self.data_interface, QUERY_SETUP, payload)
    }

    fn send_init_control(&self, payload: &[u8]) -> Result<(), TransportError> {
        control(&self.primer_interface, INIT_SETUP, payload)
    }

    fn read_interrupt(&self, buffer: &mut [u8; 8]) -> Result<(), TransportError> {
        let received = self
            .data_interface
            .read_interrupt(INTERRUPT_ENDPOINT, buffer)
            .map_err(|e| TransportError::InterruptFailed(e.to_string()))?;
        if received != FRAME_LEN {
            return Err(TransportError::InterruptFailed(format!(
                "short frame: {received} of {FRAME_LEN} bytes"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceDescriptor;
    use crate::protocol::{SENSOR_PRODUCT_ID, SENSOR_VENDOR_ID};
    use crate::transport::UsbBus;
    use crate::transport::mock::{MockBus, MockHandle, UsbCall};

    fn open_sensor() -> (MockBus, MockHandle) {
        let bus = MockBus::new(vec![DeviceDescriptor {
            vendor_id: SENSOR_VENDOR_ID,
            product_id: SENSOR_PRODUCT_ID,
            bus_number: 1,
            device_address: 5,
        }]);
        let handle = bus.open(0).unwrap();
        (bus, handle)
    }

    /// Journal entries after the initial `Open`.
    fn session_calls(bus: &MockBus) -> Vec<UsbCall> {
        bus.journal().into_iter().skip(1).collect()
    }

    #[test]
    fn test_establish_and_release_order() {
        let (bus, handle) = open_sensor();

        let session = establish(handle).unwrap();
        assert_eq!(session.interfaces(), [0, 1]);
        drop(session);

        assert_eq!(
            session_calls(&bus),
            vec![
                UsbCall::Detach(0),
                UsbCall::Detach(1),
                UsbCall::SetConfiguration(1),
                UsbCall::Claim(0),
                UsbCall::Claim(1),
                UsbCall::Release(1),
                UsbCall::Release(0),
                UsbCall::Close,
            ]
        );
    }

    #[test]
    fn test_detach_failure_is_not_fatal() {
        let (bus, handle) = open_sensor();
        bus.fail_detach();

        assert!(establish(handle).is_ok());
    }

    #[test]
    fn test_configure_failure_closes_handle() {
        let (bus, handle) = open_sensor();
        bus.fail_configure();

        assert!(matches!(
            establish(handle),
            Err(SessionError::ConfigureFailed(_))
        ));
        assert_eq!(session_calls(&bus).last(), Some(&UsbCall::Close));
        assert!(!session_calls(&bus).contains(&UsbCall::Claim(0)));
    }

    #[test]
    fn test_claim_zero_failure() {
        let (bus, handle) = open_sensor();
        bus.fail_claim(0);

        assert!(matches!(
            establish(handle),
            Err(SessionError::ClaimFailed { interface: 0, .. })
        ));
        assert_eq!(
            session_calls(&bus),
            vec![
                UsbCall::Detach(0),
                UsbCall::Detach(1),
                UsbCall::SetConfiguration(1),
                UsbCall::Close,
            ]
        );
    }

    #[test]
    fn test_claim_one_failure_releases_zero() {
        let (bus, handle) = open_sensor();
        bus.fail_claim(1);

        assert!(matches!(
            establish(handle),
            Err(SessionError::ClaimFailed { interface: 1, .. })
        ));
        assert_eq!(
            session_calls(&bus),
            vec![
                UsbCall::Detach(0),
                UsbCall::Detach(1),
                UsbCall::SetConfiguration(1),
                UsbCall::Claim(0),
                UsbCall::Release(0),
                UsbCall::Close,
            ]
        );
    }

    #[test]
    fn test_transfer_routing() {
        let (bus, handle) = open_sensor();
        let session = establish(handle).unwrap();
        bus.queue_frame(&[0; 8]);

        session.send_init_control(&[0x01, 0x01]).unwrap();
        session.send_control(&[0x01, 0x80, 0x33, 0x01, 0, 0, 0, 0]).unwrap();
        let mut buf = [0xAA; 8];
        session.read_interrupt(&mut buf).unwrap();
        assert_eq!(buf, [0; 8]);

        let transfers: Vec<_> = bus
            .journal()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    UsbCall::ControlOut { .. } | UsbCall::ReadInterrupt { .. }
                )
            })
            .collect();
        assert_eq!(
            transfers,
            vec![
                UsbCall::ControlOut {
                    interface: 0,
                    setup: INIT_SETUP,
                    data: vec![0x01, 0x01],
                },
                UsbCall::ControlOut {
                    interface: 1,
                    setup: QUERY_SETUP,
                    data: vec![0x01, 0x80, 0x33, 0x01, 0, 0, 0, 0],
                },
                UsbCall::ReadInterrupt {
                    interface: 1,
                    endpoint: 0x82,
                },
            ]
        );
    }

    #[test]
    fn test_short_transfers_fail() {
        let (bus, handle) = open_sensor();
        let session = establish(handle).unwrap();

        bus.queue_frame(&[0; 5]);
        let mut buf = [0u8; 8];
        assert!(matches!(
            session.read_interrupt(&mut buf),
            Err(TransportError::InterruptFailed(_))
        ));

        bus.short_control(4);
        assert!(matches!(
            session.send_control(&[0x01, 0x82, 0x77, 0x01, 0, 0, 0, 0]),
            Err(TransportError::ControlFailed(_))
        ));
    }
}
