//! Sensor - high-level orchestrator for one reading.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use crate::device::{DeviceDescriptor, DeviceSelector, LocateError, find_device, list_sensors};
use crate::events::{SensorEvent, SensorObserver, TracingObserver};
use crate::protocol::{ProtocolError, Temperature, read_temperature_observed};
use crate::session::{SessionError, establish};
use crate::transport::{NusbBus, UsbBus, UsbHandle};

/// Any failure while taking a reading.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// One sensor, picked out by a selector.
pub struct Sensor<B: UsbBus, O: SensorObserver> {
    bus: B,
    selector: DeviceSelector,
    observer: Arc<O>,
}

impl Sensor<NusbBus, TracingObserver> {
    /// Sensor on the host's USB buses with the default tracing observer.
    pub fn new(selector: DeviceSelector) -> Self {
        Self::with_bus(NusbBus, selector, Arc::new(TracingObserver))
    }
}

impl<B: UsbBus, O: SensorObserver> Sensor<B, O> {
    pub fn with_bus(bus: B, selector: DeviceSelector, observer: Arc<O>) -> Self {
        Self {
            bus,
            selector,
            observer,
        }
    }

    pub fn selector(&self) -> DeviceSelector {
        self.selector
    }

    /// Locate, claim and query the sensor.
    ///
    /// The device is released before this returns, whatever the outcome.
    #[instrument(skip(self), fields(selector = ?self.selector))]
    pub fn read(&self) -> Result<Temperature, Error> {
        let handle = find_device(&self.bus, self.selector)?;
        self.observer.on_event(&SensorEvent::DeviceOpened {
            device: handle.descriptor(),
        });

        let session = establish(handle)?;
        self.observer.on_event(&SensorEvent::SessionEstablished);

        let temperature = read_temperature_observed(&session, self.observer.as_ref())?;
        Ok(temperature)
    }

    /// All attached sensors the selector accepts.
    pub fn list(&self) -> Result<Vec<DeviceDescriptor>, Error> {
        Ok(list_sensors(&self.bus, self.selector)?)
    }
}

/// Take one reading from the first sensor matching `selector`.
pub fn read_sensor(selector: DeviceSelector) -> Result<Temperature, Error> {
    Sensor::new(selector).read()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::protocol::{SENSOR_PRODUCT_ID, SENSOR_VENDOR_ID};
    use crate::transport::mock::{MockBus, UsbCall};

    fn sensor_bus() -> MockBus {
        MockBus::new(vec![DeviceDescriptor {
            vendor_id: SENSOR_VENDOR_ID,
            product_id: SENSOR_PRODUCT_ID,
            bus_number: 2,
            device_address: 11,
        }])
    }

    fn sensor(bus: MockBus) -> Sensor<MockBus, NullObserver> {
        Sensor::with_bus(bus, DeviceSelector::any(), Arc::new(NullObserver))
    }

    fn tail(journal: &[UsbCall], n: usize) -> &[UsbCall] {
        &journal[journal.len() - n..]
    }

    #[test]
    fn test_full_reading() {
        let bus = sensor_bus();
        for _ in 0..4 {
            bus.queue_frame(&[0; 8]);
        }
        bus.queue_frame(&[0x00, 0x00, 0x01, 0x2C, 0x00, 0x00, 0x00, 0x00]);
        let sensor = sensor(bus);

        assert_eq!(sensor.read().unwrap(), Temperature(1.171875));

        let journal = sensor.bus.journal();
        assert_eq!(
            tail(&journal, 3),
            &[UsbCall::Release(1), UsbCall::Release(0), UsbCall::Close]
        );
    }

    #[test]
    fn test_protocol_failure_still_releases() {
        let bus = sensor_bus();
        bus.queue_frame(&[0; 8]);
        let sensor = sensor(bus);

        let err = sensor.read().unwrap_err();
        assert!(matches!(err, Error::Protocol(ProtocolError { step: 5, .. })));

        let journal = sensor.bus.journal();
        assert_eq!(
            tail(&journal, 3),
            &[UsbCall::Release(1), UsbCall::Release(0), UsbCall::Close]
        );
        let releases = journal
            .iter()
            .filter(|call| matches!(call, UsbCall::Release(_)))
            .count();
        assert_eq!(releases, 2);
    }

    #[test]
    fn test_error_kinds() {
        let invalid = Sensor::with_bus(
            sensor_bus(),
            DeviceSelector {
                bus: None,
                device_address: Some(11),
            },
            Arc::new(NullObserver),
        );
        assert!(matches!(
            invalid.read(),
            Err(Error::Locate(LocateError::InvalidSelector))
        ));

        let bus = sensor_bus();
        bus.fail_claim(1);
        assert!(matches!(
            sensor(bus).read(),
            Err(Error::Session(SessionError::ClaimFailed { interface: 1, .. }))
        ));

        let missing = Sensor::with_bus(
            sensor_bus(),
            DeviceSelector::on_bus(3),
            Arc::new(NullObserver),
        );
        assert!(matches!(
            missing.read(),
            Err(Error::Locate(LocateError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_list() {
        let sensor = sensor(sensor_bus());
        let found = sensor.list().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].device_address, 11);
    }
}
