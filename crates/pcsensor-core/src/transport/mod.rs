//! Transport layer module.

pub mod mock;
pub mod nusb;
pub mod traits;

pub use mock::{MockBus, MockTransport};
pub use nusb::{NusbBus, NusbDevice, NusbInterface};
pub use traits::{
    ClaimedInterface, ControlSetup, SensorTransport, TransferKind, TransportError, UsbBus,
    UsbError, UsbHandle,
};
