//! pcsensor-core: driver for the TEMPer1 USB temperature sensor (0c45:7401).
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Device**: enumeration and selection among identical sensors
//! - **Session**: exclusive claim of both sensor interfaces, released on drop
//! - **Transport**: USB communication abstraction (nusb, mock)
//! - **Protocol**: constants, frames and the fixed query sequence
//! - **Events**: Observer pattern for UI decoupling
//! - **Report** / **Config**: output formatting and persisted settings
//! - **Sensor**: High-level orchestrator
//!
//! # Example
//!
//! ```no_run
//! use pcsensor_core::{DeviceSelector, read_sensor};
//!
//! let temperature = read_sensor(DeviceSelector::any()).expect("reading failed");
//! println!("{temperature}");
//! ```

pub mod config;
pub mod device;
pub mod events;
pub mod protocol;
pub mod report;
pub mod sensor;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use config::SensorConfig;
pub use device::{DeviceDescriptor, DeviceSelector, LocateError, find_device, list_sensors};
pub use events::{NullObserver, SensorEvent, SensorObserver, TracingObserver};
pub use protocol::{ProtocolError, Temperature, read_temperature};
pub use report::{OutputMode, Reporter, format_reading};
pub use sensor::{Error, Sensor, read_sensor};
pub use session::{DeviceSession, SessionError, establish};
pub use transport::{MockTransport, NusbBus, SensorTransport, TransportError, UsbError};
