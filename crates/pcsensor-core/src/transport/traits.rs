//! USB Transport layer abstraction.
//!
//! Two levels live here:
//!
//! - `UsbBus`, `UsbHandle` and `ClaimedInterface`: the raw capabilities a
//!   USB backend provides (enumerate, open, detach, configure, claim,
//!   control-out, interrupt-in).
//! - `SensorTransport`: the three transfers the query protocol needs, with
//!   the sensor's fixed control parameters and exact-length checks.

use thiserror::Error;

use crate::device::DeviceDescriptor;

/// Failure reported by a USB backend primitive.
#[derive(Error, Debug)]
pub enum UsbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("USB error: {0}")]
    Backend(String),

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),
}

/// Failure of one sensor-level transfer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("control transfer failed: {0}")]
    ControlFailed(String),

    #[error("interrupt transfer failed: {0}")]
    InterruptFailed(String),
}

/// Kind of transfer a protocol step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Control,
    Interrupt,
}

impl std::fmt::Display for TransferKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferKind::Control => write!(f, "control"),
            TransferKind::Interrupt => write!(f, "interrupt"),
        }
    }
}

impl TransportError {
    pub fn kind(&self) -> TransferKind {
        match self {
            TransportError::ControlFailed(_) => TransferKind::Control,
            TransportError::InterruptFailed(_) => TransferKind::Interrupt,
        }
    }
}

/// Setup packet fields of a host-to-device control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

/// Enumeration and open.
pub trait UsbBus {
    /// Backend token for one enumerated device.
    type Candidate;
    type Handle: UsbHandle;

    /// List attached devices in platform order.
    fn enumerate(&self) -> Result<Vec<(DeviceDescriptor, Self::Candidate)>, UsbError>;

    fn open(&self, candidate: Self::Candidate) -> Result<Self::Handle, UsbError>;
}

/// An open device. Dropping it closes the device.
pub trait UsbHandle {
    /// Dropping a claim releases the interface.
    type Claim: ClaimedInterface;

    fn descriptor(&self) -> DeviceDescriptor;

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), UsbError>;

    fn set_configuration(&self, configuration: u8) -> Result<(), UsbError>;

    fn claim_interface(&self, interface: u8) -> Result<Self::Claim, UsbError>;
}

/// A claimed interface.
pub trait ClaimedInterface {
    fn interface_number(&self) -> u8;

    /// Returns the number of bytes the device accepted.
    fn control_out(&self, setup: ControlSetup, data: &[u8]) -> Result<usize, UsbError>;

    /// Returns the number of bytes received.
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize, UsbError>;
}

/// The transfers the sensor protocol is built from.
///
/// Implementations never retry: one failed transfer fails the call.
pub trait SensorTransport {
    /// Query transfer (value 0x0200, index 1).
    fn send_control(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// One-shot primer transfer (value 0x0201, index 0).
    fn send_init_control(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Read one full 8-byte frame from the interrupt endpoint.
    fn read_interrupt(&self, buffer: &mut [u8; 8]) -> Result<(), TransportError>;
}
