//! Mock USB backends for testing.
//!
//! - `MockTransport` fakes the sensor-level transfers and records them.
//! - `MockBus` fakes enumeration, open, configure and claim, and keeps a
//!   journal of every acquisition and release.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::traits::{
    ClaimedInterface, ControlSetup, SensorTransport, TransportError, UsbBus, UsbError, UsbHandle,
};
use crate::device::DeviceDescriptor;
use crate::protocol::TRANSFER_TIMEOUT_MS;

/// One sensor-level transfer seen by `MockTransport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    InitControl(Vec<u8>),
    Control(Vec<u8>),
    ReadInterrupt,
}

/// Mock transport for unit testing the query sequence.
pub struct MockTransport {
    /// Queued frames to return on interrupt reads.
    frame_queue: Arc<Mutex<VecDeque<[u8; 8]>>>,
    /// Captured calls, in order.
    call_log: Arc<Mutex<Vec<Call>>>,
    /// 1-based call number that fails, if any.
    fail_at: Option<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            frame_queue: Arc::new(Mutex::new(VecDeque::new())),
            call_log: Arc::new(Mutex::new(Vec::new())),
            fail_at: None,
        }
    }

    /// Queue a frame to be returned on the next interrupt read.
    pub fn queue_frame(&self, frame: [u8; 8]) {
        self.frame_queue.lock().unwrap().push_back(frame);
    }

    /// Fail the `call`-th transfer (1-based).
    pub fn fail_at(&mut self, call: usize) {
        self.fail_at = Some(call);
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<Call> {
        self.call_log.lock().unwrap().clone()
    }

    /// Record `call` and report whether it is the one set up to fail.
    fn record(&self, call: Call) -> bool {
        let mut log = self.call_log.lock().unwrap();
        log.push(call);
        self.fail_at == Some(log.len())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTransport for MockTransport {
    fn send_control(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.record(Call::Control(payload.to_vec())) {
            return Err(TransportError::ControlFailed("injected failure".into()));
        }
        Ok(())
    }

    fn send_init_control(&self, payload: &[u8]) -> Result<(), TransportError> {
        if self.record(Call::InitControl(payload.to_vec())) {
            return Err(TransportError::ControlFailed("injected failure".into()));
        }
        Ok(())
    }

    fn read_interrupt(&self, buffer: &mut [u8; 8]) -> Result<(), TransportError> {
        if self.record(Call::ReadInterrupt) {
            return Err(TransportError::InterruptFailed("injected failure".into()));
        }
        let frame = self.frame_queue.lock().unwrap().pop_front().ok_or_else(|| {
            TransportError::InterruptFailed(format!("Timeout after {TRANSFER_TIMEOUT_MS}ms"))
        })?;
        *buffer = frame;
        Ok(())
    }
}

/// One primitive operation seen by `MockBus` and its handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsbCall {
    Enumerate,
    Open(DeviceDescriptor),
    Detach(u8),
    SetConfiguration(u8),
    Claim(u8),
    ControlOut {
        interface: u8,
        setup: ControlSetup,
        data: Vec<u8>,
    },
    ReadInterrupt {
        interface: u8,
        endpoint: u8,
    },
    Release(u8),
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    journal: Vec<UsbCall>,
    frames: VecDeque<Vec<u8>>,
    fail_enumerate: bool,
    fail_open: HashSet<usize>,
    fail_detach: bool,
    fail_configure: bool,
    fail_claim: Option<u8>,
    /// Bytes accepted per control-out, if shorter than the payload.
    control_accepts: Option<usize>,
}

type SharedState = Arc<Mutex<MockState>>;

fn log(state: &SharedState, call: UsbCall) {
    state.lock().unwrap().journal.push(call);
}

fn injected(what: &str) -> UsbError {
    UsbError::Backend(format!("injected {what} failure"))
}

/// Fake USB bus holding a fixed device list.
///
/// All handles opened from one bus share its journal and frame queue.
pub struct MockBus {
    devices: Vec<DeviceDescriptor>,
    state: SharedState,
}

impl MockBus {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Every primitive call so far, in order.
    pub fn journal(&self) -> Vec<UsbCall> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Queue a frame (of any length) for the next interrupt read.
    pub fn queue_frame(&self, frame: &[u8]) {
        self.state.lock().unwrap().frames.push_back(frame.to_vec());
    }

    pub fn fail_enumerate(&self) {
        self.state.lock().unwrap().fail_enumerate = true;
    }

    /// Fail opening the device at `index` in the device list.
    pub fn fail_open(&self, index: usize) {
        self.state.lock().unwrap().fail_open.insert(index);
    }

    pub fn fail_detach(&self) {
        self.state.lock().unwrap().fail_detach = true;
    }

    pub fn fail_configure(&self) {
        self.state.lock().unwrap().fail_configure = true;
    }

    pub fn fail_claim(&self, interface: u8) {
        self.state.lock().unwrap().fail_claim = Some(interface);
    }

    /// Make every control-out accept only `len` bytes.
    pub fn short_control(&self, len: usize) {
        self.state.lock().unwrap().control_accepts = Some(len);
    }
}

impl UsbBus for MockBus {
    type Candidate = usize;
    type Handle = MockHandle;

    fn enumerate(&self) -> Result<Vec<(DeviceDescriptor, usize)>, UsbError> {
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.journal.push(UsbCall::Enumerate);
            state.fail_enumerate
        };
        if fail {
            return Err(injected("enumerate"));
        }
        Ok(self.devices.iter().copied().zip(0..).collect())
    }

    fn open(&self, candidate: usize) -> Result<MockHandle, UsbError> {
        let descriptor = self.devices[candidate];
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.journal.push(UsbCall::Open(descriptor));
            state.fail_open.contains(&candidate)
        };
        if fail {
            return Err(injected("open"));
        }
        Ok(MockHandle {
            descriptor,
            state: Arc::clone(&self.state),
        })
    }
}

/// Fake open device. Logs `Close` when dropped.
#[derive(Debug)]
pub struct MockHandle {
    descriptor: DeviceDescriptor,
    state: SharedState,
}

impl UsbHandle for MockHandle {
    type Claim = MockClaim;

    fn descriptor(&self) -> DeviceDescriptor {
        self.descriptor
    }

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(UsbCall::Detach(interface));
        if state.fail_detach {
            return Err(injected("detach"));
        }
        Ok(())
    }

    fn set_configuration(&self, configuration: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(UsbCall::SetConfiguration(configuration));
        if state.fail_configure {
            return Err(injected("configure"));
        }
        Ok(())
    }

    fn claim_interface(&self, interface: u8) -> Result<MockClaim, UsbError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_claim == Some(interface) {
            return Err(injected("claim"));
        }
        state.journal.push(UsbCall::Claim(interface));
        Ok(MockClaim {
            interface,
            state: Arc::clone(&self.state),
        })
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        log(&self.state, UsbCall::Close);
    }
}

/// Fake interface claim. Logs `Release` when dropped.
#[derive(Debug)]
pub struct MockClaim {
    interface: u8,
    state: SharedState,
}

impl ClaimedInterface for MockClaim {
    fn interface_number(&self) -> u8 {
        self.interface
    }

    fn control_out(&self, setup: ControlSetup, data: &[u8]) -> Result<usize, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(UsbCall::ControlOut {
            interface: self.interface,
            setup,
            data: data.to_vec(),
        });
        Ok(state.control_accepts.unwrap_or(data.len()).min(data.len()))
    }

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize, UsbError> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(UsbCall::ReadInterrupt {
            interface: self.interface,
            endpoint,
        });
        let frame = state.frames.pop_front().ok_or(UsbError::Timeout {
            timeout_ms: TRANSFER_TIMEOUT_MS,
        })?;
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }
}

impl Drop for MockClaim {
    fn drop(&mut self) {
        log(&self.state, UsbCall::Release(self.interface));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_frame_queue() {
        let mock = MockTransport::new();
        mock.queue_frame([1, 2, 3, 4, 5, 6, 7, 8]);

        let mut buf = [0u8; 8];
        mock.read_interrupt(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);

        // Queue is empty now
        assert!(matches!(
            mock.read_interrupt(&mut buf),
            Err(TransportError::InterruptFailed(_))
        ));
    }

    #[test]
    fn test_mock_call_capture() {
        let mut mock = MockTransport::new();
        mock.fail_at(3);

        mock.send_init_control(&[0x01, 0x01]).unwrap();
        mock.send_control(b"Hello").unwrap();
        assert!(mock.send_control(b"World").is_err());

        let calls = mock.get_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Call::InitControl(vec![0x01, 0x01]));
        assert_eq!(calls[1], Call::Control(b"Hello".to_vec()));
        assert_eq!(calls[2], Call::Control(b"World".to_vec()));
    }

    #[test]
    fn test_mock_bus_journal() {
        let desc = DeviceDescriptor {
            vendor_id: 0x0c45,
            product_id: 0x7401,
            bus_number: 1,
            device_address: 2,
        };
        let bus = MockBus::new(vec![desc]);

        let (_, candidate) = bus.enumerate().unwrap().remove(0);
        let handle = bus.open(candidate).unwrap();
        let claim = handle.claim_interface(0).unwrap();
        drop(claim);
        drop(handle);

        assert_eq!(
            bus.journal(),
            vec![
                UsbCall::Enumerate,
                UsbCall::Open(desc),
                UsbCall::Claim(0),
                UsbCall::Release(0),
                UsbCall::Close,
            ]
        );
    }
}
