//! Event system for UI decoupling.
//!
//! Lets a front end follow a reading step by step without the core
//! knowing how progress is displayed.

use std::fmt;

use crate::device::DeviceDescriptor;
use crate::protocol::{ResponseFrame, Temperature};
use crate::transport::TransferKind;

/// Events emitted while taking a reading.
#[derive(Debug, Clone)]
pub enum SensorEvent {
    /// Device opened.
    DeviceOpened { device: DeviceDescriptor },
    /// Both interfaces claimed.
    SessionEstablished,
    /// A protocol step is about to run.
    StepStarted {
        step: usize,
        kind: TransferKind,
        description: &'static str,
    },
    /// Interrupt frame received.
    FrameReceived { step: usize, frame: ResponseFrame },
    /// Temperature decoded from the final frame.
    Reading { temperature: Temperature },
    /// A step failed; the reading is abandoned.
    Failed { step: usize, message: String },
}

/// Hex dump of a frame, `01 80 33 01 00 00 00 00`.
pub struct HexFrame<'a>(pub &'a [u8]);

impl fmt::Display for HexFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Observer trait for receiving sensor events.
pub trait SensorObserver {
    /// Called when an event occurs.
    fn on_event(&self, event: &SensorEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl SensorObserver for NullObserver {
    fn on_event(&self, _event: &SensorEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl SensorObserver for TracingObserver {
    fn on_event(&self, event: &SensorEvent) {
        match event {
            SensorEvent::DeviceOpened { device } => {
                tracing::info!(device = %device, "Device opened");
            }
            SensorEvent::SessionEstablished => {
                tracing::info!("Session established");
            }
            SensorEvent::StepStarted {
                step,
                kind,
                description,
            } => {
                tracing::debug!(step, kind = %kind, "{}", description);
            }
            SensorEvent::FrameReceived { step, frame } => {
                tracing::trace!(step, frame = %HexFrame(frame.as_bytes()), "Frame received");
            }
            SensorEvent::Reading { temperature } => {
                tracing::debug!(celsius = temperature.celsius(), "Temperature decoded");
            }
            SensorEvent::Failed { step, message } => {
                tracing::error!(step, "Step failed: {}", message);
            }
        }
    }
}
