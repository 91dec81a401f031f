//! Query sequence that produces one reading.
//!
//! The sensor only answers Query A with a valid reading after this exact
//! wake-up preamble, including the second read after Query C with no
//! command in between. Without it later frames are misaligned.

use thiserror::Error;
use tracing::instrument;

use super::constants::INIT_PRIMER;
use super::frame::{QUERY_A, QUERY_B, QUERY_C, QueryFrame, ResponseFrame, Temperature};
use crate::events::{NullObserver, SensorEvent, SensorObserver};
use crate::transport::{SensorTransport, TransferKind, TransportError};

#[derive(Error, Debug)]
#[error("step {step} ({kind} transfer) failed: {source}")]
pub struct ProtocolError {
    /// 1-based position in the sequence.
    pub step: usize,
    pub kind: TransferKind,
    #[source]
    pub source: TransportError,
}

/// What one step puts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    InitControl(&'static [u8]),
    Control(QueryFrame),
    /// Interrupt read whose frame is thrown away.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub action: Action,
    pub description: &'static str,
}

impl Step {
    const fn new(action: Action, description: &'static str) -> Self {
        Self {
            action,
            description,
        }
    }

    pub fn kind(&self) -> TransferKind {
        match self.action {
            Action::InitControl(_) | Action::Control(_) => TransferKind::Control,
            Action::Discard => TransferKind::Interrupt,
        }
    }
}

/// Steps 1-9. Step 10 reads the frame that holds the temperature.
pub const PREAMBLE: [Step; 9] = [
    Step::new(
        Action::InitControl(&INIT_PRIMER),
        "sending init control transfer",
    ),
    Step::new(Action::Control(QUERY_A), "sending control transfer query A"),
    Step::new(Action::Discard, "reading interrupt response"),
    Step::new(Action::Control(QUERY_B), "sending control transfer query B"),
    Step::new(Action::Discard, "reading interrupt response"),
    Step::new(Action::Control(QUERY_C), "sending control transfer query C"),
    Step::new(Action::Discard, "reading interrupt response"),
    Step::new(Action::Discard, "reading interrupt response"),
    Step::new(Action::Control(QUERY_A), "sending control transfer query A"),
];

pub const READING_STEP: usize = PREAMBLE.len() + 1;

/// Run the full sequence and decode the final frame.
pub fn read_temperature<T>(transport: &T) -> Result<Temperature, ProtocolError>
where
    T: SensorTransport + ?Sized,
{
    read_temperature_observed(transport, &NullObserver)
}

/// `read_temperature`, reporting every step to `observer`.
#[instrument(level = "debug", skip_all)]
pub fn read_temperature_observed<T, O>(
    transport: &T,
    observer: &O,
) -> Result<Temperature, ProtocolError>
where
    T: SensorTransport + ?Sized,
    O: SensorObserver + ?Sized,
{
    let mut buffer = [0u8; 8];

    for (i, step) in PREAMBLE.iter().enumerate() {
        let number = i + 1;
        observer.on_event(&SensorEvent::StepStarted {
            step: number,
            kind: step.kind(),
            description: step.description,
        });

        let result = match step.action {
            Action::InitControl(payload) => transport.send_init_control(payload),
            Action::Control(frame) => transport.send_control(frame.as_bytes()),
            Action::Discard => transport.read_interrupt(&mut buffer).map(|()| {
                observer.on_event(&SensorEvent::FrameReceived {
                    step: number,
                    frame: ResponseFrame::new(buffer),
                });
            }),
        };
        result.map_err(|source| fail(observer, number, source))?;
    }

    observer.on_event(&SensorEvent::StepStarted {
        step: READING_STEP,
        kind: TransferKind::Interrupt,
        description: "reading temperature interrupt response",
    });
    transport
        .read_interrupt(&mut buffer)
        .map_err(|source| fail(observer, READING_STEP, source))?;

    let frame = ResponseFrame::new(buffer);
    observer.on_event(&SensorEvent::FrameReceived {
        step: READING_STEP,
        frame,
    });

    let temperature = frame.temperature();
    observer.on_event(&SensorEvent::Reading { temperature });
    Ok(temperature)
}

fn fail<O: SensorObserver + ?Sized>(
    observer: &O,
    step: usize,
    source: TransportError,
) -> ProtocolError {
    observer.on_event(&SensorEvent::Failed {
        step,
        message: source.to_string(),
    });
    ProtocolError {
        step,
        kind: source.kind(),
        source,
    }
}
