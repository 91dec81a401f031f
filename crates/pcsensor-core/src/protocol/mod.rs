//! Protocol module - TEMPer1 wire format and query sequence.

pub mod constants;
pub mod engine;
pub mod frame;

pub use constants::*;
pub use engine::{
    Action, PREAMBLE, ProtocolError, READING_STEP, Step, read_temperature,
    read_temperature_observed,
};
pub use frame::{QUERY_A, QUERY_B, QUERY_C, QueryFrame, ResponseFrame, Temperature, decode};
