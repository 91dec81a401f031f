//! Command and response frames.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use super::constants::{CELSIUS_PER_COUNT, FRAME_LEN};

/// Outbound 8-byte command: `[report-id, opcode, arg1, arg2, 0, 0, 0, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFrame([u8; FRAME_LEN]);

impl QueryFrame {
    pub const REPORT_ID: u8 = 0x01;

    pub const fn new(opcode: u8, arg1: u8, arg2: u8) -> Self {
        Self([Self::REPORT_ID, opcode, arg1, arg2, 0, 0, 0, 0])
    }

    pub fn opcode(&self) -> u8 {
        self.0[1]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Query A: sent twice, its second response carries the reading.
pub const QUERY_A: QueryFrame = QueryFrame::new(0x80, 0x33, 0x01);
/// Query B
pub const QUERY_B: QueryFrame = QueryFrame::new(0x82, 0x77, 0x01);
/// Query C: answered with two frames.
pub const QUERY_C: QueryFrame = QueryFrame::new(0x86, 0xff, 0x01);

/// Inbound 8-byte response, only ever built from a complete read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseFrame([u8; FRAME_LEN]);

impl ResponseFrame {
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Raw sensor count, big-endian in bytes 2..4.
    pub fn raw(&self) -> u16 {
        BigEndian::read_u16(&self.0[2..4])
    }

    pub fn temperature(&self) -> Temperature {
        decode(self.0[2], self.0[3])
    }
}

/// Calibrated temperature in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(pub f64);

impl Temperature {
    pub fn celsius(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}°C", self.0)
    }
}

/// Decode the two reading bytes of a response frame.
pub fn decode(high: u8, low: u8) -> Temperature {
    let raw = u16::from(low) + (u16::from(high) << 8);
    Temperature(f64::from(raw) * CELSIUS_PER_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_frames() {
        assert_eq!(
            QUERY_A.as_bytes(),
            &[0x01, 0x80, 0x33, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            QUERY_B.as_bytes(),
            &[0x01, 0x82, 0x77, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            QUERY_C.as_bytes(),
            &[0x01, 0x86, 0xff, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(QUERY_C.opcode(), 0x86);
    }

    #[test]
    fn test_decode_example() {
        assert_eq!(decode(0x01, 0x2C), Temperature(1.171875));
    }

    #[test]
    fn test_decode_matches_formula_for_all_pairs() {
        for high in 0..=u8::MAX {
            for low in 0..=u8::MAX {
                let raw = (low as u16) + ((high as u16) << 8);
                let expected = raw as f64 * 125.0 / 32000.0;
                assert_eq!(decode(high, low).celsius(), expected);
            }
        }
    }

    #[test]
    fn test_response_frame_decode() {
        let frame = ResponseFrame::new([0x80, 0x02, 0x17, 0x80, 0x4e, 0x20, 0x00, 0x00]);
        assert_eq!(frame.raw(), 0x1780);
        // 0x1780 = 6016 counts
        assert_eq!(frame.temperature(), Temperature(23.5));
    }

    #[test]
    fn test_temperature_display() {
        assert_eq!(Temperature(1.171875).to_string(), "1.171875°C");
    }
}
