//! Protocol constants for the TEMPer1 (0c45:7401) sensor.
//!
//! Every value here was taken from traffic captures of the vendor tool;
//! none of it is documented by the manufacturer.

use std::time::Duration;

// ============================================================================
// Device Identification
// ============================================================================

/// Microdia Vendor ID
pub const SENSOR_VENDOR_ID: u16 = 0x0c45;

/// TEMPer1 Product ID
pub const SENSOR_PRODUCT_ID: u16 = 0x7401;

// ============================================================================
// Session
// ============================================================================

/// Configuration selected before claiming.
pub const SENSOR_CONFIGURATION: u8 = 1;

/// Interfaces that must both be claimed, in acquisition order.
pub const SENSOR_INTERFACES: [u8; 2] = [0, 1];

// ============================================================================
// Control Transfers (Host -> Device)
// ============================================================================

/// bmRequestType: class, interface, host-to-device
pub const CONTROL_REQUEST_TYPE: u8 = 0x21;

/// bRequest: HID SET_REPORT
pub const CONTROL_REQUEST: u8 = 0x09;

/// wValue for the one-shot init transfer
pub const INIT_VALUE: u16 = 0x0201;
/// wIndex for the one-shot init transfer
pub const INIT_INDEX: u16 = 0x00;

/// wValue for every query transfer
pub const QUERY_VALUE: u16 = 0x0200;
/// wIndex for every query transfer
pub const QUERY_INDEX: u16 = 0x01;

// ============================================================================
// Interrupt Transfers (Device -> Host)
// ============================================================================

/// Interrupt IN endpoint carrying query responses.
pub const INTERRUPT_ENDPOINT: u8 = 0x82;

/// Every response frame is exactly this long.
pub const FRAME_LEN: usize = 8;

// ============================================================================
// Timing & Calibration
// ============================================================================

pub const TRANSFER_TIMEOUT_MS: u64 = 1000;
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(TRANSFER_TIMEOUT_MS);

/// Celsius per raw count (125 / 32000).
pub const CELSIUS_PER_COUNT: f64 = 125.0 / 32000.0;

// ============================================================================
// Frames
// ============================================================================

/// Primer sent once with the init control parameters.
pub const INIT_PRIMER: [u8; 2] = [0x01, 0x01];
