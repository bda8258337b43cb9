//! Core constants for the optical sensor serial protocol.
//!
//! This module defines the protocol-level constants shared by the packet
//! reader, the command encoder and the enrollment flows. Timeouts that a
//! deployment may want to tune are mirrored as defaults in
//! [`EnrollmentConfig`](crate::EnrollmentConfig).
//!
//! # Packet Structure
//!
//! Every packet exchanged with the sensor, in either direction, has the
//! same envelope:
//!
//! ```text
//! EF 01 | AA AA AA AA | TT | LL LL | payload ... | CC CC
//! ^^^^^   ^^^^^^^^^^^   ^^   ^^^^^                 ^^^^^
//! prefix  address       type combined length       checksum
//! ```
//!
//! The combined length field is big-endian and counts the payload plus the
//! two checksum bytes.
//!
//! # Usage
//!
//! ```
//! use fingerlink_core::constants::*;
//!
//! assert_eq!(PACKET_PREFIX, [0xEF, 0x01]);
//! assert_eq!(HEADER_LEN, PACKET_PREFIX.len() + HEADER_TAIL_LEN);
//! assert_eq!(TEMPLATE_SIZE, 512);
//! ```

// ============================================================================
// Packet Framing
// ============================================================================

/// First byte of the fixed packet prefix.
pub const PREFIX_HIGH: u8 = 0xEF;

/// Second byte of the fixed packet prefix.
pub const PREFIX_LOW: u8 = 0x01;

/// Fixed two-byte prefix that starts every packet.
pub const PACKET_PREFIX: [u8; 2] = [PREFIX_HIGH, PREFIX_LOW];

/// Header bytes that follow the prefix: address (4), type (1), length (2).
pub const HEADER_TAIL_LEN: usize = 7;

/// Full header length including the prefix.
pub const HEADER_LEN: usize = PACKET_PREFIX.len() + HEADER_TAIL_LEN;

/// Number of trailing checksum bytes.
pub const CHECKSUM_LEN: usize = 2;

/// Smallest valid value of the combined length field.
///
/// A packet must carry at least one payload byte, so anything below
/// `1 + CHECKSUM_LEN` is malformed.
pub const MIN_COMBINED_LENGTH: u16 = 3;

/// Default device address accepted by factory-configured sensors.
pub const DEFAULT_DEVICE_ADDRESS: u32 = 0xFFFF_FFFF;

/// Largest payload the reader accepts before treating a header as garbage.
///
/// Packets declaring more than this are skipped and the reader resyncs.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

// ============================================================================
// Template Layout
// ============================================================================

/// Size in bytes of a template retrieved from the sensor.
pub const TEMPLATE_SIZE: usize = 512;

/// Key under which the enrolled count is persisted.
pub const ENROLLED_COUNT_KEY: &str = "enrolledCount";

/// Default number of model slots on the sensor.
pub const DEFAULT_SENSOR_CAPACITY: u16 = 300;

// ============================================================================
// Serial Link
// ============================================================================

/// Default serial baud rate of the sensor module.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

// ============================================================================
// Timeout Configuration
// ============================================================================

/// Deadline for one full template transfer (milliseconds).
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 10_000;

/// Deadline for an acknowledgement packet after a command (milliseconds).
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 1_000;

/// Number of transfer attempts per template before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Delay between failed transfer attempts (milliseconds).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

/// Delay between identifiers during a bulk download (milliseconds).
pub const DEFAULT_BULK_PACING_MS: u64 = 100;

/// Maximum time to wait for a finger to be placed or removed (milliseconds).
pub const DEFAULT_PLACEMENT_TIMEOUT_MS: u64 = 30_000;

/// Settle delay before polling for finger removal (milliseconds).
pub const DEFAULT_REMOVAL_SETTLE_MS: u64 = 2_000;

/// Interval between capture polls (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
