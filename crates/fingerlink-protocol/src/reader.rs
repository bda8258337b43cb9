//! Packet extraction from a raw sensor byte stream.
//!
//! The serial link carries no framing beyond the `EF 01` prefix, so the
//! reader has to find its own way back into the stream after noise or a
//! truncated packet:
//!
//! ```text
//!   scan_for_header           read_packet
//! ┌──────────────────┐     ┌─────────────────────────┐
//! │ discard bytes    │ EF01│ 7 header bytes          │
//! │ until EF then 01 │────>│ combined < 3   -> Resynced
//! └──────────────────┘     │ payload > max  -> skip, Resynced
//!         │ deadline       │ else payload + checksum -> Packet
//!         v                └─────────────────────────┘
//!   HeaderTimeout                   │ deadline
//!                                   v
//!                              ShortRead
//! ```
//!
//! Received checksums are kept on the packet but not verified.

use bytes::Bytes;
use fingerlink_core::constants::{
    CHECKSUM_LEN, DEFAULT_MAX_PAYLOAD, HEADER_TAIL_LEN, PREFIX_HIGH, PREFIX_LOW,
};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::packet::{PacketHeader, RawPacket};
use crate::stream::{ByteStream, ShortRead};

/// Result of one read cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// No packet prefix appeared before the deadline.
    HeaderTimeout,
    /// A header was found but the rest of the packet did not arrive in time.
    ShortRead { expected: usize, received: usize },
    /// A malformed or oversized packet was dropped; scanning can continue.
    Resynced { skipped: usize },
    /// A complete packet.
    Packet(RawPacket),
}

impl ReadOutcome {
    /// Whether the cycle produced a packet.
    pub fn is_packet(&self) -> bool {
        matches!(self, ReadOutcome::Packet(_))
    }
}

impl From<ShortRead> for ReadOutcome {
    fn from(short: ShortRead) -> Self {
        ReadOutcome::ShortRead {
            expected: short.expected,
            received: short.received,
        }
    }
}

/// Running counters kept by a [`SerialFrameReader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub packets: u64,
    pub header_timeouts: u64,
    pub short_reads: u64,
    pub resyncs: u64,
    /// Bytes dropped while skipping oversized packets.
    pub skipped_bytes: u64,
}

/// Synchronizes to the packet prefix and reads length-checked packets.
#[derive(Debug, Clone)]
pub struct SerialFrameReader {
    max_payload: usize,
    stats: ReaderStats,
}

impl Default for SerialFrameReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl SerialFrameReader {
    /// Create a reader that rejects payloads longer than `max_payload`.
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload,
            stats: ReaderStats::default(),
        }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Consume bytes until `EF 01` has been read or the deadline passes.
    ///
    /// Bytes before the prefix are dropped. A lone `EF` followed by anything
    /// other than `01` does not end the scan.
    pub async fn scan_for_header<S: ByteStream>(
        &mut self,
        stream: &mut S,
        deadline: Instant,
    ) -> bool {
        let mut previous: Option<u8> = None;
        let mut dropped = 0usize;

        while let Some(byte) = stream.read_byte(deadline).await {
            if previous == Some(PREFIX_HIGH) && byte == PREFIX_LOW {
                if dropped > 0 {
                    trace!(dropped, "Skipped noise before packet prefix");
                }
                return true;
            }
            if previous.is_some() {
                dropped += 1;
            }
            previous = Some(byte);
        }

        self.stats.header_timeouts += 1;
        false
    }

    /// Read the remainder of a packet whose prefix has just been consumed.
    pub async fn read_packet<S: ByteStream>(
        &mut self,
        stream: &mut S,
        deadline: Instant,
    ) -> ReadOutcome {
        let tail = match stream.read_exact(HEADER_TAIL_LEN, deadline).await {
            Ok(bytes) => bytes,
            Err(short) => return self.short_read(short),
        };

        let mut raw = [0u8; HEADER_TAIL_LEN];
        raw.copy_from_slice(&tail);
        let header = PacketHeader::parse(&raw);

        let Some(payload_len) = header.payload_len() else {
            debug!(
                combined_length = header.combined_length,
                "Dropping packet with malformed length"
            );
            self.stats.resyncs += 1;
            return ReadOutcome::Resynced { skipped: 0 };
        };

        if payload_len > self.max_payload {
            let span = payload_len + CHECKSUM_LEN;
            warn!(
                payload_len,
                max = self.max_payload,
                "Oversized packet, skipping declared span"
            );
            if let Err(short) = stream.discard(span, deadline).await {
                return self.short_read(short);
            }
            self.stats.resyncs += 1;
            self.stats.skipped_bytes += span as u64;
            return ReadOutcome::Resynced { skipped: span };
        }

        let payload: Bytes = match stream.read_exact(payload_len, deadline).await {
            Ok(bytes) => bytes,
            Err(short) => return self.short_read(short),
        };

        let checksum = match stream.read_exact(CHECKSUM_LEN, deadline).await {
            Ok(bytes) => u16::from_be_bytes([bytes[0], bytes[1]]),
            Err(short) => return self.short_read(short),
        };

        self.stats.packets += 1;
        trace!(kind = ?header.kind, payload_len, "Packet received");

        ReadOutcome::Packet(RawPacket {
            address: header.address,
            kind: header.kind,
            payload,
            checksum,
        })
    }

    /// Scan for a prefix, then read the packet behind it.
    pub async fn next_packet<S: ByteStream>(
        &mut self,
        stream: &mut S,
        deadline: Instant,
    ) -> ReadOutcome {
        if !self.scan_for_header(stream, deadline).await {
            return ReadOutcome::HeaderTimeout;
        }
        self.read_packet(stream, deadline).await
    }

    fn short_read(&mut self, short: ShortRead) -> ReadOutcome {
        debug!(
            expected = short.expected,
            received = short.received,
            "Packet cut short"
        );
        self.stats.short_reads += 1;
        short.into()
    }
}
