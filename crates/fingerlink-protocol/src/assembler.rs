//! Reconstruction of a template from consecutive data packets.
//!
//! After an upload command the sensor streams the template as a run of
//! data packets (usually two of 256 bytes, or four of 128). The assembler
//! concatenates their payloads in arrival order into a fixed 512-byte
//! buffer and stops as soon as the buffer is full. Excess bytes of the last
//! packet are dropped.

use fingerlink_core::{TemplatePayload, constants::TEMPLATE_SIZE};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::reader::{ReadOutcome, SerialFrameReader};
use crate::stream::ByteStream;

/// Why an assembly ended before the buffer was full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No further packet prefix arrived before the deadline.
    HeaderTimeout,
    /// A packet was cut off by the deadline.
    ShortRead { expected: usize, received: usize },
}

/// Result of one assembly attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    Complete {
        template: TemplatePayload,
        /// Read cycles that produced a packet.
        cycles: usize,
    },
    Incomplete {
        /// Bytes collected before the attempt stopped.
        collected: usize,
        cycles: usize,
        reason: StopReason,
    },
}

impl Assembly {
    pub fn is_complete(&self) -> bool {
        matches!(self, Assembly::Complete { .. })
    }

    /// Consume the result, keeping only a finished template.
    pub fn into_template(self) -> Option<TemplatePayload> {
        match self {
            Assembly::Complete { template, .. } => Some(template),
            Assembly::Incomplete { .. } => None,
        }
    }
}

/// Drives a [`SerialFrameReader`] until a full template has been collected.
#[derive(Debug, Clone, Default)]
pub struct TemplateAssembler {
    reader: SerialFrameReader,
}

impl TemplateAssembler {
    pub fn new(reader: SerialFrameReader) -> Self {
        Self { reader }
    }

    /// Assembler whose reader rejects payloads above `max_payload`.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self::new(SerialFrameReader::new(max_payload))
    }

    pub fn reader(&self) -> &SerialFrameReader {
        &self.reader
    }

    /// Collect one template from `stream`, giving up at `deadline`.
    ///
    /// Every call starts from an empty buffer. Oversized or malformed
    /// packets are skipped and do not end the attempt.
    pub async fn assemble<S: ByteStream>(
        &mut self,
        stream: &mut S,
        deadline: Instant,
    ) -> Assembly {
        let mut buffer = [0u8; TEMPLATE_SIZE];
        let mut offset = 0usize;
        let mut cycles = 0usize;

        while offset < TEMPLATE_SIZE {
            let reason = match self.reader.next_packet(stream, deadline).await {
                ReadOutcome::Packet(packet) => {
                    let take = packet.payload.len().min(TEMPLATE_SIZE - offset);
                    buffer[offset..offset + take].copy_from_slice(&packet.payload[..take]);
                    offset += take;
                    cycles += 1;
                    trace!(kind = ?packet.kind, take, offset, "Template chunk");
                    continue;
                }
                ReadOutcome::Resynced { skipped } => {
                    debug!(skipped, offset, "Reader resynced during template transfer");
                    continue;
                }
                ReadOutcome::HeaderTimeout => StopReason::HeaderTimeout,
                ReadOutcome::ShortRead { expected, received } => {
                    StopReason::ShortRead { expected, received }
                }
            };

            debug!(collected = offset, cycles, ?reason, "Template transfer incomplete");
            return Assembly::Incomplete {
                collected: offset,
                cycles,
                reason,
            };
        }

        Assembly::Complete {
            template: TemplatePayload::from(buffer),
            cycles,
        }
    }
}
