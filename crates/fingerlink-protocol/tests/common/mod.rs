//! Shared helpers for the packet-level integration tests.
//!
//! Tests build the byte stream a sensor would emit during a template upload
//! and push it through a [`ChannelStream`] endpoint, so the reader and the
//! assembler see exactly the bytes the serial bridge would hand them.

#![allow(dead_code)]

use bytes::{BufMut, Bytes, BytesMut};
use fingerlink_protocol::{ChannelStream, PacketType, RawPacket, StreamEndpoint};
use std::time::Duration;
use tokio::time::Instant;

/// Address used by factory-configured sensors.
pub const ADDRESS: u32 = 0xFFFF_FFFF;

/// Deadline `ms` milliseconds from now.
pub fn deadline_in(ms: u64) -> Instant {
    Instant::now() + Duration::from_millis(ms)
}

/// Encoded data packet carrying `payload`.
pub fn data_packet(payload: &[u8]) -> Bytes {
    RawPacket::new(ADDRESS, PacketType::Data, Bytes::copy_from_slice(payload)).encode()
}

/// Encoded end-of-data packet carrying `payload`.
pub fn end_packet(payload: &[u8]) -> Bytes {
    RawPacket::new(ADDRESS, PacketType::EndData, Bytes::copy_from_slice(payload)).encode()
}

/// Header that declares `payload_len` bytes, followed by that many filler
/// bytes and a dummy checksum.
pub fn oversized_packet(payload_len: usize, filler: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(9 + payload_len + 2);
    buf.put_slice(&[0xEF, 0x01]);
    buf.put_u32(ADDRESS);
    buf.put_u8(PacketType::Data.as_u8());
    buf.put_u16((payload_len + 2) as u16);
    buf.put_bytes(filler, payload_len);
    buf.put_u16(0);
    buf.freeze()
}

/// Split `template` into upload packets of `chunk` bytes, the last one
/// marked as end-of-data.
pub fn upload_packets(template: &[u8], chunk: usize) -> Vec<Bytes> {
    let chunks: Vec<&[u8]> = template.chunks(chunk).collect();
    let last = chunks.len().saturating_sub(1);
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            if i == last {
                end_packet(part)
            } else {
                data_packet(part)
            }
        })
        .collect()
}

/// Stream pre-loaded with `parts`, in order.
pub fn loaded_stream(parts: &[Bytes]) -> (ChannelStream, StreamEndpoint) {
    let (stream, endpoint) = ChannelStream::pair();
    for part in parts {
        endpoint.feed(part.clone());
    }
    (stream, endpoint)
}

/// Deterministic 512-byte test template.
pub fn sample_template() -> Vec<u8> {
    (0..512u32).map(|i| (i * 7 % 251) as u8).collect()
}
