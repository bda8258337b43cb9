//! Property-based tests for template assembly.
//!
//! Whatever the packet sizes, once the sensor has sent at least 512 payload
//! bytes the assembler must return exactly the first 512 of them.

mod common;

use common::*;
use fingerlink_protocol::{Assembly, PacketHeader, PacketType, RawPacket, TemplateAssembler};
use proptest::prelude::*;

/// Packet payload sizes the reader accepts.
fn chunk_sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=300, 1..24)
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("Failed to build test runtime")
        .block_on(future)
}

proptest! {
    /// Property: total payload >= 512 yields the first 512 bytes, in order.
    #[test]
    fn prop_complete_template_is_prefix(
        sizes in chunk_sizes(),
        seed in any::<u8>(),
    ) {
        let total: usize = sizes.iter().sum();
        prop_assume!(total >= 512);

        let stream_bytes: Vec<u8> = (0..total).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect();
        let mut packets = Vec::new();
        let mut offset = 0;
        for size in &sizes {
            packets.push(data_packet(&stream_bytes[offset..offset + size]));
            offset += size;
        }

        let outcome = run(async {
            let (mut stream, _endpoint) = loaded_stream(&packets);
            TemplateAssembler::default()
                .assemble(&mut stream, deadline_in(5_000))
                .await
        });

        match outcome {
            Assembly::Complete { template, cycles } => {
                prop_assert_eq!(template.as_bytes(), &stream_bytes[..512]);
                prop_assert!(cycles <= sizes.len());
            }
            other => prop_assert!(false, "expected complete template, got {:?}", other),
        }
    }

    /// Property: total payload < 512 never yields a template.
    #[test]
    fn prop_short_upload_is_incomplete(sizes in prop::collection::vec(1usize..=100, 1..5)) {
        let total: usize = sizes.iter().sum();
        let packets: Vec<_> = sizes.iter().map(|&size| data_packet(&vec![0x11; size])).collect();

        let outcome = run(async {
            let (mut stream, _endpoint) = loaded_stream(&packets);
            TemplateAssembler::default()
                .assemble(&mut stream, deadline_in(100))
                .await
        });

        match outcome {
            Assembly::Incomplete { collected, cycles, .. } => {
                prop_assert_eq!(collected, total);
                prop_assert_eq!(cycles, sizes.len());
            }
            other => prop_assert!(false, "expected incomplete transfer, got {:?}", other),
        }
    }

    /// Property: header decoding agrees with packet encoding.
    #[test]
    fn prop_header_matches_encoding(
        address in any::<u32>(),
        payload in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let packet = RawPacket::new(address, PacketType::Data, payload.clone());
        let encoded = packet.encode();

        let mut tail = [0u8; 7];
        tail.copy_from_slice(&encoded[2..9]);
        let header = PacketHeader::parse(&tail);

        prop_assert_eq!(header.address, address);
        prop_assert_eq!(header.kind, PacketType::Data);
        prop_assert_eq!(header.payload_len(), Some(payload.len()));
        prop_assert_eq!(encoded.len(), 9 + payload.len() + 2);
    }
}
