//! End-to-end template transfer scenarios over a channel-backed stream.

mod common;

use bytes::Bytes;
use common::*;
use fingerlink_protocol::{
    Assembly, ByteStream, ChannelStream, ReadOutcome, SerialFrameReader, StopReason,
    TemplateAssembler,
};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_two_half_packets_complete_in_two_cycles() {
    let template = sample_template();
    let (mut stream, _endpoint) = loaded_stream(&upload_packets(&template, 256));

    let mut assembler = TemplateAssembler::default();
    match assembler.assemble(&mut stream, deadline_in(1_000)).await {
        Assembly::Complete { template: got, cycles } => {
            assert_eq!(cycles, 2);
            assert_eq!(got.as_bytes(), &template[..]);
        }
        other => panic!("expected complete template, got {other:?}"),
    }
    assert_eq!(assembler.reader().stats().packets, 2);
}

#[tokio::test(start_paused = true)]
async fn test_silent_stream_times_out_without_header() {
    let (mut stream, _endpoint) = ChannelStream::pair();
    let mut reader = SerialFrameReader::default();

    let start = tokio::time::Instant::now();
    assert!(!reader.scan_for_header(&mut stream, deadline_in(500)).await);
    assert!(start.elapsed() >= Duration::from_millis(500));

    let mut assembler = TemplateAssembler::default();
    let outcome = assembler.assemble(&mut stream, deadline_in(500)).await;
    assert_eq!(
        outcome,
        Assembly::Incomplete {
            collected: 0,
            cycles: 0,
            reason: StopReason::HeaderTimeout,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_partial_upload_is_incomplete() {
    let template = sample_template();
    let packets = upload_packets(&template, 128);
    let (mut stream, _endpoint) = loaded_stream(&packets[..3]);

    let mut assembler = TemplateAssembler::default();
    match assembler.assemble(&mut stream, deadline_in(1_000)).await {
        Assembly::Incomplete {
            collected,
            cycles,
            reason,
        } => {
            assert_eq!(collected, 384);
            assert_eq!(cycles, 3);
            assert_eq!(reason, StopReason::HeaderTimeout);
            assert!(collected < 512);
        }
        other => panic!("expected incomplete transfer, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_oversized_declaration_is_skipped_then_resyncs() {
    // The filler contains the prefix; it must be consumed as part of the
    // declared span rather than treated as a new packet.
    let mut filler_span = vec![0xEFu8, 0x01];
    filler_span.resize(1_500, 0x00);
    let mut oversized = oversized_packet(1_500, 0x00).to_vec();
    oversized[9..9 + filler_span.len()].copy_from_slice(&filler_span);

    let template = sample_template();
    let mut parts = vec![Bytes::from(oversized)];
    parts.extend(upload_packets(&template, 256));
    let (mut stream, _endpoint) = loaded_stream(&parts);

    let mut reader = SerialFrameReader::default();
    assert_eq!(
        reader.next_packet(&mut stream, deadline_in(1_000)).await,
        ReadOutcome::Resynced { skipped: 1_502 }
    );

    let next = reader.next_packet(&mut stream, deadline_in(1_000)).await;
    match next {
        ReadOutcome::Packet(packet) => assert_eq!(&packet.payload[..], &template[..256]),
        other => panic!("expected packet after resync, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_assembler_survives_oversized_packet() {
    let template = sample_template();
    let mut parts = vec![oversized_packet(2_000, 0x55)];
    parts.extend(upload_packets(&template, 256));
    let (mut stream, _endpoint) = loaded_stream(&parts);

    let mut assembler = TemplateAssembler::default();
    match assembler.assemble(&mut stream, deadline_in(1_000)).await {
        Assembly::Complete { template: got, cycles } => {
            assert_eq!(cycles, 2);
            assert_eq!(got.as_bytes(), &template[..]);
        }
        other => panic!("expected complete template, got {other:?}"),
    }
    assert_eq!(assembler.reader().stats().resyncs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_truncated_oversized_skip_is_short_read() {
    let truncated = oversized_packet(1_200, 0x00).slice(..400);
    let (mut stream, _endpoint) = loaded_stream(&[truncated]);

    let mut reader = SerialFrameReader::default();
    assert_eq!(
        reader.next_packet(&mut stream, deadline_in(200)).await,
        ReadOutcome::ShortRead {
            expected: 1_202,
            received: 391
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_noise_between_packets() {
    let template = sample_template();
    let packets = upload_packets(&template, 256);
    let parts = vec![
        Bytes::from_static(&[0x00, 0xEF, 0x13, 0x37]),
        packets[0].clone(),
        Bytes::from_static(&[0xEF, 0xEF, 0x02]),
        packets[1].clone(),
    ];
    let (mut stream, _endpoint) = loaded_stream(&parts);

    let mut assembler = TemplateAssembler::default();
    let got = assembler
        .assemble(&mut stream, deadline_in(1_000))
        .await
        .into_template()
        .expect("template should assemble through noise");
    assert_eq!(got.as_bytes(), &template[..]);
}

#[tokio::test(start_paused = true)]
async fn test_packets_arriving_over_time() {
    let template = sample_template();
    let packets = upload_packets(&template, 128);
    let (mut stream, endpoint) = ChannelStream::pair();
    let feeder = endpoint.feeder();

    tokio::spawn(async move {
        for packet in packets {
            // Dribble each packet in two halves
            let mid = packet.len() / 2;
            feeder.feed(packet.slice(..mid));
            tokio::time::sleep(Duration::from_millis(20)).await;
            feeder.feed(packet.slice(mid..));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    });

    let mut assembler = TemplateAssembler::default();
    let outcome = assembler.assemble(&mut stream, deadline_in(1_000)).await;
    assert!(outcome.is_complete());
    assert_eq!(stream.available(), 0);
}
