//! Template retrieval against the mock sensor.
//!
//! Run with: cargo test --package fingerlink-enrollment --test download_tests

mod common;

use common::*;
use fingerlink_core::Stage;
use fingerlink_enrollment::{ChannelReporter, DownloadDriver, DownloadError, ReportEvent};
use fingerlink_hardware::mock::{MockSensor, SensorCall, SensorOp};
use rstest::rstest;

fn driver() -> DownloadDriver {
    DownloadDriver::new(&config())
}

#[tokio::test(start_paused = true)]
async fn test_download_zero_makes_no_sensor_calls() {
    let (mut sensor, handle) = MockSensor::new();
    let (reporter, mut rx) = ChannelReporter::new();

    let err = driver()
        .download_one(&mut sensor, &reporter, 0, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::InvalidId(0)));
    assert!(handle.calls().await.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bulk_continues_past_silent_id() {
    let (mut sensor, handle) = MockSensor::new();
    for raw in 1..=5 {
        handle.insert_model(id(raw), model(raw as u8)).await;
    }
    handle.silence(id(3)).await;
    let (reporter, mut rx) = ChannelReporter::new();

    let report = driver().download_all(&mut sensor, &reporter, 5, 2).await.unwrap();

    assert_eq!(report.succeeded, vec![id(1), id(2), id(4), id(5)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, id(3));
    assert!(report.is_partial());
    assert!(!report.is_complete());

    let calls = handle.calls().await;
    assert!(calls.contains(&SensorCall::LoadModel(id(4))));
    assert!(calls.contains(&SensorCall::LoadModel(id(5))));
    let id3_loads = calls
        .iter()
        .filter(|c| **c == SensorCall::LoadModel(id(3)))
        .count();
    assert_eq!(id3_loads, 2);

    let events = drain(&mut rx);
    let templates: Vec<u16> = events
        .iter()
        .filter_map(|e| match e {
            ReportEvent::Template { id, .. } => Some(id.as_u16()),
            _ => None,
        })
        .collect();
    assert_eq!(templates, vec![1, 2, 4, 5]);
    assert_eq!(results(&events), vec![(3, false)]);
    assert_eq!(stages(&events), vec![Stage::Error]);
}

#[tokio::test(start_paused = true)]
async fn test_bulk_complete_reports_success() {
    let (mut sensor, handle) = MockSensor::new();
    for raw in 1..=3 {
        handle.insert_model(id(raw), model(raw as u8)).await;
    }
    let (reporter, mut rx) = ChannelReporter::new();

    let report = driver().download_all(&mut sensor, &reporter, 300, 3).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.attempted(), 3);
    assert_eq!(stages(&drain(&mut rx)), vec![Stage::Success]);
}

#[tokio::test(start_paused = true)]
async fn test_bulk_uses_reported_count() {
    let (mut sensor, handle) = MockSensor::new();
    for raw in 1..=4 {
        handle.insert_model(id(raw), model(raw as u8)).await;
    }
    handle.set_reported_count(Some(2)).await;
    let (reporter, _rx) = ChannelReporter::new();

    let report = driver().download_all(&mut sensor, &reporter, 300, 1).await.unwrap();

    assert_eq!(report.succeeded, vec![id(1), id(2)]);
    assert_eq!(handle.call_count(SensorOp::LoadModel).await, 2);
}

#[rstest]
#[case::zero_bound(5, 0)]
#[case::empty_library(0, 10)]
#[tokio::test(start_paused = true)]
async fn test_bulk_with_nothing_to_visit(#[case] stored: u16, #[case] upper_bound: u16) {
    let (mut sensor, handle) = MockSensor::new();
    for raw in 1..=stored {
        handle.insert_model(id(raw), model(raw as u8)).await;
    }
    let (reporter, mut rx) = ChannelReporter::new();

    let err = driver()
        .download_all(&mut sensor, &reporter, upper_bound, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::NothingToDownload));
    assert_eq!(handle.call_count(SensorOp::LoadModel).await, 0);
    assert_eq!(results(&drain(&mut rx)), vec![(0, false)]);
}

#[rstest]
#[case::two_packets(256)]
#[case::four_packets(128)]
#[case::odd_packets(200)]
#[tokio::test(start_paused = true)]
async fn test_download_independent_of_chunking(#[case] chunk_size: usize) {
    let (mut sensor, handle) = MockSensor::new();
    handle.insert_model(id(1), model(77)).await;
    handle.set_chunk_size(chunk_size).await;
    let (reporter, _rx) = ChannelReporter::new();

    let template = driver()
        .download_one(&mut sensor, &reporter, 1, 1)
        .await
        .unwrap();

    assert_eq!(template.as_bytes(), &model(77)[..]);
}
