//! Shared helpers for the enrollment integration tests.

#![allow(dead_code)]

use fingerlink_core::constants::TEMPLATE_SIZE;
use fingerlink_core::{EnrollmentConfig, Stage, TemplateId};
use fingerlink_enrollment::ReportEvent;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn id(raw: u16) -> TemplateId {
    TemplateId::new(raw).unwrap()
}

pub fn config() -> EnrollmentConfig {
    EnrollmentConfig::default()
}

/// Distinct 512-byte model for `seed`.
pub fn model(seed: u8) -> [u8; TEMPLATE_SIZE] {
    let mut bytes = [0u8; TEMPLATE_SIZE];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = seed.wrapping_mul(31).wrapping_add(i as u8);
    }
    bytes
}

/// Mock model produced from `features`: the features repeated to 512 bytes.
pub fn model_from(features: &[u8]) -> Vec<u8> {
    features.iter().copied().cycle().take(TEMPLATE_SIZE).collect()
}

pub fn drain(rx: &mut UnboundedReceiver<ReportEvent>) -> Vec<ReportEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn stages(events: &[ReportEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            ReportEvent::Status { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

pub fn results(events: &[ReportEvent]) -> Vec<(u16, bool)> {
    events
        .iter()
        .filter_map(|event| match event {
            ReportEvent::Result { id, success, .. } => Some((*id, *success)),
            _ => None,
        })
        .collect()
}
