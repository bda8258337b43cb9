//! Sensor capability interface.
//!
//! The enrollment, verification and download flows only ever talk to a
//! sensor through [`SensorDevice`]. Each operation maps to one command on
//! the module; expected negative answers come back as outcome variants so
//! that flows can branch on them without inspecting errors.
//!
//! All methods use native `async fn` (Edition 2024), eliminating the need for
//! the `async_trait` macro.

#![allow(async_fn_in_trait)]

use fingerlink_core::{FeatureSlot, TemplateId};
use fingerlink_protocol::ByteStream;

use crate::error::SensorResult;
use crate::types::DeviceInfo;

/// Result of asking the sensor to capture an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// An image is in the sensor's image buffer.
    Captured,
    /// Nothing on the sensor surface.
    NoFinger,
}

/// Result of combining both feature buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A model was built from the two buffers.
    Built,
    /// The two captures are not of the same finger.
    Mismatch,
}

/// Result of a library search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Matched { id: TemplateId, confidence: u16 },
    NotFound,
}

/// Operations supported by an optical fingerprint module.
///
/// # Template transfer
///
/// [`begin_transfer`](SensorDevice::begin_transfer) asks the sensor to
/// upload feature buffer 1. The data packets that follow are not consumed by
/// the device; they are read from [`transfer_stream`](SensorDevice::transfer_stream)
/// by the caller, usually through a `TemplateAssembler`.
pub trait SensorDevice: Send {
    /// Byte stream the sensor uploads templates on.
    type Stream: ByteStream;

    /// Capture a finger image into the image buffer.
    async fn capture_image(&mut self) -> SensorResult<CaptureOutcome>;

    /// Convert the image buffer into features in `slot`.
    async fn image_to_feature(&mut self, slot: FeatureSlot) -> SensorResult<()>;

    /// Combine both feature buffers into a model.
    async fn build_model(&mut self) -> SensorResult<BuildOutcome>;

    /// Persist the built model at `id` in the sensor library.
    async fn store_model(&mut self, id: TemplateId) -> SensorResult<()>;

    /// Load the model stored at `id` into feature buffer 1.
    async fn load_model(&mut self, id: TemplateId) -> SensorResult<()>;

    /// Start uploading feature buffer 1 on the transfer stream.
    async fn begin_transfer(&mut self) -> SensorResult<()>;

    /// Search the library with feature buffer 1.
    async fn search(&mut self) -> SensorResult<SearchOutcome>;

    /// Number of models stored in the library.
    async fn template_count(&mut self) -> SensorResult<u16>;

    /// Device metadata.
    async fn get_info(&self) -> SensorResult<DeviceInfo>;

    /// The stream template data packets arrive on.
    fn transfer_stream(&mut self) -> &mut Self::Stream;
}
