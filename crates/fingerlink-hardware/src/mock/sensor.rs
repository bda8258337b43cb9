//! Mock fingerprint sensor for testing and development.
//!
//! The mock keeps the same buffers as the real module (image buffer, two
//! feature buffers, a model buffer and a page library) and uploads templates
//! as real data packets on its own [`ChannelStream`]. Tests script finger
//! placements and failures through a [`MockSensorHandle`].

use bytes::Bytes;
use fingerlink_core::{
    FeatureSlot, TemplateId,
    constants::{DEFAULT_DEVICE_ADDRESS, DEFAULT_SENSOR_CAPACITY, TEMPLATE_SIZE},
};
use fingerlink_protocol::{ChannelStream, ConfirmationCode, PacketType, RawPacket, StreamFeeder};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::{SensorError, SensorResult},
    traits::{BuildOutcome, CaptureOutcome, SearchOutcome, SensorDevice},
    types::DeviceInfo,
};

/// Payload size of upload packets unless changed with
/// [`MockSensorHandle::set_chunk_size`].
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Confidence reported for a library match.
pub const MATCH_CONFIDENCE: u16 = 100;

/// What the next capture poll sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCapture {
    /// A finger whose image is the given bytes.
    Finger(Vec<u8>),
    /// Nothing on the sensor.
    NoFinger,
    /// The sensor answers with this confirmation code.
    Error(ConfirmationCode),
}

/// Sensor operation, used to target scripted failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorOp {
    CaptureImage,
    ImageToFeature,
    BuildModel,
    StoreModel,
    LoadModel,
    BeginTransfer,
    Search,
    TemplateCount,
}

/// One recorded call on the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCall {
    CaptureImage,
    ImageToFeature(FeatureSlot),
    BuildModel,
    StoreModel(TemplateId),
    LoadModel(TemplateId),
    BeginTransfer,
    Search,
    TemplateCount,
}

impl SensorCall {
    pub fn op(&self) -> SensorOp {
        match self {
            SensorCall::CaptureImage => SensorOp::CaptureImage,
            SensorCall::ImageToFeature(_) => SensorOp::ImageToFeature,
            SensorCall::BuildModel => SensorOp::BuildModel,
            SensorCall::StoreModel(_) => SensorOp::StoreModel,
            SensorCall::LoadModel(_) => SensorOp::LoadModel,
            SensorCall::BeginTransfer => SensorOp::BeginTransfer,
            SensorCall::Search => SensorOp::Search,
            SensorCall::TemplateCount => SensorOp::TemplateCount,
        }
    }
}

#[derive(Debug)]
struct MockState {
    captures: VecDeque<ScriptedCapture>,
    image: Option<Vec<u8>>,
    slots: [Option<Vec<u8>>; 2],
    model: Option<[u8; TEMPLATE_SIZE]>,
    library: HashMap<u16, [u8; TEMPLATE_SIZE]>,
    loaded: Option<u16>,
    silenced: HashSet<u16>,
    failures: HashMap<SensorOp, VecDeque<ConfirmationCode>>,
    reported_count: Option<u16>,
    chunk_size: usize,
    calls: Vec<SensorCall>,
    feeder: StreamFeeder,
}

impl MockState {
    fn record(&mut self, call: SensorCall) -> SensorResult<()> {
        self.calls.push(call);
        match self
            .failures
            .get_mut(&call.op())
            .and_then(|queue| queue.pop_front())
            .and_then(SensorError::from_code)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn slot(&self, slot: FeatureSlot) -> &Option<Vec<u8>> {
        &self.slots[usize::from(slot.as_u8() - 1)]
    }

    fn upload_packets(&self, template: &[u8; TEMPLATE_SIZE]) -> Vec<Bytes> {
        let chunks: Vec<&[u8]> = template.chunks(self.chunk_size.max(1)).collect();
        let last = chunks.len() - 1;
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let kind = if i == last {
                    PacketType::EndData
                } else {
                    PacketType::Data
                };
                RawPacket::new(DEFAULT_DEVICE_ADDRESS, kind, Bytes::copy_from_slice(chunk))
                    .encode()
            })
            .collect()
    }
}

/// Expand captured feature bytes into a full-size model.
fn model_from_features(features: &[u8]) -> [u8; TEMPLATE_SIZE] {
    let mut model = [0u8; TEMPLATE_SIZE];
    for (dst, src) in model.iter_mut().zip(features.iter().cycle()) {
        *dst = *src;
    }
    model
}

/// Mock fingerprint sensor.
///
/// # Examples
///
/// ```
/// use fingerlink_core::FeatureSlot;
/// use fingerlink_hardware::mock::MockSensor;
/// use fingerlink_hardware::{BuildOutcome, CaptureOutcome, SensorDevice};
///
/// #[tokio::main]
/// async fn main() -> fingerlink_hardware::SensorResult<()> {
///     let (mut sensor, handle) = MockSensor::new();
///     handle.present_finger(vec![1, 2, 3]).await;
///     handle.present_finger(vec![1, 2, 3]).await;
///
///     assert_eq!(sensor.capture_image().await?, CaptureOutcome::Captured);
///     sensor.image_to_feature(FeatureSlot::First).await?;
///     assert_eq!(sensor.capture_image().await?, CaptureOutcome::Captured);
///     sensor.image_to_feature(FeatureSlot::Second).await?;
///     assert_eq!(sensor.build_model().await?, BuildOutcome::Built);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    name: String,
    state: Arc<Mutex<MockState>>,
    stream: ChannelStream,
}

impl MockSensor {
    /// Create a new mock sensor with the default name.
    pub fn new() -> (Self, MockSensorHandle) {
        Self::with_name("MockSensor")
    }

    /// Create a new mock sensor with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockSensorHandle) {
        let (stream, endpoint) = ChannelStream::pair();
        let (feeder, _written) = endpoint.into_parts();

        let state = Arc::new(Mutex::new(MockState {
            captures: VecDeque::new(),
            image: None,
            slots: [None, None],
            model: None,
            library: HashMap::new(),
            loaded: None,
            silenced: HashSet::new(),
            failures: HashMap::new(),
            reported_count: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            calls: Vec::new(),
            feeder,
        }));

        let sensor = Self {
            name: name.into(),
            state: Arc::clone(&state),
            stream,
        };

        (sensor, MockSensorHandle { state })
    }
}

impl SensorDevice for MockSensor {
    type Stream = ChannelStream;

    async fn capture_image(&mut self) -> SensorResult<CaptureOutcome> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::CaptureImage)?;

        match state.captures.pop_front().unwrap_or(ScriptedCapture::NoFinger) {
            ScriptedCapture::Finger(image) => {
                state.image = Some(image);
                Ok(CaptureOutcome::Captured)
            }
            ScriptedCapture::NoFinger => Ok(CaptureOutcome::NoFinger),
            ScriptedCapture::Error(code) => match SensorError::from_code(code) {
                Some(SensorError::NoFinger) | None => Ok(CaptureOutcome::NoFinger),
                Some(error) => Err(error),
            },
        }
    }

    async fn image_to_feature(&mut self, slot: FeatureSlot) -> SensorResult<()> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::ImageToFeature(slot))?;

        let image = state.image.clone().ok_or(SensorError::InvalidImage)?;
        state.slots[usize::from(slot.as_u8() - 1)] = Some(image);
        Ok(())
    }

    async fn build_model(&mut self) -> SensorResult<BuildOutcome> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::BuildModel)?;

        let model = match (state.slot(FeatureSlot::First), state.slot(FeatureSlot::Second)) {
            (Some(first), Some(second)) if first == second => Some(model_from_features(first)),
            _ => None,
        };

        state.model = model;
        Ok(match model {
            Some(_) => BuildOutcome::Built,
            None => BuildOutcome::Mismatch,
        })
    }

    async fn store_model(&mut self, id: TemplateId) -> SensorResult<()> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::StoreModel(id))?;

        if id.as_u16() > DEFAULT_SENSOR_CAPACITY {
            return Err(SensorError::BadLocation);
        }
        let model = state.model.ok_or(SensorError::InvalidImage)?;
        state.library.insert(id.as_u16(), model);
        debug!(%id, "Mock sensor stored model");
        Ok(())
    }

    async fn load_model(&mut self, id: TemplateId) -> SensorResult<()> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::LoadModel(id))?;

        let model = *state.library.get(&id.as_u16()).ok_or(SensorError::DbReadFail)?;
        state.slots[0] = Some(model.to_vec());
        state.loaded = Some(id.as_u16());
        Ok(())
    }

    async fn begin_transfer(&mut self) -> SensorResult<()> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::BeginTransfer)?;

        if let Some(id) = state.loaded {
            if state.silenced.contains(&id) {
                debug!(id, "Mock sensor withholding upload");
                return Ok(());
            }
        }

        let features = state
            .slot(FeatureSlot::First)
            .clone()
            .ok_or(SensorError::UploadFeatureFail)?;
        for packet in state.upload_packets(&model_from_features(&features)) {
            state.feeder.feed(packet);
        }
        Ok(())
    }

    async fn search(&mut self) -> SensorResult<SearchOutcome> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::Search)?;

        let Some(features) = state.slot(FeatureSlot::First).clone() else {
            return Err(SensorError::InvalidImage);
        };
        let probe = model_from_features(&features);

        let mut ids: Vec<&u16> = state.library.keys().collect();
        ids.sort();
        for id in ids {
            if state.library[id] == probe {
                if let Ok(id) = TemplateId::new(*id) {
                    return Ok(SearchOutcome::Matched {
                        id,
                        confidence: MATCH_CONFIDENCE,
                    });
                }
            }
        }
        Ok(SearchOutcome::NotFound)
    }

    async fn template_count(&mut self) -> SensorResult<u16> {
        let mut state = self.state.lock().await;
        state.record(SensorCall::TemplateCount)?;

        Ok(state
            .reported_count
            .unwrap_or(state.library.len() as u16))
    }

    async fn get_info(&self) -> SensorResult<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Optical Sensor")
            .with_capacity(DEFAULT_SENSOR_CAPACITY)
            .with_firmware_version("1.0.0"))
    }

    fn transfer_stream(&mut self) -> &mut ChannelStream {
        &mut self.stream
    }
}

/// Handle for scripting and inspecting a [`MockSensor`].
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockSensorHandle {
    /// Queue a capture poll result.
    pub async fn queue_capture(&self, capture: ScriptedCapture) {
        self.state.lock().await.captures.push_back(capture);
    }

    /// Next capture sees a finger with the given image.
    pub async fn present_finger(&self, image: Vec<u8>) {
        self.queue_capture(ScriptedCapture::Finger(image)).await;
    }

    /// Next capture sees an empty sensor.
    pub async fn lift_finger(&self) {
        self.queue_capture(ScriptedCapture::NoFinger).await;
    }

    /// Script a full enrollment: place, lift, place again.
    pub async fn script_enrollment(&self, first: Vec<u8>, second: Vec<u8>) {
        let mut state = self.state.lock().await;
        state.captures.push_back(ScriptedCapture::Finger(first));
        state.captures.push_back(ScriptedCapture::NoFinger);
        state.captures.push_back(ScriptedCapture::Finger(second));
    }

    /// Make the next call of `op` fail with `code`.
    pub async fn fail_next(&self, op: SensorOp, code: ConfirmationCode) {
        self.state
            .lock()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(code);
    }

    /// Put a model straight into the library.
    pub async fn insert_model(&self, id: TemplateId, model: [u8; TEMPLATE_SIZE]) {
        self.state.lock().await.library.insert(id.as_u16(), model);
    }

    /// Stored model at `id`, if any.
    pub async fn model(&self, id: TemplateId) -> Option<[u8; TEMPLATE_SIZE]> {
        self.state.lock().await.library.get(&id.as_u16()).copied()
    }

    /// Accept transfers of `id` but never send its data.
    pub async fn silence(&self, id: TemplateId) {
        self.state.lock().await.silenced.insert(id.as_u16());
    }

    /// Override the count reported by `template_count`.
    pub async fn set_reported_count(&self, count: Option<u16>) {
        self.state.lock().await.reported_count = count;
    }

    /// Payload size of upload packets.
    pub async fn set_chunk_size(&self, chunk_size: usize) {
        self.state.lock().await.chunk_size = chunk_size;
    }

    /// Inject raw bytes into the transfer stream.
    pub async fn inject(&self, bytes: impl Into<Bytes>) {
        self.state.lock().await.feeder.feed(bytes);
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<SensorCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls of `op` made so far.
    pub async fn call_count(&self, op: SensorOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }
}
