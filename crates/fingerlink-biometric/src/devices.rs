//! Enum wrapper for sensor dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn SensorDevice>`
//! is not available. [`AnySensorDevice`] provides concrete dispatch instead,
//! letting the CLI pick the real or the mock sensor at runtime.
//!
//! ```
//! use fingerlink_biometric::AnySensorDevice;
//! use fingerlink_hardware::mock::MockSensor;
//!
//! let (sensor, _handle) = MockSensor::new();
//! let any_sensor = AnySensorDevice::Mock(sensor);
//! ```

use fingerlink_core::{FeatureSlot, TemplateId};
use fingerlink_hardware::mock::MockSensor;
use fingerlink_hardware::{
    BuildOutcome, CaptureOutcome, DeviceInfo, SearchOutcome, SensorDevice, SensorResult,
};
use fingerlink_protocol::ChannelStream;

use crate::sensor::SerialSensor;

/// Any supported sensor.
#[derive(Debug)]
pub enum AnySensorDevice {
    /// Mock sensor for development and testing.
    Mock(MockSensor),
    /// R30x module on a serial port.
    Serial(SerialSensor<ChannelStream>),
}

impl SensorDevice for AnySensorDevice {
    type Stream = ChannelStream;

    async fn capture_image(&mut self) -> SensorResult<CaptureOutcome> {
        match self {
            Self::Mock(device) => device.capture_image().await,
            Self::Serial(device) => device.capture_image().await,
        }
    }

    async fn image_to_feature(&mut self, slot: FeatureSlot) -> SensorResult<()> {
        match self {
            Self::Mock(device) => device.image_to_feature(slot).await,
            Self::Serial(device) => device.image_to_feature(slot).await,
        }
    }

    async fn build_model(&mut self) -> SensorResult<BuildOutcome> {
        match self {
            Self::Mock(device) => device.build_model().await,
            Self::Serial(device) => device.build_model().await,
        }
    }

    async fn store_model(&mut self, id: TemplateId) -> SensorResult<()> {
        match self {
            Self::Mock(device) => device.store_model(id).await,
            Self::Serial(device) => device.store_model(id).await,
        }
    }

    async fn load_model(&mut self, id: TemplateId) -> SensorResult<()> {
        match self {
            Self::Mock(device) => device.load_model(id).await,
            Self::Serial(device) => device.load_model(id).await,
        }
    }

    async fn begin_transfer(&mut self) -> SensorResult<()> {
        match self {
            Self::Mock(device) => device.begin_transfer().await,
            Self::Serial(device) => device.begin_transfer().await,
        }
    }

    async fn search(&mut self) -> SensorResult<SearchOutcome> {
        match self {
            Self::Mock(device) => device.search().await,
            Self::Serial(device) => device.search().await,
        }
    }

    async fn template_count(&mut self) -> SensorResult<u16> {
        match self {
            Self::Mock(device) => device.template_count().await,
            Self::Serial(device) => device.template_count().await,
        }
    }

    async fn get_info(&self) -> SensorResult<DeviceInfo> {
        match self {
            Self::Mock(device) => device.get_info().await,
            Self::Serial(device) => device.get_info().await,
        }
    }

    fn transfer_stream(&mut self) -> &mut ChannelStream {
        match self {
            Self::Mock(device) => device.transfer_stream(),
            Self::Serial(device) => device.transfer_stream(),
        }
    }
}

impl From<MockSensor> for AnySensorDevice {
    fn from(sensor: MockSensor) -> Self {
        Self::Mock(sensor)
    }
}

impl From<SerialSensor<ChannelStream>> for AnySensorDevice {
    fn from(sensor: SerialSensor<ChannelStream>) -> Self {
        Self::Serial(sensor)
    }
}
