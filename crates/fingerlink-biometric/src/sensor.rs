//! R30x-family optical sensor driver.
//!
//! Each [`SensorDevice`] operation sends one command packet and waits for
//! the matching acknowledgement. Packets other than acks that arrive while
//! waiting are skipped. Template upload data is left in the stream for the
//! caller to assemble.

use fingerlink_core::{EnrollmentConfig, FeatureSlot, SerialConfig, TemplateId};
use fingerlink_hardware::{
    BuildOutcome, CaptureOutcome, DeviceInfo, HardwareError, SearchOutcome, SensorDevice,
    SensorError, SensorResult,
};
use fingerlink_protocol::{
    Ack, ByteStream, ChannelStream, Command, ConfirmationCode, Instant, PacketType, ReadOutcome,
    SerialFrameReader,
};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::port::{SerialBridge, open_port};

/// Driver for a sensor reached over `B`.
#[derive(Debug)]
pub struct SerialSensor<B> {
    stream: B,
    name: String,
    address: u32,
    reader: SerialFrameReader,
    ack_timeout: Duration,
    capacity: u16,
}

impl<B: ByteStream> SerialSensor<B> {
    /// Create a driver talking to the sensor at `address`.
    pub fn new(stream: B, address: u32) -> Self {
        let defaults = EnrollmentConfig::default();
        Self {
            stream,
            name: "serial sensor".to_string(),
            address,
            reader: SerialFrameReader::new(defaults.max_payload),
            ack_timeout: defaults.ack_timeout(),
            capacity: defaults.sensor_capacity,
        }
    }

    /// Set the acknowledgement deadline.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the number of library pages searched.
    pub fn with_capacity(mut self, capacity: u16) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the largest payload accepted while waiting for acks.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.reader = SerialFrameReader::new(max_payload);
        self
    }

    /// Set the name reported by `get_info`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    /// Send `command` and wait for its acknowledgement.
    async fn execute(&mut self, command: Command) -> SensorResult<Ack> {
        let instruction = command.instruction();
        trace!(%instruction, "Sending command");
        self.stream.write_all(&command.encode(self.address)).await?;

        let deadline = Instant::now() + self.ack_timeout;
        loop {
            match self.reader.next_packet(&mut self.stream, deadline).await {
                ReadOutcome::Packet(packet) if packet.kind == PacketType::Ack => {
                    let ack = Ack::from_packet(packet)?;
                    trace!(%instruction, code = %ack.code, "Acknowledged");
                    return Ok(ack);
                }
                ReadOutcome::Packet(packet) => {
                    debug!(
                        %instruction,
                        kind = ?packet.kind,
                        "Skipping packet while awaiting ack"
                    );
                }
                ReadOutcome::Resynced { .. } => {}
                ReadOutcome::HeaderTimeout | ReadOutcome::ShortRead { .. } => {
                    let timeout_ms = self.ack_timeout.as_millis() as u64;
                    warn!(%instruction, timeout_ms, "No acknowledgement");
                    return Err(SensorError::AckTimeout {
                        instruction,
                        timeout_ms,
                    });
                }
            }
        }
    }

    /// Like [`execute`](Self::execute) but turns any non-OK code into an error.
    async fn execute_ok(&mut self, command: Command) -> SensorResult<Ack> {
        let ack = self.execute(command).await?;
        match SensorError::from_code(ack.code) {
            Some(error) => Err(error),
            None => Ok(ack),
        }
    }
}

/// Error for a confirmation code the operation has no outcome for.
fn rejection(code: ConfirmationCode) -> SensorError {
    SensorError::from_code(code).unwrap_or(SensorError::Unknown(code.as_u8()))
}

impl<B: ByteStream> SensorDevice for SerialSensor<B> {
    type Stream = B;

    async fn capture_image(&mut self) -> SensorResult<CaptureOutcome> {
        let ack = self.execute(Command::capture_image()).await?;
        match ack.code {
            ConfirmationCode::Ok => Ok(CaptureOutcome::Captured),
            ConfirmationCode::NoFinger => Ok(CaptureOutcome::NoFinger),
            other => Err(rejection(other)),
        }
    }

    async fn image_to_feature(&mut self, slot: FeatureSlot) -> SensorResult<()> {
        self.execute_ok(Command::image_to_feature(slot)).await?;
        Ok(())
    }

    async fn build_model(&mut self) -> SensorResult<BuildOutcome> {
        let ack = self.execute(Command::build_model()).await?;
        match ack.code {
            ConfirmationCode::Ok => Ok(BuildOutcome::Built),
            ConfirmationCode::EnrollMismatch => Ok(BuildOutcome::Mismatch),
            other => Err(rejection(other)),
        }
    }

    async fn store_model(&mut self, id: TemplateId) -> SensorResult<()> {
        self.execute_ok(Command::store(FeatureSlot::First, id)).await?;
        debug!(%id, "Model stored");
        Ok(())
    }

    async fn load_model(&mut self, id: TemplateId) -> SensorResult<()> {
        self.execute_ok(Command::load(FeatureSlot::First, id)).await?;
        Ok(())
    }

    async fn begin_transfer(&mut self) -> SensorResult<()> {
        self.execute_ok(Command::upload(FeatureSlot::First)).await?;
        Ok(())
    }

    async fn search(&mut self) -> SensorResult<SearchOutcome> {
        let ack = self
            .execute(Command::search(FeatureSlot::First, 0, self.capacity))
            .await?;
        match ack.code {
            ConfirmationCode::Ok => {
                let page = ack.read_u16(0)?;
                let confidence = ack.read_u16(2)?;
                let id = TemplateId::new(page).map_err(|e| {
                    HardwareError::invalid_data(format!("Search returned page {page}: {e}"))
                })?;
                Ok(SearchOutcome::Matched { id, confidence })
            }
            ConfirmationCode::NotFound => Ok(SearchOutcome::NotFound),
            other => Err(rejection(other)),
        }
    }

    async fn template_count(&mut self) -> SensorResult<u16> {
        let ack = self.execute_ok(Command::template_count()).await?;
        Ok(ack.read_u16(0)?)
    }

    async fn get_info(&self) -> SensorResult<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "R30x optical sensor")
            .with_capacity(self.capacity))
    }

    fn transfer_stream(&mut self) -> &mut B {
        &mut self.stream
    }
}

/// Open the serial port and wrap it in a configured driver.
///
/// # Errors
/// Returns an error if the port cannot be opened.
pub fn open_serial_sensor(
    serial: &SerialConfig,
    config: &EnrollmentConfig,
) -> fingerlink_hardware::Result<(SerialSensor<ChannelStream>, SerialBridge)> {
    let (stream, bridge) = open_port(serial)?;
    let sensor = SerialSensor::new(stream, serial.address)
        .with_name(serial.port.clone())
        .with_ack_timeout(config.ack_timeout())
        .with_capacity(config.sensor_capacity)
        .with_max_payload(config.max_payload);
    Ok((sensor, bridge))
}
