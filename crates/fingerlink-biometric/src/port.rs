//! Serial port bridge.
//!
//! `serialport` is blocking, so the port is driven by two OS threads:
//!
//! ```text
//!            ┌──────────── reader thread ────────────┐
//!  port ────>│ read(100ms timeout) -> StreamFeeder   │────> ChannelStream
//!            └───────────────────────────────────────┘          │
//!            ┌──────────── writer thread ────────────┐          │ write_all
//!  port <────│ blocking_recv() -> write_all + flush  │<─────────┘
//!            └───────────────────────────────────────┘
//! ```
//!
//! The reader stops when the stream is dropped or [`SerialBridge::close`] is
//! called; the writer stops when the stream is dropped.

use bytes::Bytes;
use fingerlink_core::SerialConfig;
use fingerlink_hardware::{HardwareError, Result};
use fingerlink_protocol::{ChannelStream, StreamFeeder};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

/// Read timeout of the port; bounds how long the reader takes to notice shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Size of one read from the port.
const READ_CHUNK: usize = 256;

/// Owns the threads moving bytes between a serial port and a [`ChannelStream`].
#[derive(Debug)]
pub struct SerialBridge {
    port_name: String,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl SerialBridge {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Stop the reader thread and wait for it.
    pub fn close(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!(port = %self.port_name, "Serial reader thread panicked");
            }
        }
    }
}

impl Drop for SerialBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the configured port and return the stream bridged to it.
///
/// # Errors
/// Returns `HardwareError::InitializationFailed` if the port cannot be opened
/// or cloned.
pub fn open_port(config: &SerialConfig) -> Result<(ChannelStream, SerialBridge)> {
    info!(port = %config.port, baud = config.baud_rate, "Opening serial port");

    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| {
            HardwareError::initialization_failed(format!("Failed to open {}: {e}", config.port))
        })?;
    let write_port = port.try_clone().map_err(|e| {
        HardwareError::initialization_failed(format!("Failed to clone {}: {e}", config.port))
    })?;

    let (stream, endpoint) = ChannelStream::pair();
    let (feeder, written) = endpoint.into_parts();
    let shutdown = Arc::new(AtomicBool::new(false));

    let reader = {
        let shutdown = Arc::clone(&shutdown);
        let name = config.port.clone();
        thread::Builder::new()
            .name("sensor-rx".into())
            .spawn(move || run_reader(port, feeder, shutdown, name))?
    };

    {
        let name = config.port.clone();
        thread::Builder::new()
            .name("sensor-tx".into())
            .spawn(move || run_writer(write_port, written, name))?;
    }

    Ok((
        stream,
        SerialBridge {
            port_name: config.port.clone(),
            shutdown,
            reader: Some(reader),
        },
    ))
}

fn run_reader<R: Read>(
    mut port: R,
    feeder: StreamFeeder,
    shutdown: Arc<AtomicBool>,
    name: String,
) {
    let mut buffer = [0u8; READ_CHUNK];

    while !shutdown.load(Ordering::Relaxed) && !feeder.is_closed() {
        match port.read(&mut buffer) {
            Ok(0) => continue,
            Ok(n) => {
                if !feeder.feed(Bytes::copy_from_slice(&buffer[..n])) {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                continue;
            }
            Err(e) => {
                warn!(port = %name, error = %e, "Serial read failed, stopping reader");
                break;
            }
        }
    }

    debug!(port = %name, "Serial reader stopped");
}

fn run_writer<W: Write>(mut port: W, mut written: UnboundedReceiver<Bytes>, name: String) {
    while let Some(chunk) = written.blocking_recv() {
        if let Err(e) = port.write_all(&chunk).and_then(|()| port.flush()) {
            warn!(port = %name, error = %e, "Serial write failed, stopping writer");
            break;
        }
    }

    debug!(port = %name, "Serial writer stopped");
}
