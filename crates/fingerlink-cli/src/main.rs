//! `fingerlink` command-line entry point.
//!
//! Logs go to stderr (filtered by `RUST_LOG`, default `info`); stdout carries
//! one JSON envelope per published report:
//!
//! ```text
//! {"topic":"fingerprint/status","timestamp":"...","payload":{"status":"place_finger","message":"Place your finger."}}
//! ```

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use fingerlink_biometric::{AnySensorDevice, SerialBridge, open_serial_sensor};
use fingerlink_core::constants::TEMPLATE_SIZE;
use fingerlink_core::{EnrollmentConfig, TemplateEncoding, TemplateId};
use fingerlink_enrollment::{
    ChannelReporter, DownloadDriver, EnrolledCounter, EnrollmentCoordinator, ReportEvent,
    Reporter, VerificationFlow,
};
use fingerlink_hardware::SensorDevice;
use fingerlink_hardware::mock::MockSensor;
use fingerlink_storage::{Database, DurableStore, MemoryStore, SqliteStore};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::config::Settings;

/// Features the mock sensor reports for its simulated finger.
const MOCK_FINGER: [u8; 32] = [
    0x3A, 0x91, 0x0C, 0x57, 0xE2, 0x18, 0x6D, 0xB4, 0x2F, 0x80, 0xC9, 0x45, 0x1E, 0x73, 0xA6,
    0x0B, 0xD8, 0x64, 0x39, 0xF1, 0x52, 0x8E, 0x07, 0xBC, 0x6A, 0x13, 0xE5, 0x4C, 0x98, 0x21,
    0x7F, 0xD0,
];

/// Templates preloaded into the mock sensor library.
const MOCK_LIBRARY_SIZE: u16 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let settings = Settings::resolve(&args)?;
    info!("fingerlink v{}", env!("CARGO_PKG_VERSION"));

    let (mut sensor, _bridge) = open_sensor(&args, &settings).await?;
    match sensor.get_info().await {
        Ok(device) => info!(name = %device.name, model = %device.model, "Sensor ready"),
        Err(e) => warn!(error = %e, "Sensor info unavailable"),
    }

    let (reporter, events) = ChannelReporter::new();
    let printer = spawn_printer(events, settings.enrollment.template_encoding);

    let outcome = if args.mock {
        let counter = EnrolledCounter::load(MemoryStore::new()).await?;
        run(&args.command, &settings, &mut sensor, &reporter, counter).await
    } else {
        let db = Database::new(settings.database.clone())
            .await
            .with_context(|| format!("Failed to open {}", settings.database.database_path))?;
        let counter = EnrolledCounter::load(SqliteStore::new(db.pool().clone()))
            .await
            .context("Failed to load enrolled count")?;
        let outcome = run(&args.command, &settings, &mut sensor, &reporter, counter).await;
        db.close().await;
        outcome
    };

    drop(reporter);
    printer.await.context("Report printer failed")?;
    outcome
}

async fn open_sensor(
    args: &Args,
    settings: &Settings,
) -> Result<(AnySensorDevice, Option<SerialBridge>)> {
    if args.mock {
        let (sensor, handle) = MockSensor::new();
        handle.script_enrollment(MOCK_FINGER.to_vec(), MOCK_FINGER.to_vec()).await;
        handle.present_finger(MOCK_FINGER.to_vec()).await;
        for (i, id) in TemplateId::range(MOCK_LIBRARY_SIZE).enumerate() {
            handle.insert_model(id, mock_model(i as u8)).await;
        }
        info!("Using mock sensor");
        return Ok((AnySensorDevice::from(sensor), None));
    }

    let (sensor, bridge) = open_serial_sensor(&settings.serial, &settings.enrollment)
        .with_context(|| format!("Failed to open sensor on {}", settings.serial.port))?;
    Ok((AnySensorDevice::from(sensor), Some(bridge)))
}

fn mock_model(seed: u8) -> [u8; TEMPLATE_SIZE] {
    let mut model = [0u8; TEMPLATE_SIZE];
    for (i, byte) in model.iter_mut().enumerate() {
        *byte = MOCK_FINGER[i % MOCK_FINGER.len()] ^ seed.wrapping_mul(0x1D);
    }
    model
}

async fn run<D: DurableStore>(
    command: &Command,
    settings: &Settings,
    sensor: &mut AnySensorDevice,
    reporter: &ChannelReporter,
    counter: EnrolledCounter<D>,
) -> Result<()> {
    let config: &EnrollmentConfig = &settings.enrollment;

    match command {
        Command::Enroll { id } => {
            let mut coordinator = EnrollmentCoordinator::new(config.clone(), counter);
            let enrollment = coordinator.enroll(sensor, reporter, *id).await?;
            info!(id = %enrollment.id, count = enrollment.enrolled_count, "Enrolled");
        }
        Command::Verify => {
            let outcome = VerificationFlow::new(config).verify(sensor, reporter).await?;
            info!(?outcome, "Verification finished");
        }
        Command::Download { id, attempts } => {
            let attempts = attempts.unwrap_or(config.max_attempts);
            let mut driver = DownloadDriver::new(config);
            match driver.download_one(sensor, reporter, *id, attempts).await {
                Ok(_) => reporter.publish_result(*id, true, "Template downloaded."),
                Err(e) => {
                    reporter.publish_result(*id, false, &e.to_string());
                    return Err(e.into());
                }
            }
        }
        Command::DownloadAll {
            upper_bound,
            attempts,
        } => {
            let upper_bound = upper_bound.unwrap_or(config.sensor_capacity);
            let attempts = attempts.unwrap_or(config.max_attempts);
            let report = DownloadDriver::new(config)
                .download_all(sensor, reporter, upper_bound, attempts)
                .await?;
            info!(
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                "Bulk download report"
            );
        }
        Command::Count => reporter.publish_count(counter.get()),
        Command::ResetCount => {
            let mut counter = counter;
            counter.reset().await.context("Failed to reset enrolled count")?;
            reporter.publish_count(counter.get());
        }
    }

    Ok(())
}

fn spawn_printer(
    mut events: UnboundedReceiver<ReportEvent>,
    encoding: TemplateEncoding,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event.into_envelope(encoding)) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to render report"),
            }
        }
    })
}
