//! Template retrieval from the sensor library.
//!
//! A single retrieval is a bounded retry loop around one transfer:
//!
//! ```text
//! attempt 1..=max_attempts:
//!     discard stale bytes on the transfer stream
//!     load_model(id) ──err──┐
//!     begin_transfer() ─err─┤
//!     assemble(deadline) ───┤ Incomplete
//!         │ Complete        ▼
//!         ▼               sleep(retry_delay), next attempt
//!     publish_template, done
//! ```
//!
//! A bulk retrieval runs that loop for every id up to the number of stored
//! templates, records failures per id and keeps going.

use std::time::Duration;

use fingerlink_core::{EnrollmentConfig, Stage, TemplateId, TemplatePayload};
use fingerlink_hardware::SensorDevice;
use fingerlink_protocol::{Assembly, ByteStream, TemplateAssembler};
use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::report::Reporter;

/// One id that could not be retrieved during a bulk download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: TemplateId,
    pub reason: String,
}

/// Aggregate outcome of [`DownloadDriver::download_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub succeeded: Vec<TemplateId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Every id was retrieved.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some ids were retrieved and some were not.
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    fn summary(&self) -> String {
        format!(
            "Bulk download finished: {} retrieved, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}

/// Retrieves stored templates over a sensor's transfer stream.
#[derive(Debug, Clone)]
pub struct DownloadDriver {
    assembler: TemplateAssembler,
    transfer_timeout: Duration,
    retry_delay: Duration,
    pacing: Duration,
}

impl DownloadDriver {
    pub fn new(config: &EnrollmentConfig) -> Self {
        Self {
            assembler: TemplateAssembler::with_max_payload(config.max_payload),
            transfer_timeout: config.transfer_timeout_duration(),
            retry_delay: config.retry_delay_duration(),
            pacing: config.bulk_pacing(),
        }
    }

    pub fn assembler(&self) -> &TemplateAssembler {
        &self.assembler
    }

    /// Retrieve the template stored at `id`, trying up to `max_attempts` times.
    ///
    /// On success the template is published and returned. Each attempt
    /// starts from a drained stream and an empty buffer.
    ///
    /// # Errors
    /// - `DownloadError::InvalidId` for id 0, without any sensor call
    /// - `DownloadError::Exhausted` once every attempt failed
    pub async fn download_one<S, R>(
        &mut self,
        sensor: &mut S,
        reporter: &R,
        id: u16,
        max_attempts: u8,
    ) -> Result<TemplatePayload, DownloadError>
    where
        S: SensorDevice,
        R: Reporter + ?Sized,
    {
        let id = TemplateId::new(id).map_err(|_| DownloadError::InvalidId(id))?;
        let mut last = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                sleep(self.retry_delay).await;
            }

            let stale = sensor.transfer_stream().discard_input();
            if stale > 0 {
                debug!(%id, stale, "Discarded stale transfer bytes");
            }

            if let Err(e) = sensor.load_model(id).await {
                warn!(%id, attempt, error = %e, "Failed to load template");
                last = format!("load failed: {e}");
                continue;
            }
            if let Err(e) = sensor.begin_transfer().await {
                warn!(%id, attempt, error = %e, "Failed to start template upload");
                last = format!("upload request failed: {e}");
                continue;
            }

            let deadline = Instant::now() + self.transfer_timeout;
            match self.assembler.assemble(sensor.transfer_stream(), deadline).await {
                Assembly::Complete { template, cycles } => {
                    info!(%id, attempt, cycles, "Template retrieved");
                    reporter.publish_template(id, &template);
                    return Ok(template);
                }
                Assembly::Incomplete {
                    collected,
                    cycles,
                    reason,
                } => {
                    warn!(%id, attempt, collected, cycles, ?reason, "Incomplete template received");
                    last = format!("incomplete template ({collected} bytes, {reason:?})");
                }
            }
        }

        Err(DownloadError::Exhausted {
            id,
            attempts: max_attempts,
            last,
        })
    }

    /// Retrieve every stored template, up to `upper_bound` of them.
    ///
    /// The number of ids visited is the smaller of the sensor's reported
    /// count and `upper_bound`; if the count query fails, `upper_bound` is
    /// used. A failure result is published for every id that could not be
    /// retrieved, and a completion status is published at the end whatever
    /// the outcome.
    ///
    /// # Errors
    /// Returns `DownloadError::NothingToDownload` if there is nothing to visit.
    pub async fn download_all<S, R>(
        &mut self,
        sensor: &mut S,
        reporter: &R,
        upper_bound: u16,
        max_attempts: u8,
    ) -> Result<BulkReport, DownloadError>
    where
        S: SensorDevice,
        R: Reporter + ?Sized,
    {
        let reported = match sensor.template_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, upper_bound, "Template count unavailable, using upper bound");
                upper_bound
            }
        };
        let count = reported.min(upper_bound);

        if count == 0 {
            info!("No templates to download");
            reporter.publish_result(0, false, "No templates to download.");
            return Err(DownloadError::NothingToDownload);
        }

        info!(count, "Starting bulk template download");
        let mut report = BulkReport::default();

        for id in TemplateId::range(count) {
            if report.attempted() > 0 {
                sleep(self.pacing).await;
            }

            match self.download_one(sensor, reporter, id.as_u16(), max_attempts).await {
                Ok(_) => report.succeeded.push(id),
                Err(e) => {
                    let reason = e.to_string();
                    reporter.publish_result(id.as_u16(), false, &reason);
                    report.failed.push(BulkFailure { id, reason });
                }
            }
        }

        let stage = if report.is_complete() {
            Stage::Success
        } else {
            Stage::Error
        };
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Bulk template download finished"
        );
        reporter.publish_status(stage, &report.summary());

        Ok(report)
    }
}
