use std::time::Duration;

use fingerlink_hardware::{CaptureOutcome, SensorDevice, SensorError};
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

pub(crate) enum WaitFailure {
    TimedOut,
    Sensor(SensorError),
}

/// Poll `capture_image` until an image is taken.
///
/// `NoFinger` re-polls after `poll`; any other error ends the wait.
pub(crate) async fn wait_for_finger<S: SensorDevice>(
    sensor: &mut S,
    poll: Duration,
    timeout: Duration,
) -> Result<(), WaitFailure> {
    let deadline = Instant::now() + timeout;

    loop {
        match sensor.capture_image().await {
            Ok(CaptureOutcome::Captured) => return Ok(()),
            Ok(CaptureOutcome::NoFinger) => trace!("No finger yet"),
            Err(e) => return Err(WaitFailure::Sensor(e)),
        }

        if Instant::now() + poll > deadline {
            return Err(WaitFailure::TimedOut);
        }
        sleep(poll).await;
    }
}

/// Poll `capture_image` until the sensor surface is empty.
///
/// Imaging errors while the finger is being lifted count as "still present";
/// link failures end the wait.
pub(crate) async fn wait_for_removal<S: SensorDevice>(
    sensor: &mut S,
    poll: Duration,
    timeout: Duration,
) -> Result<(), WaitFailure> {
    let deadline = Instant::now() + timeout;

    loop {
        match sensor.capture_image().await {
            Ok(CaptureOutcome::NoFinger) => return Ok(()),
            Ok(CaptureOutcome::Captured) => trace!("Finger still present"),
            Err(e) if e.is_link() => return Err(WaitFailure::Sensor(e)),
            Err(e) => debug!(error = %e, "Capture error while waiting for removal"),
        }

        if Instant::now() + poll > deadline {
            return Err(WaitFailure::TimedOut);
        }
        sleep(poll).await;
    }
}
