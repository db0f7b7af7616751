use crate::data::snapshot::SpeedMeasurement;
use crate::error::ProbeError;
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod cli_probe;

/// speedtest-cli reports throughput in bits per second.
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// A bandwidth measurement backend. Every call blocks until the stage is done.
pub trait SpeedProbe: Send {
    /// Picks the lowest-latency server; fails when there are no candidates.
    fn select_best_server(&mut self) -> Result<(), ProbeError>;

    fn measure_download_bits_per_second(&mut self) -> Result<f64, ProbeError>;

    fn measure_upload_bits_per_second(&mut self) -> Result<f64, ProbeError>;

    /// Latency to the selected server.
    fn last_ping_ms(&self) -> Result<f64, ProbeError>;
}

pub type SpeedTestResult = Result<SpeedMeasurement, ProbeError>;

/// Builds a probe for one run. The token is cancelled when the run is
/// abandoned; probes that block for long should watch it.
type ProbeFactory =
    Box<dyn Fn(CancellationToken) -> Result<Box<dyn SpeedProbe>, ProbeError> + Send + Sync>;

/// Runs one complete speed test against a freshly built probe.
///
/// Holds no state between runs; callers keep runs from overlapping.
pub struct SpeedTestRunner {
    factory: ProbeFactory,
}

impl SpeedTestRunner {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(CancellationToken) -> Result<Box<dyn SpeedProbe>, ProbeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            factory: Box::new(factory),
        }
    }

    /// Server selection, download, upload, then ping. Any failing stage fails
    /// the whole run and later stages are not attempted. Once `cancel` fires
    /// no further stage starts.
    pub fn run(&self, cancel: &CancellationToken) -> SpeedTestResult {
        let started = Instant::now();
        let result = self.measure(cancel);
        match &result {
            Ok(measurement) => info!(
                "speed test finished in {:.1}s: {:.1} Mbps down, {:.1} Mbps up, {:.0} ms",
                started.elapsed().as_secs_f64(),
                measurement.download_mbps,
                measurement.upload_mbps,
                measurement.ping_ms
            ),
            Err(err) => warn!("speed test failed: {}", err),
        }
        result
    }

    fn measure(&self, cancel: &CancellationToken) -> SpeedTestResult {
        let checkpoint = || {
            if cancel.is_cancelled() {
                Err(ProbeError::Cancelled)
            } else {
                Ok(())
            }
        };

        let mut probe = (self.factory)(cancel.clone())?;
        checkpoint()?;
        probe.select_best_server()?;
        checkpoint()?;
        let download = probe.measure_download_bits_per_second()?;
        checkpoint()?;
        let upload = probe.measure_upload_bits_per_second()?;
        let ping_ms = probe.last_ping_ms()?;

        Ok(SpeedMeasurement {
            download_mbps: download / BITS_PER_MEGABIT,
            upload_mbps: upload / BITS_PER_MEGABIT,
            ping_ms,
        })
    }
}

/// Runs `runner` on the blocking pool, bounded by `limit` and `cancel`.
///
/// Timing out, cancelling or dropping this future cancels the worker's token,
/// so the worker starts no further stage and its probe stops the stage in
/// flight.
pub async fn run_bounded(
    runner: Arc<SpeedTestRunner>,
    limit: Duration,
    cancel: CancellationToken,
) -> SpeedTestResult {
    let worker_cancel = cancel.child_token();
    let _stop_worker = worker_cancel.clone().drop_guard();
    let work = tokio::task::spawn_blocking(move || runner.run(&worker_cancel));
    select! {
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        joined = tokio::time::timeout(limit, work) => match joined {
            Err(_) => {
                warn!("speed test exceeded {:?}", limit);
                Err(ProbeError::Timeout(limit))
            }
            Ok(Err(join_err)) => Err(ProbeError::Worker(join_err.to_string())),
            Ok(Ok(result)) => result,
        },
    }
}

/// A speed test running in the background. Exactly one result is sent on
/// the channel; dropping the handle cancels the run.
pub struct SpeedTestTask {
    cancel: CancellationToken,
}

impl SpeedTestTask {
    pub fn spawn(
        runner: Arc<SpeedTestRunner>,
        limit: Duration,
        sender: mpsc::UnboundedSender<SpeedTestResult>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        info!("speed test started");
        tokio::spawn(async move {
            let result = run_bounded(runner, limit, token).await;
            let _ = sender.send(result);
        });

        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SpeedTestTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
