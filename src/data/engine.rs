use crate::data::snapshot::{CounterSnapshot, NetworkStatus, Snapshot};
use crate::data::source::MetricSource;
use crate::data::temperature::TemperatureResolver;
use crate::error::SourceError;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_KB: f64 = 1024.0;

/// Turns raw MetricSource readings into one [`Snapshot`] per tick.
///
/// The only state carried between ticks is the last network counter
/// baseline, the last derived rates and the cached boot time. The engine is
/// owned by a single scheduler and never shared, so none of it is locked.
pub struct SampleEngine<S> {
    source: S,
    disk_path: PathBuf,
    baseline: Option<CounterSnapshot>,
    last_rates: (f64, f64),
    boot_time: Option<DateTime<Utc>>,
    temperature: TemperatureResolver,
}

impl<S: MetricSource> SampleEngine<S> {
    pub fn new(source: S, disk_path: impl Into<PathBuf>) -> Self {
        Self::starting_at(source, disk_path, Utc::now())
    }

    /// Builds the engine and takes the first counter baseline at `now`, so
    /// the first tick reports a real rate instead of the total since boot.
    pub fn starting_at(mut source: S, disk_path: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        let baseline = match source.network_counters() {
            Ok((bytes_sent, bytes_received)) => Some(CounterSnapshot {
                bytes_sent,
                bytes_received,
                observed_at: now,
            }),
            Err(err) => {
                warn!("no initial network baseline: {}", err);
                None
            }
        };
        let boot_time = query_boot_time(&mut source);

        Self {
            source,
            disk_path: disk_path.into(),
            baseline,
            last_rates: (0.0, 0.0),
            boot_time,
            temperature: TemperatureResolver::new(),
        }
    }

    pub fn tick(&mut self) -> Snapshot {
        self.tick_at(Utc::now())
    }

    /// One sampling pass with `now` as the wall-clock time of the tick.
    /// Never fails; unreadable metrics come back as `None`.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Snapshot {
        let cpu_percent = self.read("cpu", |source| source.cpu_percent());
        let memory_percent = self.read("memory", |source| source.memory_percent());
        let disk_path = self.disk_path.clone();
        let disk_percent = self.read("disk", |source| source.disk_percent(&disk_path));
        let (upload_rate_kbs, download_rate_kbs) = self.update_rates(now);
        let temperature_celsius = self.temperature.resolve(self.source.sensor_temperatures());
        let uptime = self.uptime_at(now);
        let network = self.network_status();
        let battery = self
            .read("battery", |source| source.battery_state())
            .flatten();

        debug!(
            "tick: cpu={:?} mem={:?} disk={:?} up={:?} down={:?}",
            cpu_percent, memory_percent, disk_percent, upload_rate_kbs, download_rate_kbs
        );

        Snapshot {
            cpu_percent,
            memory_percent,
            temperature_celsius,
            disk_percent,
            upload_rate_kbs,
            download_rate_kbs,
            uptime,
            network,
            battery,
            sampled_at: now,
        }
    }

    fn read<T>(
        &mut self,
        metric: &str,
        query: impl FnOnce(&mut S) -> Result<T, SourceError>,
    ) -> Option<T> {
        match query(&mut self.source) {
            Ok(value) => Some(value),
            Err(err @ SourceError::Unsupported(_)) => {
                debug!("{} unavailable: {}", metric, err);
                None
            }
            Err(err) => {
                warn!("{} query failed: {}", metric, err);
                None
            }
        }
    }

    fn update_rates(&mut self, now: DateTime<Utc>) -> (Option<f64>, Option<f64>) {
        let (bytes_sent, bytes_received) = match self.source.network_counters() {
            Ok(counters) => counters,
            Err(err) => {
                warn!("network counters unavailable: {}", err);
                return (None, None);
            }
        };

        let rates = match self.baseline {
            None => (0.0, 0.0),
            Some(previous) => {
                let elapsed = elapsed_seconds(previous.observed_at, now);
                if elapsed <= 0.0 {
                    // Keep the old baseline so the next tick measures a real interval.
                    debug!("non-positive tick interval ({}s), reusing last rates", elapsed);
                    return (Some(self.last_rates.0), Some(self.last_rates.1));
                }
                if bytes_sent < previous.bytes_sent || bytes_received < previous.bytes_received {
                    debug!("network counters went backwards, clamping rates to zero");
                }
                (
                    rate_kbs(previous.bytes_sent, bytes_sent, elapsed),
                    rate_kbs(previous.bytes_received, bytes_received, elapsed),
                )
            }
        };

        self.baseline = Some(CounterSnapshot {
            bytes_sent,
            bytes_received,
            observed_at: now,
        });
        self.last_rates = rates;
        (Some(rates.0), Some(rates.1))
    }

    fn uptime_at(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        if self.boot_time.is_none() {
            self.boot_time = query_boot_time(&mut self.source);
        }
        let boot = self.boot_time?;
        (now - boot).to_std().ok()
    }

    fn network_status(&mut self) -> NetworkStatus {
        match self.source.resolve_local_address() {
            Ok(host_address) => NetworkStatus::Connected { host_address },
            Err(err) => {
                debug!("network disconnected: {}", err);
                NetworkStatus::Disconnected
            }
        }
    }
}

fn query_boot_time<S: MetricSource>(source: &mut S) -> Option<DateTime<Utc>> {
    match source.boot_timestamp() {
        Ok(secs) => DateTime::<Utc>::from_timestamp(secs as i64, 0),
        Err(err) => {
            warn!("boot time unavailable: {}", err);
            None
        }
    }
}

fn elapsed_seconds(previous: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let delta = now - previous;
    if delta <= chrono::Duration::zero() {
        return 0.0;
    }
    delta
        .num_microseconds()
        .map(|micros| micros as f64 / 1_000_000.0)
        .unwrap_or(f64::MAX)
}

/// A counter that decreased (reset, interface swapped out) yields zero.
fn rate_kbs(previous: u64, current: u64, elapsed_seconds: f64) -> f64 {
    current.saturating_sub(previous) as f64 / BYTES_PER_KB / elapsed_seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::snapshot::{BatteryState, RawSensorReading};
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        cpu: Option<f64>,
        memory: Option<f64>,
        disk: Option<f64>,
        counters: VecDeque<(u64, u64)>,
        sensors: Vec<(&'static str, &'static str, f64)>,
        battery: Option<BatteryState>,
        address: Option<IpAddr>,
        boot: Option<u64>,
        boot_queries: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn healthy(counters: &[(u64, u64)]) -> Self {
            Self {
                cpu: Some(37.5),
                memory: Some(62.0),
                disk: Some(80.0),
                counters: counters.iter().copied().collect(),
                sensors: vec![("cpu0", "", 50.0)],
                battery: None,
                address: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))),
                boot: Some(t0().timestamp() as u64 - 3_600),
                boot_queries: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn broken() -> Self {
            Self {
                cpu: None,
                memory: None,
                disk: None,
                counters: VecDeque::new(),
                sensors: Vec::new(),
                battery: None,
                address: None,
                boot: None,
                boot_queries: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    fn failed(metric: &'static str) -> SourceError {
        SourceError::Query {
            metric,
            reason: "driver glitch".to_string(),
        }
    }

    impl MetricSource for FakeSource {
        fn cpu_percent(&mut self) -> Result<f64, SourceError> {
            self.cpu.ok_or_else(|| failed("cpu"))
        }

        fn memory_percent(&mut self) -> Result<f64, SourceError> {
            self.memory.ok_or_else(|| failed("memory"))
        }

        fn disk_percent(&mut self, path: &Path) -> Result<f64, SourceError> {
            assert_eq!(path, Path::new("/"));
            self.disk.ok_or_else(|| failed("disk"))
        }

        fn network_counters(&mut self) -> Result<(u64, u64), SourceError> {
            self.counters
                .pop_front()
                .ok_or(SourceError::Unavailable("network counters"))
        }

        fn sensor_temperatures(&mut self) -> Result<RawSensorReading, SourceError> {
            if self.sensors.is_empty() {
                return Err(SourceError::Unsupported("temperature sensors"));
            }
            let mut reading = RawSensorReading::default();
            for (group, label, value) in &self.sensors {
                reading.push(group, label, *value);
            }
            Ok(reading)
        }

        fn battery_state(&mut self) -> Result<Option<BatteryState>, SourceError> {
            Ok(self.battery)
        }

        fn boot_timestamp(&mut self) -> Result<u64, SourceError> {
            self.boot_queries.fetch_add(1, Ordering::SeqCst);
            self.boot.ok_or(SourceError::Unsupported("boot time"))
        }

        fn resolve_local_address(&mut self) -> Result<IpAddr, SourceError> {
            self.address
                .ok_or_else(|| SourceError::Resolve("no such host".to_string()))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn secs(seconds: f64) -> chrono::Duration {
        chrono::Duration::microseconds((seconds * 1_000_000.0) as i64)
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("rate should be available");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn end_to_end_tick() {
        let source = FakeSource::healthy(&[(1_000, 5_000), (1_000 + 10_240, 5_000 + 20_480)]);
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        let snapshot = engine.tick_at(t0() + secs(1.0));

        assert_eq!(snapshot.cpu_percent, Some(37.5));
        assert_eq!(snapshot.memory_percent, Some(62.0));
        assert_eq!(snapshot.disk_percent, Some(80.0));
        assert_close(snapshot.upload_rate_kbs, 10.0);
        assert_close(snapshot.download_rate_kbs, 20.0);
        assert_eq!(snapshot.temperature_celsius, Some(50.0));
        assert_eq!(snapshot.battery, None);
        assert!(snapshot.network.is_connected());
        assert_eq!(snapshot.uptime, Some(Duration::from_secs(3_601)));
        assert_eq!(snapshot.sampled_at, t0() + secs(1.0));
    }

    #[test]
    fn rate_uses_measured_interval_not_nominal() {
        let source = FakeSource::healthy(&[(0, 0), (10_240, 5_120)]);
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        let snapshot = engine.tick_at(t0() + secs(2.5));

        assert_close(snapshot.upload_rate_kbs, 4.0);
        assert_close(snapshot.download_rate_kbs, 2.0);
    }

    #[test]
    fn counter_reset_clamps_to_zero_and_rebaselines() {
        let source = FakeSource::healthy(&[
            (50_000, 80_000),
            (1_000, 2_000),
            (1_000 + 2_048, 2_000 + 4_096),
        ]);
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        let reset = engine.tick_at(t0() + secs(1.0));
        assert_close(reset.upload_rate_kbs, 0.0);
        assert_close(reset.download_rate_kbs, 0.0);

        let recovered = engine.tick_at(t0() + secs(2.0));
        assert_close(recovered.upload_rate_kbs, 2.0);
        assert_close(recovered.download_rate_kbs, 4.0);
    }

    #[test]
    fn zero_or_negative_interval_reuses_previous_rates() {
        let source = FakeSource::healthy(&[
            (0, 0),
            (1_024, 1_024),
            (2_048, 2_048),
            (2_048, 2_048),
            (4_096, 4_096),
        ]);
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        let first = engine.tick_at(t0() + secs(1.0));
        assert_close(first.upload_rate_kbs, 1.0);

        let same_instant = engine.tick_at(t0() + secs(1.0));
        assert_close(same_instant.upload_rate_kbs, 1.0);
        assert_close(same_instant.download_rate_kbs, 1.0);

        let clock_stepped_back = engine.tick_at(t0() - secs(5.0));
        assert_close(clock_stepped_back.upload_rate_kbs, 1.0);

        // Baseline is still the one taken at t0 + 1s.
        let next = engine.tick_at(t0() + secs(2.0));
        assert_close(next.upload_rate_kbs, 3.0);
        assert_close(next.download_rate_kbs, 3.0);
    }

    #[test]
    fn missing_initial_baseline_starts_from_first_tick() {
        let mut engine = SampleEngine::starting_at(FakeSource::healthy(&[]), "/", t0());
        assert!(engine.baseline.is_none());
        engine
            .source
            .counters
            .extend([(5_000, 5_000), (5_000 + 1_024, 5_000)]);

        let first = engine.tick_at(t0() + secs(1.0));
        assert_close(first.upload_rate_kbs, 0.0);
        assert_close(first.download_rate_kbs, 0.0);

        let second = engine.tick_at(t0() + secs(2.0));
        assert_close(second.upload_rate_kbs, 1.0);
        assert_close(second.download_rate_kbs, 0.0);
    }

    #[test]
    fn failing_queries_degrade_per_field() {
        let mut source = FakeSource::broken();
        source.cpu = Some(12.0);
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        let snapshot = engine.tick_at(t0() + secs(1.0));

        assert_eq!(snapshot.cpu_percent, Some(12.0));
        assert_eq!(snapshot.memory_percent, None);
        assert_eq!(snapshot.disk_percent, None);
        assert_eq!(snapshot.upload_rate_kbs, None);
        assert_eq!(snapshot.download_rate_kbs, None);
        assert_eq!(snapshot.temperature_celsius, None);
        assert_eq!(snapshot.uptime, None);
        assert_eq!(snapshot.battery, None);
        assert_eq!(snapshot.network, NetworkStatus::Disconnected);
    }

    #[test]
    fn battery_reading_passes_through() {
        let mut source = FakeSource::healthy(&[(0, 0), (0, 0)]);
        source.battery = Some(BatteryState {
            percent: 81.5,
            charging: false,
        });
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        let snapshot = engine.tick_at(t0() + secs(1.0));

        assert_eq!(
            snapshot.battery,
            Some(BatteryState {
                percent: 81.5,
                charging: false
            })
        );
    }

    #[test]
    fn boot_time_is_queried_once() {
        let source = FakeSource::healthy(&[(0, 0), (0, 0), (0, 0), (0, 0)]);
        let queries = Arc::clone(&source.boot_queries);
        let mut engine = SampleEngine::starting_at(source, "/", t0());

        for i in 1..=3 {
            let snapshot = engine.tick_at(t0() + secs(i as f64));
            assert_eq!(snapshot.uptime, Some(Duration::from_secs(3_600 + i)));
        }
        assert_eq!(queries.load(Ordering::SeqCst), 1);
    }
}
