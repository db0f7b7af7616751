use crate::data::snapshot::{BatteryState, RawSensorReading};
use crate::error::SourceError;
use std::net::IpAddr;
use std::path::Path;

/// Raw host telemetry the sample engine pulls from on every tick.
///
/// Percentages are already normalized to 0-100. Network counters are
/// cumulative totals since boot, summed over all interfaces.
pub trait MetricSource: Send {
    fn cpu_percent(&mut self) -> Result<f64, SourceError>;

    fn memory_percent(&mut self) -> Result<f64, SourceError>;

    /// Usage of the filesystem that contains `path`.
    fn disk_percent(&mut self, path: &Path) -> Result<f64, SourceError>;

    /// `(bytes_sent, bytes_received)`.
    fn network_counters(&mut self) -> Result<(u64, u64), SourceError>;

    fn sensor_temperatures(&mut self) -> Result<RawSensorReading, SourceError>;

    /// `Ok(None)` when the host has no battery.
    fn battery_state(&mut self) -> Result<Option<BatteryState>, SourceError>;

    /// Boot time as seconds since the Unix epoch.
    fn boot_timestamp(&mut self) -> Result<u64, SourceError>;

    fn resolve_local_address(&mut self) -> Result<IpAddr, SourceError>;
}
