use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorScheme {
    Default,
    Dark,
    Nord,
    Gruvbox,
}

/// One temperature entry as reported by a sensor group.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEntry {
    /// Empty when the device reports no label.
    pub label: String,
    /// Device-reported unit, normally Celsius.
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorGroup {
    pub name: String,
    pub entries: Vec<SensorEntry>,
}

/// Temperature sensors grouped by device, in provider iteration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSensorReading {
    pub groups: Vec<SensorGroup>,
}

impl RawSensorReading {
    /// Appends an entry to `group`, creating the group at the end on first use.
    pub fn push(&mut self, group: &str, label: &str, current: f64) {
        let entry = SensorEntry {
            label: label.to_string(),
            current,
        };
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(existing) => existing.entries.push(entry),
            None => self.groups.push(SensorGroup {
                name: group.to_string(),
                entries: vec![entry],
            }),
        }
    }
}

/// Cumulative network byte totals at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSnapshot {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryState {
    pub percent: f64,
    /// True when the machine is on external power.
    pub charging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum NetworkStatus {
    Connected { host_address: IpAddr },
    Disconnected,
}

impl NetworkStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, NetworkStatus::Connected { .. })
    }
}

/// Everything derived by one engine tick. `None` means the metric could not
/// be read on this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub disk_percent: Option<f64>,
    pub upload_rate_kbs: Option<f64>,
    pub download_rate_kbs: Option<f64>,
    pub uptime: Option<Duration>,
    pub network: NetworkStatus,
    pub battery: Option<BatteryState>,
    pub sampled_at: DateTime<Utc>,
}

impl Snapshot {
    /// Placeholder shown before the first tick arrives.
    pub fn empty(sampled_at: DateTime<Utc>) -> Self {
        Self {
            cpu_percent: None,
            memory_percent: None,
            temperature_celsius: None,
            disk_percent: None,
            upload_rate_kbs: None,
            download_rate_kbs: None,
            uptime: None,
            network: NetworkStatus::Disconnected,
            battery: None,
            sampled_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedMeasurement {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
}
