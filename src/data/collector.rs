use crate::data::snapshot::{BatteryState, RawSensorReading};
use crate::data::source::MetricSource;
use crate::error::SourceError;
use std::net::{IpAddr, ToSocketAddrs};
use std::path::Path;
use sysinfo::{ComponentExt, CpuExt, DiskExt, NetworkExt, NetworksExt, System, SystemExt};

/// MetricSource backed by `sysinfo`, with sysfs / `pmset` for the battery
/// and the system resolver for the local address.
pub struct SystemCollector {
    system: System,
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        // sysinfo computes CPU usage as a delta between refreshes, so prime it
        // once; the first tick then reports usage since construction.
        system.refresh_cpu();
        system.refresh_networks_list();

        Self { system }
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemCollector {
    fn cpu_percent(&mut self) -> Result<f64, SourceError> {
        self.system.refresh_cpu();
        if self.system.cpus().is_empty() {
            return Err(SourceError::Unavailable("cpu"));
        }
        Ok(self.system.global_cpu_info().cpu_usage() as f64)
    }

    fn memory_percent(&mut self) -> Result<f64, SourceError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(SourceError::Unavailable("memory"));
        }
        let used = total.saturating_sub(self.system.available_memory());
        Ok(used as f64 / total as f64 * 100.0)
    }

    fn disk_percent(&mut self, path: &Path) -> Result<f64, SourceError> {
        self.system.refresh_disks_list();

        // The filesystem holding `path` is the one with the longest matching mount point.
        let disk = self
            .system
            .disks()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| SourceError::Query {
                metric: "disk",
                reason: format!("no mounted filesystem contains {}", path.display()),
            })?;

        let total = disk.total_space();
        if total == 0 {
            return Err(SourceError::Unavailable("disk"));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }

    fn network_counters(&mut self) -> Result<(u64, u64), SourceError> {
        self.system.refresh_networks_list();
        self.system.refresh_networks();

        let networks = self.system.networks();
        if networks.iter().next().is_none() {
            return Err(SourceError::Unavailable("network counters"));
        }
        Ok(networks.iter().fold((0u64, 0u64), |(sent, received), (_, data)| {
            (
                sent + data.total_transmitted(),
                received + data.total_received(),
            )
        }))
    }

    fn sensor_temperatures(&mut self) -> Result<RawSensorReading, SourceError> {
        self.system.refresh_components_list();

        let components = self.system.components();
        if components.is_empty() {
            return Err(SourceError::Unsupported("temperature sensors"));
        }

        // sysinfo flattens hwmon devices into labels like "coretemp Core 0";
        // the first word is the device, the rest is the sensor label.
        let mut reading = RawSensorReading::default();
        for component in components {
            let (group, label) = split_component_label(component.label());
            reading.push(group, label, component.temperature() as f64);
        }
        Ok(reading)
    }

    fn battery_state(&mut self) -> Result<Option<BatteryState>, SourceError> {
        read_battery()
    }

    fn boot_timestamp(&mut self) -> Result<u64, SourceError> {
        match self.system.boot_time() {
            0 => Err(SourceError::Unavailable("boot time")),
            secs => Ok(secs),
        }
    }

    fn resolve_local_address(&mut self) -> Result<IpAddr, SourceError> {
        let host = hostname::get()?;
        let host = host.to_string_lossy();
        let addresses: Vec<IpAddr> = (&*host, 0u16)
            .to_socket_addrs()
            .map_err(|err| SourceError::Resolve(format!("{}: {}", host, err)))?
            .map(|addr| addr.ip())
            .collect();

        addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
            .ok_or_else(|| SourceError::Resolve(format!("{} has no addresses", host)))
    }
}

fn split_component_label(label: &str) -> (&str, &str) {
    match label.trim().split_once(' ') {
        Some((group, rest)) => (group, rest.trim()),
        None => (label.trim(), ""),
    }
}

#[cfg(target_os = "linux")]
fn read_battery() -> Result<Option<BatteryState>, SourceError> {
    use std::fs;

    let entries = match fs::read_dir("/sys/class/power_supply/") {
        Ok(entries) => entries,
        Err(_) => return Ok(None),
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_battery = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("BAT"))
            .unwrap_or(false);
        if !is_battery {
            continue;
        }

        let capacity = fs::read_to_string(path.join("capacity"))?;
        let percent = capacity
            .trim()
            .parse::<f64>()
            .map_err(|err| SourceError::Query {
                metric: "battery",
                reason: format!("bad capacity {:?}: {}", capacity.trim(), err),
            })?;
        let status = fs::read_to_string(path.join("status")).unwrap_or_default();

        return Ok(Some(BatteryState {
            percent,
            charging: status.trim() != "Discharging",
        }));
    }

    Ok(None)
}

#[cfg(target_os = "macos")]
fn read_battery() -> Result<Option<BatteryState>, SourceError> {
    use std::process::Command;

    let output = Command::new("pmset").arg("-g").arg("batt").output()?;
    Ok(parse_pmset(&String::from_utf8_lossy(&output.stdout)))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn read_battery() -> Result<Option<BatteryState>, SourceError> {
    Err(SourceError::Unsupported("battery"))
}

/// Parses `pmset -g batt` output:
///
/// ```text
/// Now drawing from 'AC Power'
///  -InternalBattery-0 (id=1234)	87%; charging; 0:41 remaining present: true
/// ```
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_pmset(output: &str) -> Option<BatteryState> {
    let line = output.lines().find(|l| l.contains("InternalBattery"))?;
    let percent_end = line.find('%')?;
    let percent_start = line[..percent_end]
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let percent = line[percent_start..percent_end].parse::<f64>().ok()?;
    let charging = output
        .lines()
        .next()
        .map(|first| first.contains("AC Power"))
        .unwrap_or(false);

    Some(BatteryState { percent, charging })
}
