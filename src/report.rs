//! Plain-text and JSON output for the non-interactive modes.

use crate::data::snapshot::Snapshot;
use crate::speedtest::SpeedTestResult;
use crate::utils;
use chrono::Local;
use serde_json::json;

pub fn snapshot_line(snapshot: &Snapshot) -> String {
    let uptime = snapshot
        .uptime
        .map_or_else(|| utils::UNAVAILABLE.to_string(), utils::format_uptime);

    format!(
        "{}  up {}  cpu {}  ram {}  temp {}  disk {}  up {}  down {}  net {}  battery {}",
        snapshot
            .sampled_at
            .with_timezone(&Local)
            .format("%H:%M:%S"),
        uptime,
        utils::format_percent(snapshot.cpu_percent),
        utils::format_percent(snapshot.memory_percent),
        utils::format_celsius(snapshot.temperature_celsius),
        utils::format_percent(snapshot.disk_percent),
        utils::format_rate(snapshot.upload_rate_kbs),
        utils::format_rate(snapshot.download_rate_kbs),
        utils::format_network(&snapshot.network),
        utils::format_battery(snapshot.battery.as_ref()),
    )
}

pub fn snapshot_json(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

pub fn speed_test_json(result: &SpeedTestResult) -> serde_json::Value {
    match result {
        Ok(measurement) => json!({ "ok": true, "result": measurement }),
        Err(err) => json!({ "ok": false, "error": err.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::snapshot::{NetworkStatus, SpeedMeasurement};
    use crate::error::ProbeError;
    use chrono::{TimeZone, Utc};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn sample() -> Snapshot {
        Snapshot {
            cpu_percent: Some(37.5),
            memory_percent: Some(62.0),
            temperature_celsius: Some(50.0),
            disk_percent: Some(80.0),
            upload_rate_kbs: Some(10.0),
            download_rate_kbs: Some(20.0),
            uptime: Some(Duration::from_secs(3_601)),
            network: NetworkStatus::Connected {
                host_address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            },
            battery: None,
            sampled_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 1).unwrap(),
        }
    }

    #[test]
    fn line_contains_every_field() {
        let line = snapshot_line(&sample());
        for expected in [
            "up 1:00:01",
            "cpu 37.5%",
            "ram 62.0%",
            "temp 50.0°C",
            "disk 80.0%",
            "up 10.0 KB/s",
            "down 20.0 KB/s",
            "net Connected (192.168.1.20)",
            "battery N/A",
        ] {
            assert!(line.contains(expected), "{expected:?} missing from {line:?}");
        }
    }

    #[test]
    fn json_marks_missing_fields_as_null() {
        let value: serde_json::Value =
            serde_json::from_str(&snapshot_json(&sample()).unwrap()).unwrap();
        assert_eq!(value["cpu_percent"], 37.5);
        assert!(value["battery"].is_null());
        assert_eq!(value["network"]["state"], "connected");
        assert_eq!(value["network"]["host_address"], "192.168.1.20");
    }

    #[test]
    fn speed_test_json_separates_failure() {
        let ok = speed_test_json(&Ok(SpeedMeasurement {
            download_mbps: 90.0,
            upload_mbps: 10.0,
            ping_ms: 20.0,
        }));
        assert_eq!(ok["ok"], true);
        assert_eq!(ok["result"]["download_mbps"], 90.0);

        let failed = speed_test_json(&Err(ProbeError::NoServer));
        assert_eq!(failed["ok"], false);
        assert_eq!(failed["error"], "no speed test server available");
    }
}
