use crate::data::snapshot::{BatteryState, NetworkStatus};
use crate::speedtest::SpeedTestResult;
use std::time::Duration;

pub const UNAVAILABLE: &str = "N/A";

/// Uptime as `H:MM:SS`, prefixed with `N day(s), ` past the first day.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);

    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{:.1}%", v))
}

pub fn format_celsius(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{:.1}°C", v))
}

pub fn format_rate(kbs: Option<f64>) -> String {
    kbs.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{:.1} KB/s", v))
}

pub fn format_network(status: &NetworkStatus) -> String {
    match status {
        NetworkStatus::Connected { host_address } => format!("Connected ({})", host_address),
        NetworkStatus::Disconnected => "Disconnected".to_string(),
    }
}

pub fn format_battery(battery: Option<&BatteryState>) -> String {
    match battery {
        Some(state) => format!(
            "{:.1}% ({})",
            state.percent,
            if state.charging { "Plugged In" } else { "On Battery" }
        ),
        None => UNAVAILABLE.to_string(),
    }
}

pub fn format_speed_test(result: &SpeedTestResult) -> String {
    match result {
        Ok(m) => format!(
            "Down {:.1} Mbps  Up {:.1} Mbps  Ping {:.0} ms",
            m.download_mbps, m.upload_mbps, m.ping_ms
        ),
        Err(err) => format!("Speedtest: Error ({})", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::snapshot::SpeedMeasurement;
    use crate::error::ProbeError;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn uptime_formats_like_a_clock() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0:00:59");
        assert_eq!(format_uptime(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(format_uptime(Duration::from_secs(86_400 + 61)), "1 day, 0:01:01");
        assert_eq!(
            format_uptime(Duration::from_secs(3 * 86_400 + 7_200)),
            "3 days, 2:00:00"
        );
    }

    #[test]
    fn unavailable_fields_render_na() {
        assert_eq!(format_percent(None), "N/A");
        assert_eq!(format_celsius(None), "N/A");
        assert_eq!(format_rate(None), "N/A");
        assert_eq!(format_battery(None), "N/A");
    }

    #[test]
    fn values_render_with_one_decimal() {
        assert_eq!(format_percent(Some(37.54)), "37.5%");
        assert_eq!(format_celsius(Some(50.0)), "50.0°C");
        assert_eq!(format_rate(Some(10.0)), "10.0 KB/s");
    }

    #[test]
    fn network_and_battery_text() {
        let connected = NetworkStatus::Connected {
            host_address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
        };
        assert_eq!(format_network(&connected), "Connected (10.0.0.7)");
        assert_eq!(format_network(&NetworkStatus::Disconnected), "Disconnected");

        let battery = BatteryState {
            percent: 64.0,
            charging: true,
        };
        assert_eq!(format_battery(Some(&battery)), "64.0% (Plugged In)");
    }

    #[test]
    fn speed_test_text() {
        let ok: SpeedTestResult = Ok(SpeedMeasurement {
            download_mbps: 94.54,
            upload_mbps: 12.26,
            ping_ms: 17.6,
        });
        assert_eq!(
            format_speed_test(&ok),
            "Down 94.5 Mbps  Up 12.3 Mbps  Ping 18 ms"
        );
        let failed: SpeedTestResult = Err(ProbeError::NoServer);
        assert!(format_speed_test(&failed).starts_with("Speedtest: Error"));
    }
}
