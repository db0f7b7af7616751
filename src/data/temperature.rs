use crate::data::snapshot::RawSensorReading;
use crate::error::SourceError;
use log::debug;

const CPU_LABEL_HINTS: [&str; 2] = ["cpu", "core"];

/// Picks one representative temperature out of a sensor map of unknown
/// shape.
///
/// Order of preference:
/// 1. the first entry, across all groups, whose label contains `cpu` or
///    `core` (case-insensitive);
/// 2. the first entry of the first non-empty group;
/// 3. nothing.
///
/// The fallback can land on an unrelated device (a disk probe, say) on
/// machines with several sensor groups. That is accepted as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemperatureResolver;

impl TemperatureResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, reading: Result<RawSensorReading, SourceError>) -> Option<f64> {
        let reading = match reading {
            Ok(reading) => reading,
            Err(err) => {
                debug!("temperature sensors unavailable: {}", err);
                return None;
            }
        };

        let labelled = reading
            .groups
            .iter()
            .flat_map(|group| group.entries.iter())
            .find(|entry| {
                let label = entry.label.to_lowercase();
                CPU_LABEL_HINTS.iter().any(|hint| label.contains(hint))
            });
        if let Some(entry) = labelled {
            return Some(entry.current);
        }

        reading
            .groups
            .iter()
            .find_map(|group| group.entries.first())
            .map(|entry| entry.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(reading: RawSensorReading) -> Option<f64> {
        TemperatureResolver::new().resolve(Ok(reading))
    }

    #[test]
    fn core_label_wins() {
        let mut reading = RawSensorReading::default();
        reading.push("coretemp", "Core 0", 45.2);
        assert_eq!(resolve(reading), Some(45.2));
    }

    #[test]
    fn unlabelled_entry_is_used_as_fallback() {
        let mut reading = RawSensorReading::default();
        reading.push("acpi", "", 30.0);
        assert_eq!(resolve(reading), Some(30.0));
    }

    #[test]
    fn empty_map_is_unavailable() {
        assert_eq!(resolve(RawSensorReading::default()), None);
    }

    #[test]
    fn cpu_label_in_later_group_beats_first_group() {
        let mut reading = RawSensorReading::default();
        reading.push("nvme", "Composite", 38.0);
        reading.push("k10temp", "CPU Tctl", 61.5);
        assert_eq!(resolve(reading), Some(61.5));
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let mut reading = RawSensorReading::default();
        reading.push("acpitz", "temp1", 27.0);
        reading.push("coretemp", "PACKAGE CORE", 52.0);
        assert_eq!(resolve(reading), Some(52.0));
    }

    #[test]
    fn fallback_skips_empty_groups() {
        let mut reading = RawSensorReading::default();
        reading.groups.push(crate::data::snapshot::SensorGroup {
            name: "empty".to_string(),
            entries: Vec::new(),
        });
        reading.push("acpitz", "temp1", 33.0);
        reading.push("acpitz", "temp2", 35.0);
        assert_eq!(resolve(reading), Some(33.0));
    }

    #[test]
    fn provider_error_is_unavailable() {
        let resolver = TemperatureResolver::new();
        let reading = Err(SourceError::Unsupported("temperature sensors"));
        assert_eq!(resolver.resolve(reading), None);
    }
}
