use crate::data::snapshot::ColorScheme;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

const MIN_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub color_scheme: ColorScheme,
    /// Sampling cadence of the dashboard and `watch`.
    pub interval_ms: u64,
    /// Path whose filesystem usage is reported.
    pub disk_path: PathBuf,
    pub speedtest: SpeedTestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTestConfig {
    pub program: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            color_scheme: ColorScheme::Default,
            interval_ms: 1000,
            disk_path: PathBuf::from("/"),
            speedtest: SpeedTestConfig::default(),
        }
    }
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            program: "speedtest-cli".to_string(),
            timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Stored config, or defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| Self::parse(&content))
            .unwrap_or_default()
    }

    fn parse(content: &str) -> Option<Self> {
        match toml::from_str::<Self>(content) {
            Ok(config) => Some(config.normalized()),
            Err(err) => {
                log::warn!("ignoring malformed config: {}", err);
                None
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.interval_ms = self.interval_ms.max(MIN_INTERVAL_MS);
        self.speedtest.timeout_secs = self.speedtest.timeout_secs.max(1);
        self
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("config directory not available")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hostpulse").join("config.toml"))
    }
}
