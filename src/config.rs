use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sensor::DEFAULT_SAMPLE_COUNT;

/// Kiosk wiring, read once at startup. A missing file means defaults;
/// a present-but-broken file is an error rather than a silent fallback,
/// since a typo'd serial port should not boot the kiosk against the
/// wrong device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KioskConfig {
    pub price_file: PathBuf,
    pub ledger_file: PathBuf,
    pub receipt_dir: PathBuf,

    pub sensor_port: String,
    pub sensor_baud: u32,
    pub sensor_settle_ms: u64,
    pub sensor_read_timeout_ms: u64,
    pub sample_count: usize,

    pub feed_frame: PathBuf,
    pub feed_interval_ms: u64,

    pub stub_label: String,
    pub stub_confidence: f32,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            price_file: PathBuf::from("price.csv"),
            ledger_file: PathBuf::from("billing_history.csv"),
            receipt_dir: PathBuf::from("saved_bills"),
            sensor_port: "/dev/ttyUSB0".to_string(),
            sensor_baud: 9600,
            sensor_settle_ms: 2000,
            sensor_read_timeout_ms: 5000,
            sample_count: DEFAULT_SAMPLE_COUNT,
            feed_frame: PathBuf::from("frame.png"),
            feed_interval_ms: 100,
            stub_label: "apple".to_string(),
            stub_confidence: 0.9,
        }
    }
}

impl KioskConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn sensor_settle(&self) -> Duration {
        Duration::from_millis(self.sensor_settle_ms)
    }

    pub fn sensor_read_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_read_timeout_ms)
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms)
    }
}
