use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracking::{ControlState, TrackingConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub tracking: TrackingConfig,
    pub vision: VisionConfig,
    pub timing: TimingConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// spidev node wired to the motor board
    pub device: String,
    pub speed_hz: u32,
    /// SPI mode 0..=3
    pub mode: u8,
    /// Pause between the Ready poll and the Start command
    pub start_settle_ms: u64,
    /// Pause after the final reset before the bus is closed
    pub shutdown_settle_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: "/dev/spidev0.0".to_string(),
            speed_hz: 1_000_000,
            mode: 0,
            start_settle_ms: 100,
            shutdown_settle_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Detection stream: a file path, or "-" for stdin
    pub source: String,
    pub confidence_threshold: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            source: "-".to_string(),
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub awaiting_start_poll_ms: u64,
    pub stopped_poll_ms: u64,
    /// Extra pause per active cycle; 0 lets the camera set the pace
    pub active_cycle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            awaiting_start_poll_ms: 300,
            stopped_poll_ms: 500,
            active_cycle_ms: 0,
        }
    }
}

impl TimingConfig {
    /// Sleep between cycles for the state the loop is in
    pub fn pause_for(&self, state: ControlState) -> Duration {
        let ms = match state {
            ControlState::AwaitingStart => self.awaiting_start_poll_ms,
            ControlState::Stopped => self.stopped_poll_ms,
            _ => self.active_cycle_ms,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// "log", "stdout", or a file path for JSON lines
    pub sink: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sink: "log".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        // Try external file first
        let config: Config = if path.exists() {
            let config_content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config = toml::from_str(&config_content)
                .with_context(|| format!("parsing {}", path.display()))?;
            log::info!("Loaded configuration from {}", path.display());
            config
        } else {
            // Fallback to embedded defaults
            let config_content = include_str!("../config.toml.example");
            let config = toml::from_str(config_content)?;
            log::warn!(
                "{} not found, using embedded default configuration",
                path.display()
            );
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.tracking
            .validate()
            .context("invalid [tracking] section")?;
        if self.link.mode > 3 {
            bail!("invalid [link] section: mode must be 0..=3 (got {})", self.link.mode);
        }
        if self.link.speed_hz == 0 {
            bail!("invalid [link] section: speed_hz must be positive");
        }
        if !(0.0..=1.0).contains(&self.vision.confidence_threshold) {
            bail!(
                "invalid [vision] section: confidence_threshold must be within 0..=1 (got {})",
                self.vision.confidence_threshold
            );
        }
        Ok(())
    }
}

// Helper functions for easy access
impl Config {
    pub fn start_settle(&self) -> Duration {
        Duration::from_millis(self.link.start_settle_ms)
    }

    pub fn shutdown_settle(&self) -> Duration {
        Duration::from_millis(self.link.shutdown_settle_ms)
    }
}
