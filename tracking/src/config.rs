use link::protocol::{ANGLE_COMMAND_MAX, ANGLE_COMMAND_MIN};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest end-of-travel wait accepted from config.
pub const MAX_RESET_TIMEOUT_SECS: f32 = 3600.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "angles must satisfy {lo} <= min < center < max <= {hi} (got min={min}, center={center}, max={max})",
        lo = ANGLE_COMMAND_MIN,
        hi = ANGLE_COMMAND_MAX
    )]
    AngleWindow { min: u8, center: u8, max: u8 },
    #[error("dead_zone_percent must be between 0 and 1 (got {0})")]
    DeadZone(f32),
    #[error("move_speed must be at least 1")]
    MoveSpeed,
    #[error("frame_width must be positive")]
    FrameWidth,
    #[error("reset_timeout_secs must be within 0..={max} (got {0})", max = MAX_RESET_TIMEOUT_SECS)]
    ResetTimeout(f32),
}

/// Tuning for the tracking loop. Defaults match the rig's camera and servo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Camera frame width in pixels
    pub frame_width: u32,
    /// Fraction of the frame width treated as "centered"
    pub dead_zone_percent: f32,
    /// Degrees moved per cycle while tracking or searching
    pub move_speed: u8,
    pub min_angle: u8,
    pub max_angle: u8,
    pub center_angle: u8,
    /// How long to wait at the end of travel before resetting the board
    pub reset_timeout_secs: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            frame_width: 640,
            dead_zone_percent: 0.275,
            move_speed: 3,
            min_angle: 10,
            max_angle: 170,
            center_angle: 90,
            reset_timeout_secs: 5.0,
        }
    }
}

impl TrackingConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::try_from_secs_f32(self.reset_timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Clamp a raw target into the servo's travel
    pub fn clamp_angle(&self, raw: i32) -> u8 {
        raw.clamp(self.min_angle as i32, self.max_angle as i32) as u8
    }

    /// Check that every angle the loop can produce is one the board follows,
    /// and that the timing values convert to a `Duration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(ANGLE_COMMAND_MIN <= self.min_angle
            && self.min_angle < self.center_angle
            && self.center_angle < self.max_angle
            && self.max_angle <= ANGLE_COMMAND_MAX)
        {
            return Err(ConfigError::AngleWindow {
                min: self.min_angle,
                center: self.center_angle,
                max: self.max_angle,
            });
        }
        if !(self.dead_zone_percent > 0.0 && self.dead_zone_percent < 1.0) {
            return Err(ConfigError::DeadZone(self.dead_zone_percent));
        }
        if self.move_speed == 0 {
            return Err(ConfigError::MoveSpeed);
        }
        if self.frame_width == 0 {
            return Err(ConfigError::FrameWidth);
        }
        if !(0.0..=MAX_RESET_TIMEOUT_SECS).contains(&self.reset_timeout_secs) {
            return Err(ConfigError::ResetTimeout(self.reset_timeout_secs));
        }
        Ok(())
    }
}
