use crate::states::{ControlState, Direction};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use vision::BoundingBox;

/// Mutable loop state, owned by the tracker and changed once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    pub control_state: ControlState,
    pub current_angle: u8,
    pub last_direction: Direction,
    /// Clock reading taken when WaitingTimeout was entered
    pub wait_started_at: Option<Duration>,
}

impl Session {
    pub fn new(center_angle: u8) -> Session {
        Session {
            control_state: ControlState::AwaitingStart,
            current_angle: center_angle,
            last_direction: Direction::None,
            wait_started_at: None,
        }
    }

    /// Move to `next`, logging the change. No-op when already there.
    pub fn transition(&mut self, next: ControlState, reason: &str) {
        if self.control_state == next {
            return;
        }
        log::info!("{} → {} ({})", self.control_state, next, reason);
        self.control_state = next;
        if next != ControlState::WaitingTimeout {
            self.wait_started_at = None;
        }
    }

    /// Back to a centered servo with no remembered direction
    pub fn recenter(&mut self, center_angle: u8) {
        self.current_angle = center_angle;
        self.last_direction = Direction::None;
    }
}

/// Per-cycle read-only copy of the session for display and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub state: ControlState,
    pub current_angle: u8,
    pub last_direction: Direction,
    pub frame_fps: f32,
    pub detection_box: Option<BoundingBox>,
    /// Seconds left before the end-of-travel reset, only while WaitingTimeout
    pub reset_in: Option<f32>,
}

/// Frames per second since the last Start handshake.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameRate {
    frames: u64,
    since: Duration,
}

impl FrameRate {
    pub fn reset(&mut self, now: Duration) {
        self.frames = 0;
        self.since = now;
    }

    pub fn tick(&mut self) {
        self.frames += 1;
    }

    pub fn fps(&self, now: Duration) -> f32 {
        let elapsed = now.saturating_sub(self.since).as_secs_f32();
        if elapsed > 0.0 {
            self.frames as f32 / elapsed
        } else {
            0.0
        }
    }
}
