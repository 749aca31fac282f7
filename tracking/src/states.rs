// This module contains all state-related enums and types for the tracking system.
// To add or modify states, edit this file only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// - AwaitingStart: waiting for the board to report Ready, then sending Start
/// - Idle: fan running, servo pinned to center, nobody in view
/// - Tracking: following the largest person in frame
/// - Searching: target lost, keep panning the way it was last moving
/// - WaitingTimeout: reached the end of travel while searching, counting down to reset
/// - Stopped: board reset or manually stopped, polling until it is Ready again
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    AwaitingStart,
    Idle,
    Tracking,
    Searching,
    WaitingTimeout,
    Stopped,
}

impl ControlState {
    /// States that send angle commands every cycle
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ControlState::Idle
                | ControlState::Tracking
                | ControlState::Searching
                | ControlState::WaitingTimeout
        )
    }

    /// States that only poll the board and ignore detections
    pub fn is_passive(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlState::AwaitingStart => "AWAITING_START",
            ControlState::Idle => "IDLE",
            ControlState::Tracking => "TRACKING",
            ControlState::Searching => "SEARCHING",
            ControlState::WaitingTimeout => "WAITING_TIMEOUT",
            ControlState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Which way the target was last seen moving.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    #[default]
    None,
}

impl Direction {
    /// Signed step for this direction: Left pans down, Right pans up.
    pub fn step(&self, move_speed: u8) -> i32 {
        match self {
            Direction::Left => -(move_speed as i32),
            Direction::Right => move_speed as i32,
            Direction::None => 0,
        }
    }
}
