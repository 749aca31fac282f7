//! Per-cycle decisions of the tracking loop, free of any I/O.
//!
//! The tracker feeds these a detection frame, the clock reading and the board's
//! reply; everything here can be exercised without hardware.

use crate::config::TrackingConfig;
use crate::session::Session;
use crate::states::{ControlState, Direction};
use link::LinkStatus;
use std::time::Duration;
use vision::{Detection, DetectionFrame};

/// Horizontal band around the frame center where no movement is issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadZone {
    pub start: f32,
    pub end: f32,
}

impl DeadZone {
    pub fn new(frame_width: u32, percent: f32) -> DeadZone {
        let half_frame = frame_width as f32 / 2.0;
        let half_zone = frame_width as f32 * percent / 2.0;
        DeadZone {
            start: half_frame - half_zone,
            end: half_frame + half_zone,
        }
    }

    pub fn from_config(config: &TrackingConfig) -> DeadZone {
        DeadZone::new(config.frame_width, config.dead_zone_percent)
    }

    /// Which way the servo must turn to bring `center_x` into the band.
    /// Points on the band edges count as inside.
    pub fn classify(&self, center_x: f32) -> Direction {
        if center_x < self.start {
            Direction::Left
        } else if center_x > self.end {
            Direction::Right
        } else {
            Direction::None
        }
    }
}

/// What a cycle puts on the link after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send this (already clamped) angle and reconcile the reply
    SendAngle(u8),
    /// End-of-travel timeout expired; send Reset, session is already Stopped
    Reset,
}

/// Outcome of interpreting the board's reply to an angle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Board is running and took the angle
    Accepted(u8),
    /// Board was stopped by hand; host must follow it to Stopped
    ForcedStop,
    /// Board says Ready while the host believes it is running
    Inconsistent,
    Unknown(u8),
}

/// Tracked target: largest box wins, earliest entry on ties.
pub fn select_target(frame: &DetectionFrame) -> Option<&Detection> {
    frame.largest()
}

/// State change driven only by whether anybody is in view.
///
/// Passive states ignore detections. Any detection pulls an active state into
/// Tracking; losing every detection while Tracking starts a search.
pub fn next_state_from_detections(state: ControlState, has_detections: bool) -> ControlState {
    match state {
        ControlState::AwaitingStart | ControlState::Stopped => state,
        _ if has_detections => ControlState::Tracking,
        ControlState::Tracking => ControlState::Searching,
        other => other,
    }
}

/// Interpret the status byte returned for an angle command.
pub fn reconcile_with_status(sent_angle: u8, status: LinkStatus) -> Reconciliation {
    match status {
        LinkStatus::Running => Reconciliation::Accepted(sent_angle),
        LinkStatus::HomingOff => Reconciliation::ForcedStop,
        LinkStatus::Ready => Reconciliation::Inconsistent,
        LinkStatus::Unknown(byte) => Reconciliation::Unknown(byte),
    }
}

/// Apply a reconciliation to the session.
pub fn apply_reconciliation(session: &mut Session, reconciliation: Reconciliation, center_angle: u8) {
    match reconciliation {
        Reconciliation::Accepted(angle) => session.current_angle = angle,
        Reconciliation::ForcedStop => {
            log::warn!("Board reports manual stop (homing off), following it");
            session.transition(ControlState::Stopped, "board stopped manually");
            session.recenter(center_angle);
        }
        Reconciliation::Inconsistent => {
            log::warn!(
                "State mismatch: host={}, board=READY; keeping host state",
                session.control_state
            );
        }
        Reconciliation::Unknown(byte) => {
            log::warn!("Unknown board status byte: {}", byte);
        }
    }
}

/// Plan one active-state cycle: detection transition first, then the state's
/// own handler. Returns the link action to perform.
pub fn plan_cycle(
    session: &mut Session,
    frame: &DetectionFrame,
    now: Duration,
    config: &TrackingConfig,
    dead_zone: &DeadZone,
) -> Action {
    let next = next_state_from_detections(session.control_state, !frame.is_empty());
    let reason = if frame.is_empty() {
        "target lost"
    } else {
        "person detected"
    };
    session.transition(next, reason);

    let target = match session.control_state {
        ControlState::Idle => idle(config),
        ControlState::Tracking => tracking(session, frame, config, dead_zone),
        ControlState::Searching => searching(session, now, config),
        ControlState::WaitingTimeout => match waiting_timeout(session, now, config) {
            Some(target) => target,
            None => return Action::Reset,
        },
        // Passive states never reach planning; hold position if they do.
        ControlState::AwaitingStart | ControlState::Stopped => session.current_angle as i32,
    };

    Action::SendAngle(config.clamp_angle(target))
}

fn idle(config: &TrackingConfig) -> i32 {
    config.center_angle as i32
}

fn tracking(
    session: &mut Session,
    frame: &DetectionFrame,
    config: &TrackingConfig,
    dead_zone: &DeadZone,
) -> i32 {
    let current = session.current_angle as i32;
    let Some(target) = select_target(frame) else {
        return current;
    };
    let direction = dead_zone.classify(target.center_x);
    session.last_direction = direction;
    current + direction.step(config.move_speed)
}

fn searching(session: &mut Session, now: Duration, config: &TrackingConfig) -> i32 {
    let target = session.current_angle as i32 + session.last_direction.step(config.move_speed);
    if target <= config.min_angle as i32 || target >= config.max_angle as i32 {
        session.transition(ControlState::WaitingTimeout, "end of travel");
        session.wait_started_at = Some(now);
        log::info!(
            "Waiting {:.1}s at {}° before reset",
            config.reset_timeout_secs,
            session.current_angle
        );
    }
    target
}

/// Hold the angle until the timeout expires. `None` means reset now.
fn waiting_timeout(session: &mut Session, now: Duration, config: &TrackingConfig) -> Option<i32> {
    let started = *session.wait_started_at.get_or_insert(now);
    if now.saturating_sub(started) > config.reset_timeout() {
        log::warn!(
            "No person for {:.1}s at end of travel, resetting board",
            config.reset_timeout_secs
        );
        session.transition(ControlState::Stopped, "reset timeout");
        session.recenter(config.center_angle);
        return None;
    }
    Some(session.current_angle as i32)
}
