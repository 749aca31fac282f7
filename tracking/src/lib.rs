pub mod config;
pub mod machine;
pub mod session;
pub mod states;

#[cfg(test)]
mod integration_tests;

pub mod tracker {
    use crate::config::TrackingConfig;
    use crate::machine::{self, Action, DeadZone};
    use crate::session::{FrameRate, Session, Snapshot};
    use crate::states::ControlState;
    use clock::Clock;
    use link::{Command, LinkStatus, Transport};
    use std::time::Duration;
    use vision::{BoundingBox, DetectionFrame, VisionError};

    /// Default pause between the Ready poll and the Start command
    pub const START_SETTLE: Duration = Duration::from_millis(100);

    /// Drives one control cycle at a time: detections in, link transactions out.
    ///
    /// Owns the session exclusively; consumers only ever see `Snapshot` copies.
    pub struct Tracker<T, C> {
        session: Session,
        config: TrackingConfig,
        dead_zone: DeadZone,
        link: T,
        clock: C,
        start_settle: Duration,
        frame_rate: FrameRate,
        last_box: Option<BoundingBox>,
    }

    impl<T, C> Tracker<T, C>
    where
        T: Transport,
        C: Clock,
    {
        pub fn new(config: TrackingConfig, link: T, clock: C) -> Tracker<T, C> {
            let mut frame_rate = FrameRate::default();
            frame_rate.reset(clock.now());
            Tracker {
                session: Session::new(config.center_angle),
                dead_zone: DeadZone::from_config(&config),
                config,
                link,
                clock,
                start_settle: START_SETTLE,
                frame_rate,
                last_box: None,
            }
        }

        pub fn with_start_settle(mut self, settle: Duration) -> Self {
            self.start_settle = settle;
            self
        }

        pub fn session(&self) -> &Session {
            &self.session
        }

        pub fn state(&self) -> ControlState {
            self.session.control_state
        }

        pub fn transport(&self) -> &T {
            &self.link
        }

        #[cfg(test)]
        pub(crate) fn session_mut(&mut self) -> &mut Session {
            &mut self.session
        }

        /// Run one cycle with this frame's detections (or the vision error that
        /// replaced them) and return the resulting snapshot.
        pub fn cycle(&mut self, frame: Result<DetectionFrame, VisionError>) -> Snapshot {
            match self.session.control_state {
                ControlState::AwaitingStart => self.await_start(),
                ControlState::Stopped => self.poll_stopped(),
                ControlState::Idle
                | ControlState::Tracking
                | ControlState::Searching
                | ControlState::WaitingTimeout => match frame {
                    Ok(frame) => self.run_active(&frame),
                    Err(e) => log::warn!("Skipping cycle, no detections: {}", e),
                },
            }
            self.snapshot()
        }

        /// Poll until the board reports Ready, then start the fan.
        fn await_start(&mut self) {
            match self.link.send(Command::Poll) {
                Ok(LinkStatus::Ready) => {
                    log::info!("Board ready (servo centered), sending start");
                    self.link.settle(self.start_settle);
                    match self.link.send(Command::Start) {
                        Ok(reply) => {
                            log::info!("Start command sent, board replied {:?}", reply);
                            self.session.transition(ControlState::Idle, "board started");
                            self.session.recenter(self.config.center_angle);
                            self.frame_rate.reset(self.clock.now());
                            self.last_box = None;
                        }
                        Err(e) => log::warn!("Start command failed, will poll again: {}", e),
                    }
                }
                Ok(status) => log::debug!("Waiting for board, status {:?}", status),
                Err(e) => log::warn!("Poll failed: {}", e),
            }
        }

        /// Stopped: wait for the user to re-arm the board.
        fn poll_stopped(&mut self) {
            match self.link.send(Command::Poll) {
                Ok(LinkStatus::Ready) => {
                    self.session
                        .transition(ControlState::AwaitingStart, "board re-armed by user");
                }
                Ok(status) => log::debug!("Board stopped, status {:?}", status),
                Err(e) => log::warn!("Poll failed: {}", e),
            }
        }

        fn run_active(&mut self, frame: &DetectionFrame) {
            self.frame_rate.tick();
            self.last_box = machine::select_target(frame).map(|d| d.bounding_box);

            let now = self.clock.now();
            let action = machine::plan_cycle(
                &mut self.session,
                frame,
                now,
                &self.config,
                &self.dead_zone,
            );

            match action {
                Action::SendAngle(angle) => {
                    let Some(command) = Command::angle(angle) else {
                        log::warn!("Angle {} outside the board's command window, not sent", angle);
                        return;
                    };
                    match self.link.send(command) {
                        Ok(status) => {
                            let reconciliation = machine::reconcile_with_status(angle, status);
                            machine::apply_reconciliation(
                                &mut self.session,
                                reconciliation,
                                self.config.center_angle,
                            );
                        }
                        Err(e) => log::warn!("Angle {} not delivered: {}", angle, e),
                    }
                }
                Action::Reset => match self.link.send(Command::Reset) {
                    Ok(reply) => log::info!("Reset sent, board replied {:?}", reply),
                    Err(e) => log::error!("Reset command failed: {}", e),
                },
            }
        }

        pub fn snapshot(&self) -> Snapshot {
            let now = self.clock.now();
            let reset_in = match (self.session.control_state, self.session.wait_started_at) {
                (ControlState::WaitingTimeout, Some(started)) => Some(
                    self.config
                        .reset_timeout()
                        .saturating_sub(now.saturating_sub(started))
                        .as_secs_f32(),
                ),
                _ => None,
            };
            Snapshot {
                timestamp: self.clock.timestamp(),
                state: self.session.control_state,
                current_angle: self.session.current_angle,
                last_direction: self.session.last_direction,
                frame_fps: self.frame_rate.fps(now),
                detection_box: self.last_box.filter(|_| self.session.control_state.is_active()),
                reset_in,
            }
        }

        /// Best-effort Reset before the link is released. Failures are logged,
        /// never propagated, so shutdown always completes.
        pub fn shutdown(mut self) -> T {
            log::info!("Shutting down, sending final reset");
            match self.link.send(Command::Reset) {
                Ok(reply) => log::info!("Final reset sent, board replied {:?}", reply),
                Err(e) => log::error!("Final reset failed: {}", e),
            }
            self.link
        }
    }
}

pub use config::{ConfigError, TrackingConfig};
pub use machine::{DeadZone, Reconciliation};
pub use session::{Session, Snapshot};
pub use states::{ControlState, Direction};
pub use tracker::Tracker;
