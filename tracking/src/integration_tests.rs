/// End-to-end cycles through the tracker with a scripted board and a simulated
/// clock: handshake, tracking, search, timeout reset and manual stop.

#[cfg(test)]
mod integration_tests {
    use crate::config::TrackingConfig;
    use crate::states::{ControlState, Direction};
    use crate::tracker::Tracker;
    use clock::{Clock, ManualClock};
    use embedded_hal::spi::ErrorKind;
    use link::protocol::{
        POLL_COMMAND, RESET_COMMAND, START_COMMAND, STATUS_HOMING_OFF, STATUS_READY,
        STATUS_RUNNING,
    };
    use link::{LinkError, Transport};
    use std::collections::VecDeque;
    use std::time::Duration;
    use vision::{BoundingBox, Detection, DetectionFrame, VisionError};

    /// Board stand-in: answers from a script, then with a fixed fallback byte.
    struct ScriptedBoard {
        replies: VecDeque<Result<u8, LinkError>>,
        fallback: u8,
        sent: Vec<u8>,
        settled: Vec<Duration>,
    }

    impl ScriptedBoard {
        fn new(fallback: u8) -> Self {
            ScriptedBoard {
                replies: VecDeque::new(),
                fallback,
                sent: Vec::new(),
                settled: Vec::new(),
            }
        }

        fn then(mut self, reply: u8) -> Self {
            self.replies.push_back(Ok(reply));
            self
        }

        fn then_fail(mut self) -> Self {
            self.replies
                .push_back(Err(LinkError::Transport(ErrorKind::Other)));
            self
        }
    }

    impl Transport for ScriptedBoard {
        fn transact(&mut self, byte: u8) -> Result<u8, LinkError> {
            self.sent.push(byte);
            self.replies.pop_front().unwrap_or(Ok(self.fallback))
        }

        fn settle(&mut self, duration: Duration) {
            self.settled.push(duration);
        }
    }

    fn tracker(board: ScriptedBoard) -> (Tracker<ScriptedBoard, ManualClock>, ManualClock) {
        tracker_with(TrackingConfig::default(), board)
    }

    fn tracker_with(
        config: TrackingConfig,
        board: ScriptedBoard,
    ) -> (Tracker<ScriptedBoard, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let tracker = Tracker::new(config, board, clock.clone());
        (tracker, clock)
    }

    /// Tracker already past the handshake, in `state` at `angle`.
    fn tracker_in(
        board: ScriptedBoard,
        state: ControlState,
        angle: u8,
        direction: Direction,
    ) -> (Tracker<ScriptedBoard, ManualClock>, ManualClock) {
        tracker_in_with(TrackingConfig::default(), board, state, angle, direction)
    }

    fn tracker_in_with(
        config: TrackingConfig,
        board: ScriptedBoard,
        state: ControlState,
        angle: u8,
        direction: Direction,
    ) -> (Tracker<ScriptedBoard, ManualClock>, ManualClock) {
        let (mut t, clock) = tracker_with(config, board);
        let session = t.session_mut();
        session.control_state = state;
        session.current_angle = angle;
        session.last_direction = direction;
        if state == ControlState::WaitingTimeout {
            session.wait_started_at = Some(clock.now());
        }
        (t, clock)
    }

    fn person_at(center_x: f32, area: f32) -> DetectionFrame {
        DetectionFrame::new(vec![Detection::new(
            center_x,
            BoundingBox::new(center_x as i32 - 20, 100, 40, 100),
            area,
        )])
    }

    fn nobody() -> Result<DetectionFrame, VisionError> {
        Ok(DetectionFrame::empty())
    }

    fn count(sent: &[u8], byte: u8) -> usize {
        sent.iter().filter(|b| **b == byte).count()
    }

    #[test]
    fn test_scenario_start_handshake() {
        let (mut t, _) = tracker(ScriptedBoard::new(STATUS_RUNNING).then(STATUS_READY));
        let snap = t.cycle(nobody());

        assert_eq!(t.transport().sent, vec![POLL_COMMAND, START_COMMAND]);
        assert_eq!(t.transport().settled, vec![Duration::from_millis(100)]);
        assert_eq!(snap.state, ControlState::Idle);
        assert_eq!(snap.current_angle, 90);
        assert_eq!(snap.last_direction, Direction::None);
    }

    #[test]
    fn test_awaiting_start_ignores_detections_until_ready() {
        let board = ScriptedBoard::new(STATUS_RUNNING)
            .then(STATUS_HOMING_OFF)
            .then_fail()
            .then(STATUS_READY);
        let (mut t, _) = tracker(board);

        t.cycle(Ok(person_at(600.0, 900.0)));
        assert_eq!(t.state(), ControlState::AwaitingStart);
        t.cycle(Ok(person_at(600.0, 900.0)));
        assert_eq!(t.state(), ControlState::AwaitingStart);
        t.cycle(Ok(person_at(600.0, 900.0)));
        assert_eq!(t.state(), ControlState::Idle);
        assert_eq!(t.session().current_angle, 90);
        assert_eq!(
            t.transport().sent,
            vec![POLL_COMMAND, POLL_COMMAND, POLL_COMMAND, START_COMMAND]
        );
    }

    #[test]
    fn test_failed_start_stays_awaiting() {
        let board = ScriptedBoard::new(STATUS_RUNNING)
            .then(STATUS_READY)
            .then_fail();
        let (mut t, _) = tracker(board);
        t.cycle(nobody());
        assert_eq!(t.state(), ControlState::AwaitingStart);
    }

    #[test]
    fn test_scenario_idle_to_tracking() {
        let (mut t, _) = tracker_in(
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::Idle,
            90,
            Direction::None,
        );
        let snap = t.cycle(Ok(person_at(500.0, 1000.0)));

        assert_eq!(t.transport().sent, vec![93]);
        assert_eq!(snap.state, ControlState::Tracking);
        assert_eq!(snap.current_angle, 93);
        assert_eq!(snap.last_direction, Direction::Right);
        assert!(snap.detection_box.is_some());
    }

    #[test]
    fn test_scenario_search_hits_end_of_travel() {
        let (mut t, clock) = tracker_in(
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::Tracking,
            169,
            Direction::Right,
        );
        clock.advance_secs(12.0);
        let snap = t.cycle(nobody());

        assert_eq!(t.transport().sent, vec![170]);
        assert_eq!(snap.state, ControlState::WaitingTimeout);
        assert_eq!(t.session().wait_started_at, Some(Duration::from_secs(12)));
        assert_eq!(snap.current_angle, 170);
        assert_eq!(snap.reset_in, Some(5.0));
    }

    #[test]
    fn test_scenario_timeout_resets_board() {
        let (mut t, clock) = tracker_in(
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::WaitingTimeout,
            170,
            Direction::Right,
        );
        // Hold position while the countdown runs
        for _ in 0..5 {
            clock.advance_secs(1.0);
            t.cycle(nobody());
            assert_eq!(t.state(), ControlState::WaitingTimeout);
        }
        clock.advance_secs(0.1);
        let snap = t.cycle(nobody());

        assert_eq!(snap.state, ControlState::Stopped);
        assert_eq!(snap.current_angle, 90);
        assert_eq!(snap.last_direction, Direction::None);
        assert_eq!(count(&t.transport().sent, RESET_COMMAND), 1);
        assert_eq!(t.transport().sent.last(), Some(&RESET_COMMAND));

        // Stopped only polls from here on, whatever the camera sees
        t.cycle(Ok(person_at(600.0, 100.0)));
        assert_eq!(t.transport().sent.last(), Some(&POLL_COMMAND));
        assert_eq!(count(&t.transport().sent, RESET_COMMAND), 1);
    }

    #[test]
    fn test_detection_before_timeout_returns_to_tracking() {
        let (mut t, clock) = tracker_in(
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::WaitingTimeout,
            170,
            Direction::Right,
        );
        clock.advance_secs(4.9);
        let snap = t.cycle(Ok(person_at(100.0, 500.0)));

        assert_eq!(snap.state, ControlState::Tracking);
        assert_eq!(snap.current_angle, 167);
        assert_eq!(t.session().wait_started_at, None);

        clock.advance_secs(10.0);
        t.cycle(Ok(person_at(320.0, 500.0)));
        assert_eq!(t.state(), ControlState::Tracking);
        assert_eq!(count(&t.transport().sent, RESET_COMMAND), 0);
    }

    #[test]
    fn test_full_search_sweep_ends_in_wait_then_stop() {
        let (mut t, clock) = tracker_in(
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::Tracking,
            90,
            Direction::None,
        );
        t.cycle(Ok(person_at(20.0, 800.0)));
        assert_eq!(t.session().last_direction, Direction::Left);

        let mut cycles = 0;
        while t.state() != ControlState::WaitingTimeout {
            clock.advance_secs(0.05);
            t.cycle(nobody());
            cycles += 1;
            assert!(cycles < 100, "search never reached end of travel");
        }
        assert_eq!(t.session().current_angle, 10);

        clock.advance_secs(5.5);
        t.cycle(nobody());
        assert_eq!(t.state(), ControlState::Stopped);
        assert!(t.transport().sent.iter().all(|b| (10..=170).contains(b) || *b == RESET_COMMAND));
    }

    #[test]
    fn test_homing_off_forces_stop_from_active_states() {
        for state in [
            ControlState::Tracking,
            ControlState::Searching,
            ControlState::WaitingTimeout,
        ] {
            let board = ScriptedBoard::new(STATUS_RUNNING).then(STATUS_HOMING_OFF);
            let (mut t, _) = tracker_in(board, state, 130, Direction::Right);
            let frame = if state == ControlState::Tracking {
                Ok(person_at(600.0, 100.0))
            } else {
                nobody()
            };
            let snap = t.cycle(frame);

            assert_eq!(snap.state, ControlState::Stopped, "from {:?}", state);
            assert_eq!(snap.current_angle, 90);
            assert_eq!(snap.last_direction, Direction::None);
        }
    }

    #[test]
    fn test_stopped_rearms_and_restarts() {
        let board = ScriptedBoard::new(STATUS_HOMING_OFF)
            .then(STATUS_HOMING_OFF)
            .then(STATUS_READY)
            .then(STATUS_READY)
            .then(STATUS_RUNNING);
        let (mut t, _) = tracker_in(board, ControlState::Stopped, 90, Direction::None);

        t.cycle(nobody());
        assert_eq!(t.state(), ControlState::Stopped);
        t.cycle(nobody());
        assert_eq!(t.state(), ControlState::AwaitingStart);
        t.cycle(nobody());
        assert_eq!(t.state(), ControlState::Idle);
        assert_eq!(
            t.transport().sent,
            vec![POLL_COMMAND, POLL_COMMAND, POLL_COMMAND, START_COMMAND]
        );
    }

    #[test]
    fn test_ready_while_tracking_is_ignored() {
        let board = ScriptedBoard::new(STATUS_RUNNING).then(STATUS_READY);
        let (mut t, _) = tracker_in(board, ControlState::Tracking, 100, Direction::None);
        let snap = t.cycle(Ok(person_at(600.0, 100.0)));

        assert_eq!(snap.state, ControlState::Tracking);
        assert_eq!(snap.current_angle, 100);
        assert_eq!(snap.last_direction, Direction::Right);
    }

    #[test]
    fn test_unknown_status_is_ignored() {
        let board = ScriptedBoard::new(STATUS_RUNNING).then(42);
        let (mut t, _) = tracker_in(board, ControlState::Tracking, 100, Direction::None);
        let snap = t.cycle(Ok(person_at(20.0, 100.0)));
        assert_eq!(snap.state, ControlState::Tracking);
        assert_eq!(snap.current_angle, 100);
    }

    #[test]
    fn test_transport_failure_keeps_session_and_retries() {
        let board = ScriptedBoard::new(STATUS_RUNNING).then_fail();
        let (mut t, _) = tracker_in(board, ControlState::Tracking, 100, Direction::None);

        t.cycle(Ok(person_at(600.0, 100.0)));
        assert_eq!(t.session().current_angle, 100);
        assert_eq!(t.state(), ControlState::Tracking);

        t.cycle(Ok(person_at(600.0, 100.0)));
        assert_eq!(t.session().current_angle, 103);
        assert_eq!(t.transport().sent, vec![103, 103]);
    }

    #[test]
    fn test_vision_error_skips_cycle() {
        let (mut t, _) = tracker_in(
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::Tracking,
            100,
            Direction::Left,
        );
        let before = *t.session();
        let err = VisionError::Io(std::io::Error::new(std::io::ErrorKind::Other, "camera gone"));
        t.cycle(Err(err));

        assert_eq!(*t.session(), before);
        assert!(t.transport().sent.is_empty());
    }

    #[test]
    fn test_snapshot_reports_frame_rate() {
        let (mut t, clock) = tracker(ScriptedBoard::new(STATUS_RUNNING).then(STATUS_READY));
        t.cycle(nobody());
        for _ in 0..20 {
            clock.advance(Duration::from_millis(100));
            t.cycle(nobody());
        }
        let snap = t.snapshot();
        assert!((snap.frame_fps - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_shutdown_sends_reset_even_after_failure() {
        let (t, _) = tracker(ScriptedBoard::new(STATUS_RUNNING).then_fail());
        let board = t.shutdown();
        assert_eq!(board.sent, vec![RESET_COMMAND]);

        let (t, _) = tracker(ScriptedBoard::new(STATUS_RUNNING));
        let board = t.shutdown();
        assert_eq!(board.sent, vec![RESET_COMMAND]);
    }

    #[test]
    fn test_angle_outside_board_window_is_not_sent() {
        let config = TrackingConfig {
            min_angle: 5,
            ..TrackingConfig::default()
        };
        let (mut t, _) = tracker_in_with(
            config,
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::Tracking,
            6,
            Direction::Left,
        );
        let snap = t.cycle(Ok(person_at(50.0, 1000.0)));

        assert!(t.transport().sent.is_empty());
        assert_eq!(snap.state, ControlState::Tracking);
        assert_eq!(snap.current_angle, 6);
    }

    #[test]
    fn test_infinite_reset_timeout_holds_without_panicking() {
        let config = TrackingConfig {
            reset_timeout_secs: f32::INFINITY,
            ..TrackingConfig::default()
        };
        let (mut t, clock) = tracker_in_with(
            config,
            ScriptedBoard::new(STATUS_RUNNING),
            ControlState::WaitingTimeout,
            10,
            Direction::Left,
        );
        clock.advance_secs(60.0);
        let snap = t.cycle(nobody());

        assert_eq!(t.transport().sent, vec![10]);
        assert_eq!(snap.state, ControlState::WaitingTimeout);
        assert!(snap.reset_in.is_some());
    }
}
