pub mod clock {
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    /// Time source for the control loop.
    ///
    /// `now` is monotonic and only meaningful relative to other readings of the
    /// same clock; `timestamp` is wall time for telemetry.
    pub trait Clock {
        fn now(&self) -> Duration;

        fn timestamp(&self) -> DateTime<Utc>;

        /// Time elapsed since an earlier reading of `now`
        fn since(&self, earlier: Duration) -> Duration {
            self.now().saturating_sub(earlier)
        }
    }

    pub struct SystemClock {
        origin: Instant,
    }

    impl SystemClock {
        pub fn new() -> SystemClock {
            SystemClock {
                origin: Instant::now(),
            }
        }
    }

    impl Default for SystemClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for SystemClock {
        fn now(&self) -> Duration {
            self.origin.elapsed()
        }

        fn timestamp(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Simulated clock. Clones share the same time, so a test can keep one handle
    /// and advance it while the tracker owns another.
    #[derive(Clone)]
    pub struct ManualClock {
        elapsed: Rc<Cell<Duration>>,
        epoch: DateTime<Utc>,
    }

    impl ManualClock {
        pub fn new() -> ManualClock {
            ManualClock {
                elapsed: Rc::new(Cell::new(Duration::ZERO)),
                epoch: DateTime::<Utc>::UNIX_EPOCH,
            }
        }

        pub fn advance(&self, by: Duration) {
            self.elapsed.set(self.elapsed.get() + by);
        }

        pub fn advance_secs(&self, secs: f64) {
            self.advance(Duration::from_secs_f64(secs));
        }

        pub fn set(&self, at: Duration) {
            self.elapsed.set(at);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.elapsed.get()
        }

        fn timestamp(&self) -> DateTime<Utc> {
            let offset = ChronoDuration::from_std(self.elapsed.get()).unwrap_or(ChronoDuration::zero());
            self.epoch + offset
        }
    }

}

pub use clock::{Clock, ManualClock, SystemClock};
