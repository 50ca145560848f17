use chrono::{DateTime, FixedOffset, Local, Utc};

/// Represents an entity responsible for providing dates across application. Also decides which
/// local offset an instant is displayed in, so tests can pin both.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Projects an instant into the user's local time.
    fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&Local).fixed_offset()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, FixedOffset, Utc};

    use super::Clock;

    /// Clock that only moves when told to. Clones share the same time.
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
        offset: FixedOffset,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>, offset: FixedOffset) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
                offset,
            }
        }

        pub fn utc(start: DateTime<Utc>) -> Self {
            Self::new(start, FixedOffset::east_opt(0).unwrap())
        }

        pub fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }

        pub fn set(&self, to: DateTime<Utc>) {
            *self.now.lock().unwrap() = to;
        }
    }

    impl Clock for ManualClock {
        fn time(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
            instant.with_timezone(&self.offset)
        }
    }
}
