use std::sync::{Arc, Mutex};

use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

// Every phase computation is a pure function of the value this returns,
// so swapping the implementation is all a test needs to steer time.
pub trait Clock: Send + Sync + 'static {
    fn now_utc(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn starting_at(at: OffsetDateTime) -> Self {
        Self { current: Arc::new(Mutex::new(at)) }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|err| err.into_inner());
        *current += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        let mut current = self.current.lock().unwrap_or_else(|err| err.into_inner());
        *current = to;
    }
}

impl Clock for ManualClock {
    fn now_utc(&self) -> OffsetDateTime {
        *self.current.lock().unwrap_or_else(|err| err.into_inner())
    }
}

pub fn format_utc(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}
