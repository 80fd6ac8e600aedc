//! ⏰ Clocks: the one place allowed to ask "what time is it?"
//!
//! Everything else gets `now` handed to it. SLA verdicts, cache expiry and the
//! "today" window all depend on the reference instant, so tests pin it with
//! [`ManualClock`] instead of sleeping through a five minute TTL. 🦆

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};

/// 🕰️ A source of "now", always in UTC.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// ⌚ The wall clock. Production uses this one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 🧪 A clock that only moves when told to. Great for tests, terrible for punctuality.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// ⏩ Jump forward. Time travel, but only in one direction, like real life.
    pub fn advance(&self, by: TimeDelta) {
        let mut current = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
