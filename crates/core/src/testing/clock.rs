//! Controllable clock for testing.

use std::sync::Mutex;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::pipeline::Clock;

/// Clock pinned to a settable instant; "today" is its UTC date.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon on `day`.
    pub fn on(day: NaiveDate) -> Self {
        Self::new(Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap_or_default()))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    /// Move forward by whole days.
    pub fn advance_days(&self, days: u64) {
        let mut now = self.lock();
        if let Some(next) = now.checked_add_days(Days::new(days)) {
            *now = next;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }

    fn today(&self) -> NaiveDate {
        self.lock().date_naive()
    }
}
