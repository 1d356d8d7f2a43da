//! Source of "today" for the ledger.

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;

/// Supplies the calendar date the ledger counts against.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// UTC calendar date from the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    today: RwLock<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: RwLock::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.write() = today;
    }

    /// Move forward by `days` calendar days.
    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.write();
        *today = *today + chrono::Days::new(days);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.today.read()
    }
}
