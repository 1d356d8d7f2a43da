//! The persisted usage record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calls made on `date`. The count means nothing for any other day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub count: u32,
    pub date: NaiveDate,
}

impl UsageRecord {
    pub fn new(count: u32, date: NaiveDate) -> Self {
        Self { count, date }
    }

    /// Zero-count record for `today`.
    pub fn fresh(today: NaiveDate) -> Self {
        Self { count: 0, date: today }
    }

    /// Whether the record is at or past `limit`.
    pub fn is_over_limit(&self, limit: u32) -> bool {
        self.count >= limit
    }

    /// The record as seen on `today`: a stale date reads as zero.
    pub fn as_of(self, today: NaiveDate) -> Self {
        if self.date == today {
            self
        } else {
            Self::fresh(today)
        }
    }
}
