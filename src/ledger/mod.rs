//! Usage ledger: the process-wide daily call budget.
//!
//! A single counter per UTC day, shared by every session. All reads and
//! writes go through one mutex so that admission (check + increment)
//! and rollback (decrement) are each one critical section. Every call does
//! blocking file I/O; async callers run them on the blocking pool.

mod clock;
mod record;
mod store;

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::UsageRecord;
pub use store::LedgerStore;

/// Charge taken for one provider call.
///
/// Hand it back to [`UsageLedger::release`] when the call fails. The date
/// keys the charge: a reservation from a previous day is never subtracted
/// from the current day's count. A charge that never reached storage is never
/// subtracted either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a failed call must release its reservation"]
pub struct Reservation {
    date: NaiveDate,
    count_after: u32,
    persisted: bool,
}

impl Reservation {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Ledger count right after this charge was taken.
    pub fn count_after(&self) -> u32 {
        self.count_after
    }

    /// Whether the charge was written to storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }
}

/// Result of asking the ledger for room to make one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Charged; the call may proceed.
    Admitted(Reservation),
    /// Budget spent for today; nothing was charged.
    LimitReached(UsageRecord),
}

/// Single-writer guard over the persisted usage record.
pub struct UsageLedger {
    store: Mutex<LedgerStore>,
    daily_limit: u32,
    clock: Arc<dyn Clock>,
}

impl UsageLedger {
    pub fn new(store: LedgerStore, daily_limit: u32, clock: Arc<dyn Clock>) -> Self {
        info!(
            path = %store.path().display(),
            daily_limit,
            "Usage ledger opened"
        );
        Self {
            store: Mutex::new(store),
            daily_limit,
            clock,
        }
    }

    /// Ledger backed by `path`, counting against the system clock.
    pub fn open(path: impl AsRef<Path>, daily_limit: u32) -> Self {
        Self::new(
            LedgerStore::new(path.as_ref()),
            daily_limit,
            Arc::new(SystemClock),
        )
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Today's record. Read-only.
    pub fn read(&self) -> UsageRecord {
        let today = self.clock.today();
        self.store.lock().read(today)
    }

    pub fn is_over_limit(&self, record: &UsageRecord) -> bool {
        record.is_over_limit(self.daily_limit)
    }

    /// Charge one call if today's budget allows it.
    ///
    /// The charge is written before the caller reaches the provider, so a
    /// crash mid-call leaves the budget spent rather than refunded.
    pub fn check_and_increment(&self) -> Admission {
        let today = self.clock.today();
        let store = self.store.lock();
        let record = store.read(today);

        if self.is_over_limit(&record) {
            debug!(count = record.count, limit = self.daily_limit, "Daily limit reached");
            return Admission::LimitReached(record);
        }

        let count_after = record.count + 1;
        let persisted = match store.write(count_after, today) {
            Ok(()) => {
                debug!(count = count_after, limit = self.daily_limit, "Usage charged");
                true
            }
            Err(e) => {
                warn!(error = %e.format_for_log(), "Failed to persist usage charge");
                false
            }
        };

        Admission::Admitted(Reservation {
            date: today,
            count_after,
            persisted,
        })
    }

    /// Refund a charge whose call failed.
    ///
    /// Decrements whatever the count is now, inside the same lock that
    /// admission takes, so concurrent turns cannot lose each other's updates.
    pub fn release(&self, reservation: Reservation) {
        if !reservation.persisted {
            debug!("Charge was never persisted, nothing to refund");
            return;
        }

        let today = self.clock.today();
        if reservation.date != today {
            debug!(
                reserved = %reservation.date,
                today = %today,
                "Reservation predates rollover, nothing to refund"
            );
            return;
        }

        let store = self.store.lock();
        let record = store.read(today);
        let count = record.count.saturating_sub(1);
        if let Err(e) = store.write(count, today) {
            warn!(error = %e.format_for_log(), "Failed to roll back usage charge");
            return;
        }
        debug!(count, "Usage charge rolled back");
    }
}
