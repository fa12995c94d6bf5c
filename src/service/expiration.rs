//! Expiration sweep
//!
//! Deactivates auctions whose deadline has passed. The sweeper is the only
//! writer that flips `active` off due to time; the bidding engine never
//! trusts the flag it last saw and re-checks expiry under its own token, so
//! the two may race on an item without coordination.
use crate::clock::{Clock, SharedClock};
use crate::service::LoopService;
use crate::store::{ItemStore, SharedItemStore};
use crate::telemetry::{DecisionObserver, NoopObserver, SharedDecisionObserver};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(1);

pub struct ExpirationSweeper {
    items: SharedItemStore,
    clock: SharedClock,
    observer: SharedDecisionObserver,
    period: Duration,
}

impl ExpirationSweeper {
    pub fn new(items: SharedItemStore, clock: SharedClock) -> Self {
        Self {
            items,
            clock,
            observer: NoopObserver::new_shared(),
            period: DEFAULT_SWEEP_PERIOD,
        }
    }

    pub fn with_observer(mut self, observer: SharedDecisionObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Deactivates every active item whose `end_time` is before `now` and
    /// returns how many were deactivated.
    ///
    /// Each item is an independent idempotent write: a sweep that dies
    /// halfway, or runs twice, converges to the same state.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut deactivated = 0;
        for mut item in self.items.list_active()? {
            if item.end_time < now {
                item.active = false;
                self.items.put(&item)?;
                deactivated += 1;
            }
        }
        if deactivated > 0 {
            info!(deactivated, "deactivated expired items");
        }
        self.observer.items_deactivated(deactivated);
        Ok(deactivated)
    }
}

impl LoopService for ExpirationSweeper {
    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(self.period);
        self.sweep(self.clock.now())?;
        Ok(())
    }
}
