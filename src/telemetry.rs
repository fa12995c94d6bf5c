//! Decision side-channel
//!
//! The engine and the sweeper report what they decided to an observer after
//! the fact; observers never influence control flow.
use crate::auction::Bid;
use crate::service::bidding_engine::RejectReason;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait DecisionObserver: Send + Sync {
    fn bid_accepted(&self, _bid: &Bid) {}
    fn bid_rejected(&self, _reason: RejectReason) {}
    fn items_deactivated(&self, _count: usize) {}
}

pub type SharedDecisionObserver = Arc<dyn DecisionObserver + 'static>;

pub struct NoopObserver;

impl NoopObserver {
    pub fn new_shared() -> SharedDecisionObserver {
        Arc::new(NoopObserver)
    }
}

impl DecisionObserver for NoopObserver {}

/// Counter-based observer, the hook point for an exporter.
#[derive(Default)]
pub struct BidMetrics {
    accepted: AtomicU64,
    rejected: AtomicU64,
    deactivated: AtomicU64,
    rejections_by_reason: Mutex<BTreeMap<&'static str, u64>>,
}

impl BidMetrics {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn deactivated(&self) -> u64 {
        self.deactivated.load(Ordering::Relaxed)
    }

    pub fn rejections_by_reason(&self) -> BTreeMap<&'static str, u64> {
        self.rejections_by_reason.lock().clone()
    }
}

impl DecisionObserver for BidMetrics {
    fn bid_accepted(&self, _bid: &Bid) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn bid_rejected(&self, reason: RejectReason) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        *self
            .rejections_by_reason
            .lock()
            .entry(reason.as_label())
            .or_insert(0) += 1;
    }

    fn items_deactivated(&self, count: usize) {
        self.deactivated.fetch_add(count as u64, Ordering::Relaxed);
    }
}
