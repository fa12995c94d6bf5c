//! Bidding Engine
//!
//! The logic that decides whether a submitted bid may be recorded.
//!
//! Validation reads the current highest bid and then writes the new one, so
//! the whole read-validate-write sequence runs under a per-item
//! serialization token. Without it two callers could read the same stale
//! highest bid, both pass validation, and both write, breaking the
//! strictly-increasing bid chain.
use crate::auction::{self, Amount, Bid, Item, ItemId, ItemIdRef};
use crate::clock::{Clock, SharedClock};
use crate::store::{BidStore, ItemStore, SharedBidStore, SharedItemStore};
use crate::telemetry::{DecisionObserver, NoopObserver, SharedDecisionObserver};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// A local part, an `@`, a domain. Purely syntactic.
const EMAIL_PATTERN: &str = "^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$";

pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Why a bid was not recorded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("item does not exist")]
    ItemNotFound,
    #[error("item is not active")]
    ItemNotActive,
    #[error("bidding for this item has ended")]
    ItemExpired,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("bid must be higher than the current highest bid")]
    BidTooLow,
    #[error("bid must be higher than your previous bid")]
    BidNotAboveOwn,
}

impl RejectReason {
    /// Stable label for counters and logs.
    pub fn as_label(self) -> &'static str {
        match self {
            RejectReason::ItemNotFound => "item_not_found",
            RejectReason::ItemNotActive => "item_not_active",
            RejectReason::ItemExpired => "item_expired",
            RejectReason::InvalidEmail => "invalid_email",
            RejectReason::BidTooLow => "bid_too_low",
            RejectReason::BidNotAboveOwn => "bid_not_above_own",
        }
    }

    /// An auction business rule, as opposed to malformed input.
    pub fn is_rule(self) -> bool {
        matches!(
            self,
            RejectReason::ItemNotActive | RejectReason::ItemExpired | RejectReason::BidTooLow
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(RejectReason),
}

/// A bid as submitted, before acceptance assigns it an id and a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct BidRequest {
    pub item_id: ItemId,
    pub bidder_name: String,
    pub amount: Amount,
    pub email: String,
}

#[derive(Error, Debug)]
pub enum PlaceBidError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),
    /// An auction business rule rejected the bid.
    #[error("bid rejected: {0}")]
    Rejected(RejectReason),
    /// The request itself was malformed.
    #[error("invalid bid: {0}")]
    Invalid(RejectReason),
    /// Could not serialize against other bids on the item within the
    /// bounded wait. Safe to retry.
    #[error("item {0} is contended, try again")]
    Contention(ItemId),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PlaceBidError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlaceBidError::Contention(_))
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            PlaceBidError::ItemNotFound(_) => Some(RejectReason::ItemNotFound),
            PlaceBidError::Rejected(reason) | PlaceBidError::Invalid(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Pure accept/reject decision for a candidate bid.
pub struct BidValidator {
    email_pattern: Regex,
}

impl Default for BidValidator {
    fn default() -> Self {
        Self {
            email_pattern: Regex::new(EMAIL_PATTERN).expect("valid pattern"),
        }
    }
}

impl BidValidator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replaces the syntactic email policy.
    pub fn with_email_pattern(pattern: Regex) -> Self {
        Self {
            email_pattern: pattern,
        }
    }

    /// The first failing check decides the surfaced reason, so the order
    /// here is part of the contract.
    ///
    /// `own_prior_highest` can never exceed `highest_so_far` when the inputs
    /// come from a correctly serialized history, which makes the last check
    /// redundant there; it is kept because it is a distinct, externally
    /// observable rejection kind.
    pub fn evaluate(
        &self,
        item: Option<&Item>,
        highest_so_far: Amount,
        own_prior_highest: Option<Amount>,
        request: &BidRequest,
        now: DateTime<Utc>,
    ) -> Decision {
        use RejectReason::*;

        let item = match item {
            Some(item) => item,
            None => return Decision::Reject(ItemNotFound),
        };
        if !item.active {
            return Decision::Reject(ItemNotActive);
        }
        if item.end_time <= now {
            return Decision::Reject(ItemExpired);
        }
        if !self.email_pattern.is_match(&request.email) {
            return Decision::Reject(InvalidEmail);
        }
        if request.amount <= highest_so_far {
            return Decision::Reject(BidTooLow);
        }
        if let Some(own) = own_prior_highest {
            if request.amount <= own {
                return Decision::Reject(BidNotAboveOwn);
            }
        }
        Decision::Accept
    }
}

/// Per-item serialization tokens. Bids on distinct items never contend on
/// the same token.
// TODO: tokens are never evicted; a long-running process accumulates one
// per item ever bid on.
#[derive(Default)]
struct ItemLocks(Mutex<BTreeMap<ItemId, Arc<Mutex<()>>>>);

impl ItemLocks {
    fn for_item(&self, item_id: ItemIdRef) -> Arc<Mutex<()>> {
        let mut map = self.0.lock();
        if let Some(lock) = map.get(item_id) {
            return lock.clone();
        }
        let lock = Arc::new(Mutex::new(()));
        map.insert(item_id.to_owned(), lock.clone());
        lock
    }
}

pub struct BiddingEngine {
    items: SharedItemStore,
    bids: SharedBidStore,
    clock: SharedClock,
    validator: BidValidator,
    observer: SharedDecisionObserver,
    locks: ItemLocks,
    lock_wait: Duration,
}

impl BiddingEngine {
    pub fn new(items: SharedItemStore, bids: SharedBidStore, clock: SharedClock) -> Self {
        Self {
            items,
            bids,
            clock,
            validator: BidValidator::new(),
            observer: NoopObserver::new_shared(),
            locks: ItemLocks::default(),
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    pub fn with_validator(mut self, validator: BidValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_observer(mut self, observer: SharedDecisionObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Bounds how long a placement waits for its item's token before
    /// failing with [`PlaceBidError::Contention`].
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn place_bid(&self, request: BidRequest) -> Result<Bid, PlaceBidError> {
        let token = self.locks.for_item(&request.item_id);
        let _guard = match token.try_lock_for(self.lock_wait) {
            Some(guard) => guard,
            None => {
                debug!(item = %request.item_id, "timed out waiting for the item token");
                return Err(PlaceBidError::Contention(request.item_id));
            }
        };

        // From here until the guard drops nothing else reads or writes this
        // item's bid history through the engine. The item is re-read under
        // the token: `active` may have flipped since the caller last saw it.
        let item = self.items.get(&request.item_id)?;
        let (highest, own_prior) = match &item {
            Some(item) => {
                let bids = self.bids.find_by_item(&item.id)?;
                let own = self.bids.find_by_item_and_email(&item.id, &request.email)?;
                (
                    auction::highest_amount(item, &bids),
                    own.iter().map(|bid| bid.amount).max(),
                )
            }
            None => (Amount::ZERO, None),
        };

        let now = self.clock.now();
        match self
            .validator
            .evaluate(item.as_ref(), highest, own_prior, &request, now)
        {
            Decision::Accept => {
                let bid = Bid {
                    id: Uuid::new_v4().to_string(),
                    item_id: request.item_id,
                    bidder_name: request.bidder_name,
                    amount: request.amount,
                    created_at: now,
                    email: request.email,
                };
                self.bids.save(&bid)?;
                debug!(item = %bid.item_id, amount = %bid.amount, "bid accepted");
                self.observer.bid_accepted(&bid);
                Ok(bid)
            }
            Decision::Reject(reason) => {
                debug!(item = %request.item_id, %reason, "bid rejected");
                self.observer.bid_rejected(reason);
                Err(match reason {
                    RejectReason::ItemNotFound => PlaceBidError::ItemNotFound(request.item_id),
                    reason if reason.is_rule() => PlaceBidError::Rejected(reason),
                    reason => PlaceBidError::Invalid(reason),
                })
            }
        }
    }
}
