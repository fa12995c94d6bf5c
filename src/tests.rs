mod expiration;

use crate::auction::{Amount, Category, Item};
use crate::clock::{Clock, ManualClock};
use crate::service::bidding_engine::{BidRequest, BiddingEngine};
use crate::store::in_memory::{InMemoryBidStore, InMemoryItemStore};
use crate::store::{ItemStore, SharedBidStore, SharedItemStore};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub(crate) fn request(item_id: &str, bidder: &str, email: &str, amount: Amount) -> BidRequest {
    BidRequest {
        item_id: item_id.to_owned(),
        bidder_name: bidder.to_owned(),
        amount,
        email: email.to_owned(),
    }
}

/// In-memory stores, a manual clock and an engine wired together.
pub(crate) struct Fixture {
    pub items: SharedItemStore,
    pub bids: SharedBidStore,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<BiddingEngine>,
}

impl Fixture {
    pub fn new() -> Self {
        let items = InMemoryItemStore::new_shared();
        let bids = InMemoryBidStore::new_shared();
        let clock = ManualClock::new(start_time());
        let engine = Arc::new(BiddingEngine::new(
            items.clone(),
            bids.clone(),
            clock.clone(),
        ));
        Self {
            items,
            bids,
            clock,
            engine,
        }
    }

    /// Puts an active item that expires `ends_in` from the clock's now.
    pub fn add_item(&self, id: &str, initial_price: Amount, ends_in: Duration) -> Item {
        let item = Item {
            id: id.to_owned(),
            name: format!("{} (listing)", id),
            description: "test listing".to_owned(),
            initial_price,
            end_time: self.clock.now() + ends_in,
            active: true,
            creator: "seller@example.com".to_owned(),
            category: Category::Electronics,
        };
        self.items.put(&item).expect("in-memory put");
        item
    }
}
