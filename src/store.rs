//! Store traits for the engine's collaborators
//!
//! Items and bids live behind these traits so the engine stays portable
//! across backends: the in-memory stores double as test fakes and as a
//! zero-setup way to run the daemon, the postgres ones persist for real.
//!
//! None of the operations here carry the bidding invariants. The engine owns
//! those, which is why it serializes the read-validate-write sequence per
//! item instead of trusting the store to reject a stale write.
pub mod in_memory;
pub mod postgres;

use crate::auction::{Bid, Item, ItemIdRef};
use anyhow::Result;
use std::sync::Arc;

pub trait ItemStore: Send + Sync {
    fn get(&self, id: ItemIdRef) -> Result<Option<Item>>;
    fn put(&self, item: &Item) -> Result<()>;
    fn list_active(&self) -> Result<Vec<Item>>;
}

pub trait BidStore: Send + Sync {
    fn save(&self, bid: &Bid) -> Result<()>;
    /// All accepted bids for an item, oldest first.
    fn find_by_item(&self, item_id: ItemIdRef) -> Result<Vec<Bid>>;
    /// One bidder's accepted bids on an item, oldest first.
    fn find_by_item_and_email(&self, item_id: ItemIdRef, email: &str) -> Result<Vec<Bid>>;
}

pub type SharedItemStore = Arc<dyn ItemStore + 'static>;
pub type SharedBidStore = Arc<dyn BidStore + 'static>;
