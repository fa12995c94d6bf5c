use super::{BidStore, ItemStore, SharedBidStore, SharedItemStore};
use crate::auction::{Bid, Item, ItemId, ItemIdRef};
use anyhow::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fake in-memory item store.
///
/// Useful for unit-tests and for running the daemon without a database.
#[derive(Default)]
pub struct InMemoryItemStore(Mutex<BTreeMap<ItemId, Item>>);

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedItemStore {
        Arc::new(Self::new())
    }
}

impl ItemStore for InMemoryItemStore {
    fn get(&self, id: ItemIdRef) -> Result<Option<Item>> {
        Ok(self.0.lock().get(id).cloned())
    }

    fn put(&self, item: &Item) -> Result<()> {
        self.0.lock().insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn list_active(&self) -> Result<Vec<Item>> {
        Ok(self
            .0
            .lock()
            .values()
            .filter(|item| item.active)
            .cloned()
            .collect())
    }
}

/// Fake in-memory bid store.
///
/// Bids are kept as an append-only log; under a serialized engine the
/// insertion order is the acceptance order.
#[derive(Default)]
pub struct InMemoryBidStore(Mutex<Vec<Bid>>);

impl InMemoryBidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedBidStore {
        Arc::new(Self::new())
    }
}

impl BidStore for InMemoryBidStore {
    fn save(&self, bid: &Bid) -> Result<()> {
        self.0.lock().push(bid.clone());
        Ok(())
    }

    fn find_by_item(&self, item_id: ItemIdRef) -> Result<Vec<Bid>> {
        Ok(self
            .0
            .lock()
            .iter()
            .filter(|bid| bid.item_id == item_id)
            .cloned()
            .collect())
    }

    fn find_by_item_and_email(&self, item_id: ItemIdRef, email: &str) -> Result<Vec<Bid>> {
        Ok(self
            .0
            .lock()
            .iter()
            .filter(|bid| bid.item_id == item_id && bid.email == email)
            .cloned()
            .collect())
    }
}
