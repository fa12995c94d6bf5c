//! Auction data model
//!
//! An [`Item`] is a listing with a price floor and an expiry; a [`Bid`] is a
//! monetary offer against it. Bids are only ever appended by the bidding
//! engine, which guarantees that accepted amounts per item form a strictly
//! increasing chain starting above the item's initial price.
use anyhow::bail;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ItemId = String;
pub type ItemIdRef<'a> = &'a str;
pub type BidId = String;
pub type Amount = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Electronics,
    Fashion,
    Books,
    Home,
    Sports,
    Collectibles,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "ELECTRONICS",
            Category::Fashion => "FASHION",
            Category::Books => "BOOKS",
            Category::Home => "HOME",
            Category::Sports => "SPORTS",
            Category::Collectibles => "COLLECTIBLES",
            Category::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ELECTRONICS" => Category::Electronics,
            "FASHION" => Category::Fashion,
            "BOOKS" => Category::Books,
            "HOME" => Category::Home,
            "SPORTS" => Category::Sports,
            "COLLECTIBLES" => Category::Collectibles,
            "OTHER" => Category::Other,
            other => bail!("unknown category: {}", other),
        })
    }
}

/// An auction listing.
///
/// `active` is flipped to `false` by the expiration sweeper once `end_time`
/// has passed; nothing else deactivates an item due to time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub initial_price: Amount,
    pub end_time: DateTime<Utc>,
    pub active: bool,
    pub creator: String,
    pub category: Category,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        initial_price: Amount,
        end_time: DateTime<Utc>,
        creator: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            initial_price,
            end_time,
            active: true,
            creator: creator.into(),
            category,
        }
    }
}

/// An accepted bid. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub item_id: ItemId,
    pub bidder_name: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    pub email: String,
}

/// The current price to beat: the highest accepted amount, or the initial
/// price when no bids exist yet.
pub fn highest_amount(item: &Item, bids: &[Bid]) -> Amount {
    bids.iter()
        .map(|bid| bid.amount)
        .max()
        .unwrap_or(item.initial_price)
}
