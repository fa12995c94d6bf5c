use super::{BidStore, ItemStore, SharedBidStore, SharedItemStore};
use crate::auction::{Bid, Category, Item, ItemIdRef};
use anyhow::{Context, Result};
use postgres::{NoTls, Row};
use r2d2_postgres::PostgresConnectionManager;
use std::str::FromStr;
use std::sync::Arc;

type Pool = r2d2::Pool<PostgresConnectionManager<NoTls>>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    initial_price NUMERIC NOT NULL,
    end_time TIMESTAMPTZ NOT NULL,
    active BOOLEAN NOT NULL,
    creator TEXT NOT NULL,
    category TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS bids (
    id TEXT PRIMARY KEY,
    item_id TEXT NOT NULL,
    bidder_name TEXT NOT NULL,
    amount NUMERIC NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    email TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS bids_item_idx ON bids (item_id);
CREATE INDEX IF NOT EXISTS bids_item_email_idx ON bids (item_id, email);
";

pub struct PostgresStores {
    pub items: SharedItemStore,
    pub bids: SharedBidStore,
}

/// Connects a pool to `url` and bootstraps the schema.
pub fn connect(url: &str) -> Result<PostgresStores> {
    let config = url.parse().context("invalid postgres url")?;
    let manager = PostgresConnectionManager::new(config, NoTls);
    let pool = r2d2::Pool::new(manager).context("failed to build connection pool")?;
    pool.get()?.batch_execute(SCHEMA)?;
    Ok(PostgresStores {
        items: Arc::new(PostgresItemStore { pool: pool.clone() }),
        bids: Arc::new(PostgresBidStore { pool }),
    })
}

pub struct PostgresItemStore {
    pool: Pool,
}

fn item_from_row(row: &Row) -> Result<Item> {
    Ok(Item {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        initial_price: row.get("initial_price"),
        end_time: row.get("end_time"),
        active: row.get("active"),
        creator: row.get("creator"),
        category: Category::from_str(row.get("category"))?,
    })
}

impl ItemStore for PostgresItemStore {
    fn get(&self, id: ItemIdRef) -> Result<Option<Item>> {
        let mut conn = self.pool.get()?;
        let row = conn.query_opt(
            "SELECT id, name, description, initial_price, end_time, active, creator, category \
             FROM items WHERE id = $1",
            &[&id],
        )?;
        row.as_ref().map(item_from_row).transpose()
    }

    fn put(&self, item: &Item) -> Result<()> {
        let mut conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO items (id, name, description, initial_price, end_time, active, creator, category) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 description = EXCLUDED.description, \
                 initial_price = EXCLUDED.initial_price, \
                 end_time = EXCLUDED.end_time, \
                 active = EXCLUDED.active, \
                 creator = EXCLUDED.creator, \
                 category = EXCLUDED.category",
            &[
                &item.id,
                &item.name,
                &item.description,
                &item.initial_price,
                &item.end_time,
                &item.active,
                &item.creator,
                &item.category.as_str(),
            ],
        )?;
        Ok(())
    }

    fn list_active(&self) -> Result<Vec<Item>> {
        let mut conn = self.pool.get()?;
        let rows = conn.query(
            "SELECT id, name, description, initial_price, end_time, active, creator, category \
             FROM items WHERE active",
            &[],
        )?;
        rows.iter().map(item_from_row).collect()
    }
}

pub struct PostgresBidStore {
    pool: Pool,
}

fn bid_from_row(row: &Row) -> Bid {
    Bid {
        id: row.get("id"),
        item_id: row.get("item_id"),
        bidder_name: row.get("bidder_name"),
        amount: row.get("amount"),
        created_at: row.get("created_at"),
        email: row.get("email"),
    }
}

impl BidStore for PostgresBidStore {
    fn save(&self, bid: &Bid) -> Result<()> {
        let mut conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO bids (id, item_id, bidder_name, amount, created_at, email) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &bid.id,
                &bid.item_id,
                &bid.bidder_name,
                &bid.amount,
                &bid.created_at,
                &bid.email,
            ],
        )?;
        Ok(())
    }

    fn find_by_item(&self, item_id: ItemIdRef) -> Result<Vec<Bid>> {
        let mut conn = self.pool.get()?;
        let rows = conn.query(
            "SELECT id, item_id, bidder_name, amount, created_at, email \
             FROM bids WHERE item_id = $1 ORDER BY created_at",
            &[&item_id],
        )?;
        Ok(rows.iter().map(bid_from_row).collect())
    }

    fn find_by_item_and_email(&self, item_id: ItemIdRef, email: &str) -> Result<Vec<Bid>> {
        let mut conn = self.pool.get()?;
        let rows = conn.query(
            "SELECT id, item_id, bidder_name, amount, created_at, email \
             FROM bids WHERE item_id = $1 AND email = $2 ORDER BY created_at",
            &[&item_id, &email],
        )?;
        Ok(rows.iter().map(bid_from_row).collect())
    }
}
