//! Expiration sweeper daemon
//!
//! Runs the periodic sweep that deactivates auctions past their deadline.
//! The bid placement engine lives in the library and is driven by the API
//! layer; this binary only owns the background job.
use anyhow::Result;
use gavel::clock::SystemClock;
use gavel::service::{expiration::ExpirationSweeper, ServiceControl};
use gavel::store;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let item_store = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            info!("using postgres item store");
            store::postgres::connect(&url)?.items
        }
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory item store");
            store::in_memory::InMemoryItemStore::new_shared()
        }
    };

    let svc_ctl = ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctl = svc_ctl.clone();
        move || {
            eprintln!("Stopping all services...");
            svc_ctl.stop_all();
        }
    })?;

    let sweeper = ExpirationSweeper::new(item_store, SystemClock::new_shared());
    info!("starting expiration sweeper");
    svc_ctl.spawn_loop(sweeper).join()?;

    Ok(())
}
