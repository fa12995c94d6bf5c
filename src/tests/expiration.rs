use super::{request, Fixture};
use crate::clock::Clock;
use crate::service::bidding_engine::{PlaceBidError, RejectReason};
use crate::store::ItemStore;
use crate::service::expiration::ExpirationSweeper;
use crate::service::ServiceControl;
use crate::telemetry::BidMetrics;
use anyhow::Result;
use chrono::Duration;
use rust_decimal_macros::dec;

#[test]
fn sweep_deactivates_only_items_past_their_deadline() -> Result<()> {
    let f = Fixture::new();
    let expired = f.add_item("old", dec!(100.0), Duration::minutes(30));
    let live = f.add_item("new", dec!(100.0), Duration::hours(2));
    f.clock.advance(Duration::hours(1));

    let sweeper = ExpirationSweeper::new(f.items.clone(), f.clock.clone());
    assert_eq!(sweeper.sweep(f.clock.now())?, 1);

    assert!(!f.items.get(&expired.id)?.expect("present").active);
    assert!(f.items.get(&live.id)?.expect("present").active);
    Ok(())
}

#[test]
fn sweep_is_idempotent() -> Result<()> {
    let f = Fixture::new();
    f.add_item("old", dec!(100.0), Duration::minutes(30));
    f.clock.advance(Duration::hours(1));

    let sweeper = ExpirationSweeper::new(f.items.clone(), f.clock.clone());
    assert_eq!(sweeper.sweep(f.clock.now())?, 1);
    assert_eq!(sweeper.sweep(f.clock.now())?, 0);
    Ok(())
}

#[test]
fn item_expiring_exactly_now_is_left_for_the_next_pass() -> Result<()> {
    let f = Fixture::new();
    let item = f.add_item("edge", dec!(100.0), Duration::hours(1));
    f.clock.advance(Duration::hours(1));

    // the deadline has to be strictly in the past for the sweeper, so the
    // item survives this pass
    let sweeper = ExpirationSweeper::new(f.items.clone(), f.clock.clone());
    assert_eq!(sweeper.sweep(f.clock.now())?, 0);
    assert!(f.items.get(&item.id)?.expect("present").active);

    // but the acceptance window is already closed for bidders
    let err = f
        .engine
        .place_bid(request(&item.id, "John Doe", "john@example.com", dec!(150.0)))
        .unwrap_err();
    assert!(matches!(
        err,
        PlaceBidError::Rejected(RejectReason::ItemExpired)
    ));
    Ok(())
}

#[test]
fn bids_after_a_sweep_are_rejected_as_not_active() -> Result<()> {
    let f = Fixture::new();
    let item = f.add_item("old", dec!(100.0), Duration::minutes(30));
    f.clock.advance(Duration::hours(1));

    let sweeper = ExpirationSweeper::new(f.items.clone(), f.clock.clone());
    assert_eq!(sweeper.sweep(f.clock.now())?, 1);

    let err = f
        .engine
        .place_bid(request(&item.id, "John Doe", "john@example.com", dec!(150.0)))
        .unwrap_err();
    assert!(matches!(
        err,
        PlaceBidError::Rejected(RejectReason::ItemNotActive)
    ));
    Ok(())
}

#[test]
fn sweep_reports_the_count_to_the_observer() -> Result<()> {
    let f = Fixture::new();
    f.add_item("one", dec!(100.0), Duration::minutes(10));
    f.add_item("two", dec!(100.0), Duration::minutes(20));
    f.clock.advance(Duration::hours(1));

    let metrics = BidMetrics::new_shared();
    let sweeper = ExpirationSweeper::new(f.items.clone(), f.clock.clone())
        .with_observer(metrics.clone());
    sweeper.sweep(f.clock.now())?;
    assert_eq!(metrics.deactivated(), 2);

    sweeper.sweep(f.clock.now())?;
    assert_eq!(metrics.deactivated(), 2);
    Ok(())
}

#[test]
fn sweeper_loop_runs_until_stopped() -> Result<()> {
    let f = Fixture::new();
    let item = f.add_item("old", dec!(100.0), Duration::minutes(30));
    f.clock.advance(Duration::hours(1));

    let sweeper = ExpirationSweeper::new(f.items.clone(), f.clock.clone())
        .with_period(std::time::Duration::from_millis(10));
    let svc_ctl = ServiceControl::new();
    let handle = svc_ctl.spawn_loop(sweeper);

    std::thread::sleep(std::time::Duration::from_millis(200));
    svc_ctl.stop_all();
    handle.join()?;

    assert!(!f.items.get(&item.id)?.expect("present").active);
    Ok(())
}
