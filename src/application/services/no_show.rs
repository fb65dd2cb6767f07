//! Background task that releases reservations nobody checked in to.
//!
//! Wakes every `interval_secs` and cancels confirmed reservations whose
//! booked window has ended, applying the late refund policy.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use super::reservation::ReservationService;
use crate::shared::shutdown::ShutdownSignal;

pub fn start_no_show_task(
    reservations: Arc<ReservationService>,
    shutdown: ShutdownSignal,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = interval_secs, "No-show sweep task started");

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match reservations.sweep_no_shows().await {
                        Ok(0) => {}
                        Ok(count) => info!(count, "Released no-show reservations"),
                        Err(e) => warn!(error = %e, "No-show sweep error"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("No-show sweep task shutting down");
                    break;
                }
            }
        }
    })
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::caller::Caller;
    use crate::application::services::testing::{at, Harness};
    use crate::domain::ReservationStatus;

    #[tokio::test]
    async fn task_sweeps_and_stops_on_shutdown() {
        let h = Harness::new().await;
        h.add_spot("S1", 500).await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        let r = h
            .reservations
            .create(&Caller::user("u1"), "S1", at(9, 0), at(10, 0))
            .await
            .unwrap();
        h.clock.set(at(10, 30));

        let shutdown = ShutdownSignal::new();
        let task = start_no_show_task(h.reservations.clone(), shutdown.clone(), 1);

        // first tick fires immediately
        for _ in 0..50 {
            let current = h.reservations.get(&Caller::user("u1"), &r.id).await.unwrap();
            if current.status == ReservationStatus::Cancelled {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let current = h.reservations.get(&Caller::user("u1"), &r.id).await.unwrap();
        assert_eq!(current.status, ReservationStatus::Cancelled);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
