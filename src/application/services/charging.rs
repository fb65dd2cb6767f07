//! EV charging session lifecycle

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::caller::Caller;
use crate::application::events::{ChargingEvent, Event, SharedEventBus};
use crate::application::policy::LifecyclePolicy;
use crate::application::ports::SharedAnchorSource;
use crate::application::services::ledger::{PaymentRequest, WalletLedger};
use crate::domain::{
    ChargeReference, ChargingSession, ChargingStation, DomainError, DomainResult, PaymentType,
    RepositoryProvider, SessionStatus, StationStatus,
};
use crate::shared::{KeyedLocks, PageRequest, PaginatedResult, SharedClock};

fn record_outcome(outcome: &'static str) {
    metrics::counter!("charging_sessions_total", "outcome" => outcome).increment(1);
}

fn charging_event(s: &ChargingSession, cost: i64) -> ChargingEvent {
    ChargingEvent {
        session_id: s.id.clone(),
        station_id: s.station_id.clone(),
        user_id: s.user_id.clone(),
        status: s.status.to_string(),
        energy_wh: s.energy_wh,
        cost,
        timestamp: s.updated_at,
    }
}

pub struct ChargingService {
    repos: Arc<dyn RepositoryProvider>,
    ledger: Arc<WalletLedger>,
    events: SharedEventBus,
    anchors: SharedAnchorSource,
    clock: SharedClock,
    policy: LifecyclePolicy,
    locks: KeyedLocks,
}

impl ChargingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        ledger: Arc<WalletLedger>,
        events: SharedEventBus,
        anchors: SharedAnchorSource,
        clock: SharedClock,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            repos,
            ledger,
            events,
            anchors,
            clock,
            policy,
            locks: KeyedLocks::new(),
        }
    }

    async fn load_station(&self, station_id: &str) -> DomainResult<ChargingStation> {
        self.repos
            .charging_stations()
            .find_by_id(station_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingStation", station_id))
    }

    async fn load_owned(&self, caller: &Caller, id: &str) -> DomainResult<ChargingSession> {
        let session = self
            .repos
            .charging_sessions()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", id))?;
        caller.ensure_owner(&session.user_id)?;
        Ok(session)
    }

    async fn release_station(&self, station_id: &str) {
        match self
            .repos
            .charging_stations()
            .transition_status(station_id, StationStatus::InUse, StationStatus::Available)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(station_id, "Station was not in use when released"),
            Err(e) => error!(station_id, error = %e, "Failed to release station"),
        }
    }

    /// Charge `amount` for the session; `None` when there is nothing to bill.
    async fn bill(&self, session: &ChargingSession, amount: i64) -> DomainResult<Option<String>> {
        if amount <= 0 {
            return Ok(None);
        }
        let payment = self
            .ledger
            .process_payment(
                &session.user_id,
                PaymentRequest {
                    amount,
                    payment_type: PaymentType::Charging,
                    reference: ChargeReference::Session(session.id.clone()),
                    description: format!(
                        "Charging at {} ({} Wh)",
                        session.station_id, session.energy_wh
                    ),
                },
            )
            .await?;
        Ok(Some(payment.id))
    }

    fn anchor(&self, session: &mut ChargingSession) {
        session.anchor = self.anchors.anchor(
            "charging_session",
            &session.id,
            &format!(
                "{}|{}|{}|{}|{}",
                session.station_id,
                session.user_id,
                session.status.as_str(),
                session.energy_wh,
                session.total_cost.unwrap_or(session.current_cost)
            ),
        );
    }

    // ── Start ───────────────────────────────────────────────────

    pub async fn start(&self, caller: &Caller, station_id: &str) -> DomainResult<ChargingSession> {
        let result = self.begin(caller, station_id).await;
        record_outcome(if result.is_ok() { "started" } else { "rejected" });
        result
    }

    async fn begin(&self, caller: &Caller, station_id: &str) -> DomainResult<ChargingSession> {
        let wallet = self.ledger.wallet_for_user(&caller.user_id).await?;
        if self.policy.min_start_balance > 0 && wallet.balance < self.policy.min_start_balance {
            return Err(DomainError::InsufficientFunds {
                available: wallet.balance,
                required: self.policy.min_start_balance,
            });
        }

        let station = self.load_station(station_id).await?;
        let stations = self.repos.charging_stations();
        if !stations
            .transition_status(&station.id, StationStatus::Available, StationStatus::InUse)
            .await?
        {
            let status = stations
                .find_by_id(&station.id)
                .await?
                .map(|s| s.status.to_string())
                .unwrap_or_else(|| "deleted".to_string());
            return Err(DomainError::StationUnavailable {
                station_id: station.id,
                status,
            });
        }

        let now = self.clock.now();
        let mut session = ChargingSession::start(&station, &caller.user_id, now);
        if let Err(e) = self.repos.charging_sessions().save(session.clone()).await {
            self.release_station(&station.id).await;
            return Err(e);
        }

        session.activate(now)?;
        if let Err(e) = self.repos.charging_sessions().update(session.clone()).await {
            self.release_station(&station.id).await;
            return Err(e);
        }

        info!(
            session_id = %session.id,
            station_id = %session.station_id,
            user_id = %session.user_id,
            price_per_kwh = session.price_per_kwh,
            "Charging session started"
        );
        self.events
            .publish(Event::ChargingStarted(charging_event(&session, 0)));
        Ok(session)
    }

    // ── Update ──────────────────────────────────────────────────

    pub async fn update_progress(
        &self,
        caller: &Caller,
        id: &str,
        energy_wh: i64,
        current_cost: Option<i64>,
    ) -> DomainResult<ChargingSession> {
        let _guard = self.locks.lock(id).await;
        let mut session = self.load_owned(caller, id).await?;
        session.record_progress(energy_wh, current_cost, self.clock.now())?;
        self.repos.charging_sessions().update(session.clone()).await?;

        self.events.publish(Event::ChargingProgress(charging_event(
            &session,
            session.current_cost,
        )));
        Ok(session)
    }

    // ── Stop ────────────────────────────────────────────────────

    pub async fn stop(&self, caller: &Caller, id: &str) -> DomainResult<ChargingSession> {
        let _guard = self.locks.lock(id).await;
        let mut session = self.load_owned(caller, id).await?;
        session.ensure_stoppable()?;

        let total = session.metered_cost();
        let payment_id = self.bill(&session, total).await?;
        session.complete(total, payment_id.clone(), self.clock.now())?;
        self.anchor(&mut session);

        self.finish(&session, payment_id).await?;

        info!(
            session_id = %session.id,
            energy_wh = session.energy_wh,
            total_cost = total,
            duration_minutes = session.duration_minutes,
            "Charging session completed"
        );
        record_outcome("completed");
        self.events
            .publish(Event::ChargingStopped(charging_event(&session, total)));
        Ok(session)
    }

    // ── Cancel ──────────────────────────────────────────────────

    pub async fn cancel(&self, caller: &Caller, id: &str) -> DomainResult<ChargingSession> {
        let _guard = self.locks.lock(id).await;
        let mut session = self.load_owned(caller, id).await?;
        session.ensure_cancellable()?;

        let billed = if self.policy.bill_partial_on_cancel {
            session.metered_cost()
        } else {
            0
        };
        let payment_id = self.bill(&session, billed).await?;
        session.cancel(billed.max(0), payment_id.clone(), self.clock.now())?;
        self.anchor(&mut session);

        self.finish(&session, payment_id).await?;

        info!(session_id = %session.id, billed, "Charging session cancelled");
        record_outcome("cancelled");
        self.events
            .publish(Event::ChargingCancelled(charging_event(&session, billed)));
        Ok(session)
    }

    /// Persist a terminal session and free its station. A failed write
    /// refunds the bill it carried.
    async fn finish(
        &self,
        session: &ChargingSession,
        payment_id: Option<String>,
    ) -> DomainResult<()> {
        if let Err(e) = self.repos.charging_sessions().update(session.clone()).await {
            if let Some(payment_id) = payment_id {
                if let Err(refund_err) = self
                    .ledger
                    .refund_payment(
                        &payment_id,
                        None,
                        Some("Charging session could not be stored".into()),
                    )
                    .await
                {
                    error!(payment_id = %payment_id, error = %refund_err, "Compensating refund failed");
                }
            }
            return Err(e);
        }
        self.release_station(&session.station_id).await;
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get(&self, caller: &Caller, id: &str) -> DomainResult<ChargingSession> {
        self.load_owned(caller, id).await
    }

    pub async fn list_for_caller(
        &self,
        caller: &Caller,
        status: Option<SessionStatus>,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        let statuses: Vec<SessionStatus> = status.into_iter().collect();
        self.repos
            .charging_sessions()
            .find_for_user(&caller.user_id, &statuses, page)
            .await
    }

    pub async fn active(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        self.repos
            .charging_sessions()
            .find_for_user(&caller.user_id, &SessionStatus::LIVE, page)
            .await
    }

    /// The caller's completed and cancelled sessions, newest first.
    pub async fn history(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        self.repos
            .charging_sessions()
            .find_for_user(&caller.user_id, &SessionStatus::HISTORY, page)
            .await
    }

    pub async fn for_station(
        &self,
        caller: &Caller,
        station_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        caller.ensure_admin()?;
        self.load_station(station_id).await?;
        self.repos
            .charging_sessions()
            .find_for_station(station_id, page)
            .await
    }

    /// Watt-hours delivered over the caller's completed sessions.
    pub async fn total_energy(&self, caller: &Caller) -> DomainResult<i64> {
        self.repos
            .charging_sessions()
            .total_energy_for_user(&caller.user_id)
            .await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::Harness;
    use chrono::Duration;

    async fn station_status(h: &Harness, id: &str) -> StationStatus {
        h.repos
            .charging_stations()
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn start_marks_station_in_use() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;

        let s = h.charging.start(&Caller::user("u1"), "C1").await.unwrap();
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.price_per_kwh, 40);
        assert_eq!(station_status(&h, "C1").await, StationStatus::InUse);

        let err = h
            .charging
            .start(&Caller::user("u2"), "C1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StationUnavailable { .. }));
    }

    #[tokio::test]
    async fn start_requires_wallet() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        let err = h
            .charging
            .start(&Caller::user("nobody"), "C1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(station_status(&h, "C1").await, StationStatus::Available);
    }

    #[tokio::test]
    async fn minimum_balance_is_enforced() {
        let h = Harness::with_policy(LifecyclePolicy {
            min_start_balance: 1_000,
            ..Default::default()
        })
        .await;
        h.add_station("C1", 40).await;
        let err = h
            .charging
            .start(&Caller::user("u1"), "C1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds { .. }));
        assert_eq!(station_status(&h, "C1").await, StationStatus::Available);
    }

    #[tokio::test]
    async fn progress_must_not_decrease() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        let caller = Caller::user("u1");
        let s = h.charging.start(&caller, "C1").await.unwrap();

        h.clock.advance(Duration::minutes(30));
        let s = h
            .charging
            .update_progress(&caller, &s.id, 10_000, None)
            .await
            .unwrap();
        assert_eq!(s.current_cost, 400);
        assert_eq!(s.duration_minutes, 30);

        let err = h
            .charging
            .update_progress(&caller, &s.id, 9_000, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn stop_bills_metered_energy() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        let caller = Caller::user("u1");
        let s = h.charging.start(&caller, "C1").await.unwrap();
        h.charging
            .update_progress(&caller, &s.id, 12_345, None)
            .await
            .unwrap();

        let done = h.charging.stop(&caller, &s.id).await.unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.total_cost, Some(494));
        assert!(done.payment_id.is_some());
        assert_eq!(h.balance("u1").await, 4_506);
        assert_eq!(station_status(&h, "C1").await, StationStatus::Available);
        assert_eq!(h.charging.total_energy(&caller).await.unwrap(), 12_345);
    }

    #[tokio::test]
    async fn failed_payment_keeps_session_active() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        h.ledger.add_funds("u1", 100, None).await.unwrap();
        let caller = Caller::user("u1");
        let s = h.charging.start(&caller, "C1").await.unwrap();
        h.charging
            .update_progress(&caller, &s.id, 10_000, None)
            .await
            .unwrap();

        let err = h.charging.stop(&caller, &s.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds { .. }));
        let stored = h.charging.get(&caller, &s.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Active);
        assert_eq!(station_status(&h, "C1").await, StationStatus::InUse);
        assert_eq!(h.balance("u1").await, 100);
    }

    #[tokio::test]
    async fn zero_energy_stop_is_free() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        let caller = Caller::user("u1");
        let s = h.charging.start(&caller, "C1").await.unwrap();
        let done = h.charging.stop(&caller, &s.id).await.unwrap();
        assert_eq!(done.total_cost, Some(0));
        assert!(done.payment_id.is_none());

        let err = h.charging.stop(&caller, &s.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn cancel_bills_partial_energy_by_default() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        h.ledger.add_funds("u1", 1_000, None).await.unwrap();
        let caller = Caller::user("u1");
        let s = h.charging.start(&caller, "C1").await.unwrap();
        h.charging
            .update_progress(&caller, &s.id, 5_000, None)
            .await
            .unwrap();

        let cancelled = h.charging.cancel(&caller, &s.id).await.unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        assert_eq!(cancelled.total_cost, Some(200));
        assert_eq!(h.balance("u1").await, 800);
        assert_eq!(station_status(&h, "C1").await, StationStatus::Available);
    }

    #[tokio::test]
    async fn cancel_without_partial_billing_is_free() {
        let h = Harness::with_policy(LifecyclePolicy {
            bill_partial_on_cancel: false,
            ..Default::default()
        })
        .await;
        h.add_station("C1", 40).await;
        h.ledger.add_funds("u1", 1_000, None).await.unwrap();
        let caller = Caller::user("u1");
        let s = h.charging.start(&caller, "C1").await.unwrap();
        h.charging
            .update_progress(&caller, &s.id, 5_000, None)
            .await
            .unwrap();

        h.charging.cancel(&caller, &s.id).await.unwrap();
        assert_eq!(h.balance("u1").await, 1_000);
    }

    #[tokio::test]
    async fn sessions_are_private() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        let s = h.charging.start(&Caller::user("u1"), "C1").await.unwrap();
        let err = h
            .charging
            .stop(&Caller::user("u2"), &s.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let active = h
            .charging
            .active(&Caller::user("u1"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(active.total, 1);
        let by_station = h
            .charging
            .for_station(&Caller::admin("admin"), "C1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(by_station.total, 1);
    }

    #[tokio::test]
    async fn concurrent_starts_on_one_station_have_one_winner() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        let first = Caller::user("u1");
        let second = Caller::user("u2");

        let (a, b) = tokio::join!(
            h.charging.start(&first, "C1"),
            h.charging.start(&second, "C1"),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(DomainError::StationUnavailable { .. }))));
        assert_eq!(station_status(&h, "C1").await, StationStatus::InUse);

        let live = h
            .charging
            .active(&first, PageRequest::default())
            .await
            .unwrap()
            .total
            + h.charging
                .active(&second, PageRequest::default())
                .await
                .unwrap()
                .total;
        assert_eq!(live, 1);
    }

    #[tokio::test]
    async fn history_lists_finished_sessions_only() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        h.add_station("C2", 40).await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        let caller = Caller::user("u1");

        let done = h.charging.start(&caller, "C1").await.unwrap();
        h.charging
            .update_progress(&caller, &done.id, 2_000, None)
            .await
            .unwrap();
        h.charging.stop(&caller, &done.id).await.unwrap();
        let dropped = h.charging.start(&caller, "C1").await.unwrap();
        h.charging.cancel(&caller, &dropped.id).await.unwrap();
        let running = h.charging.start(&caller, "C2").await.unwrap();

        let history = h
            .charging
            .history(&caller, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total, 2);
        assert!(history.items.iter().all(|s| s.status.is_terminal()));
        assert!(history.items.iter().all(|s| s.id != running.id));
        assert_eq!(history.items[0].id, dropped.id);

        let other = h
            .charging
            .history(&Caller::user("u2"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(other.total, 0);
        assert!(h.charging.locks.is_empty());
    }
}
