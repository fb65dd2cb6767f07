//! Parking reservation lifecycle
//!
//! Spot holds move by compare-and-set so two bookings can never both win
//! a spot. Money moves through [`WalletLedger`]; a step that fails after
//! money or a spot has moved undoes what it already did before returning.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::application::caller::Caller;
use crate::application::events::{
    Event, ReservationCancelledEvent, ReservationCheckedOutEvent, ReservationEvent,
    SharedEventBus,
};
use crate::application::policy::{LifecyclePolicy, Settlement};
use crate::application::ports::SharedAnchorSource;
use crate::application::services::ledger::{PaymentRequest, WalletLedger};
use crate::domain::{
    ChargeReference, DomainError, DomainResult, ParkingSpot, PaymentType, RepositoryProvider,
    Reservation, ReservationStatus, SpotStatus,
};
use crate::infrastructure::crypto::issue_qr_code;
use crate::shared::{KeyedLocks, PageRequest, PaginatedResult, SharedClock};

fn record_outcome(outcome: &'static str) {
    metrics::counter!("reservations_total", "outcome" => outcome).increment(1);
}

fn reservation_event(r: &Reservation) -> ReservationEvent {
    ReservationEvent {
        reservation_id: r.id.clone(),
        spot_id: r.spot_id.clone(),
        user_id: r.user_id.clone(),
        status: r.status.to_string(),
        total_cost: r.total_cost,
        timestamp: r.updated_at,
    }
}

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    ledger: Arc<WalletLedger>,
    events: SharedEventBus,
    anchors: SharedAnchorSource,
    clock: SharedClock,
    policy: LifecyclePolicy,
    locks: KeyedLocks,
}

impl ReservationService {
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

    async fn load_spot(&self, spot_id: &str) -> DomainResult<ParkingSpot> {
        self.repos
            .parking_spots()
            .find_by_id(spot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingSpot", spot_id))
    }

    async fn load_owned(&self, caller: &Caller, id: &str) -> DomainResult<Reservation> {
        let reservation = self
            .repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))?;
        caller.ensure_owner(&reservation.user_id)?;
        Ok(reservation)
    }

    /// Best-effort spot move used on compensation and release paths.
    async fn move_spot(&self, spot_id: &str, from: SpotStatus, to: SpotStatus) {
        match self
            .repos
            .parking_spots()
            .transition_status(spot_id, from, to)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                spot_id,
                from = from.as_str(),
                to = to.as_str(),
                "Spot was not in the expected status"
            ),
            Err(e) => error!(spot_id, error = %e, "Failed to move spot status"),
        }
    }

    async fn compensate_payment(&self, payment_id: &str, reason: &str) {
        if let Err(e) = self
            .ledger
            .refund_payment(payment_id, None, Some(reason.to_string()))
            .await
        {
            error!(payment_id, error = %e, "Compensating refund failed");
        }
    }

    // ── Create ──────────────────────────────────────────────────

    pub async fn create(
        &self,
        caller: &Caller,
        spot_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let result = self.book(caller, spot_id, start_time, end_time).await;
        record_outcome(if result.is_ok() { "created" } else { "rejected" });
        result
    }

    async fn book(
        &self,
        caller: &Caller,
        spot_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let now = self.clock.now();
        let spot = self.load_spot(spot_id).await?;
        let mut reservation = Reservation::new(&spot, &caller.user_id, start_time, end_time, now)?;
        if reservation.total_cost <= 0 {
            return Err(DomainError::InvalidTimeRange(
                "booking is too short to be priced".into(),
            ));
        }

        let spots = self.repos.parking_spots();
        if !spots
            .transition_status(&spot.id, SpotStatus::Available, SpotStatus::Reserved)
            .await?
        {
            let status = spots
                .find_by_id(&spot.id)
                .await?
                .map(|s| s.status.to_string())
                .unwrap_or_else(|| "deleted".to_string());
            return Err(DomainError::SpotUnavailable {
                spot_id: spot.id,
                status,
            });
        }

        let payment = match self
            .ledger
            .process_payment(
                &caller.user_id,
                PaymentRequest {
                    amount: reservation.total_cost,
                    payment_type: PaymentType::Parking,
                    reference: ChargeReference::Reservation(reservation.id.clone()),
                    description: format!("Parking at {} ({})", spot.name, spot.id),
                },
            )
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                self.move_spot(&spot.id, SpotStatus::Reserved, SpotStatus::Available)
                    .await;
                return Err(e);
            }
        };

        let qr_code = issue_qr_code(&reservation.id, &reservation.user_id);
        reservation.confirm(payment.id.clone(), qr_code, now)?;
        reservation.anchor = self.anchors.anchor(
            "reservation",
            &reservation.id,
            &format!(
                "{}|{}|{}|{}|{}",
                reservation.spot_id,
                reservation.user_id,
                reservation.start_time.timestamp(),
                reservation.end_time.timestamp(),
                reservation.total_cost
            ),
        );

        if let Err(e) = self.repos.reservations().save(reservation.clone()).await {
            error!(reservation_id = %reservation.id, error = %e, "Failed to store reservation, compensating");
            self.compensate_payment(&payment.id, "Reservation could not be stored")
                .await;
            self.move_spot(&spot.id, SpotStatus::Reserved, SpotStatus::Available)
                .await;
            return Err(e);
        }

        info!(
            reservation_id = %reservation.id,
            spot_id = %reservation.spot_id,
            user_id = %reservation.user_id,
            total_cost = reservation.total_cost,
            "Reservation confirmed"
        );
        self.events
            .publish(Event::ReservationCreated(reservation_event(&reservation)));
        Ok(reservation)
    }

    // ── CheckIn ─────────────────────────────────────────────────

    pub async fn check_in(
        &self,
        caller: &Caller,
        id: &str,
        qr_code: Option<&str>,
    ) -> DomainResult<Reservation> {
        let _guard = self.locks.lock(id).await;
        let mut reservation = self.load_owned(caller, id).await?;

        if let Some(code) = qr_code {
            if reservation.qr_code.as_deref() != Some(code) {
                return Err(DomainError::InvalidInput(
                    "QR code does not match this reservation".into(),
                ));
            }
        }
        reservation.check_in(self.clock.now(), self.policy.check_in_grace())?;

        if !self
            .repos
            .parking_spots()
            .transition_status(&reservation.spot_id, SpotStatus::Reserved, SpotStatus::Occupied)
            .await?
        {
            return Err(DomainError::Conflict(format!(
                "spot {} is not held by reservation {}",
                reservation.spot_id, reservation.id
            )));
        }

        if let Err(e) = self.repos.reservations().update(reservation.clone()).await {
            self.move_spot(&reservation.spot_id, SpotStatus::Occupied, SpotStatus::Reserved)
                .await;
            return Err(e);
        }

        info!(reservation_id = %reservation.id, spot_id = %reservation.spot_id, "Checked in");
        record_outcome("checked_in");
        self.events
            .publish(Event::ReservationCheckedIn(reservation_event(&reservation)));
        Ok(reservation)
    }

    // ── CheckOut ────────────────────────────────────────────────

    pub async fn check_out(&self, caller: &Caller, id: &str) -> DomainResult<Reservation> {
        let _guard = self.locks.lock(id).await;
        let mut reservation = self.load_owned(caller, id).await?;
        let now = self.clock.now();

        let settlement = self.policy.settle_checkout(&reservation, now);
        reservation.check_out(now)?;

        let mut settled = 0;
        let mut unpaid = 0;
        let mut settlement_payment = None;
        match settlement {
            Settlement::None => {}
            Settlement::Charge(amount) => {
                let request = PaymentRequest {
                    amount,
                    payment_type: PaymentType::Parking,
                    reference: ChargeReference::Reservation(reservation.id.clone()),
                    description: format!("Parking settlement for {}", reservation.id),
                };
                match self
                    .ledger
                    .process_payment(&reservation.user_id, request.clone())
                    .await
                {
                    Ok(payment) => {
                        settled = amount;
                        settlement_payment = Some(payment.id);
                    }
                    Err(DomainError::InsufficientFunds { available, required }) => {
                        warn!(
                            reservation_id = %reservation.id,
                            available,
                            required,
                            "Settlement charge declined, completing checkout with unpaid balance"
                        );
                        self.ledger
                            .record_unpaid(&reservation.user_id, request)
                            .await?;
                        unpaid = amount;
                    }
                    Err(e) => return Err(e),
                }
            }
            Settlement::Refund(amount) => {
                settled = -self
                    .ledger
                    .refund_up_to(
                        &reservation.id,
                        PaymentType::Parking,
                        amount,
                        "Early departure",
                    )
                    .await?;
            }
        }

        if let Err(e) = self.repos.reservations().update(reservation.clone()).await {
            if let Some(payment_id) = settlement_payment {
                self.compensate_payment(&payment_id, "Checkout could not be stored")
                    .await;
            }
            return Err(e);
        }
        self.move_spot(&reservation.spot_id, SpotStatus::Occupied, SpotStatus::Available)
            .await;

        info!(
            reservation_id = %reservation.id,
            settlement = settled,
            unpaid,
            "Checked out"
        );
        record_outcome("checked_out");
        self.events
            .publish(Event::ReservationCheckedOut(ReservationCheckedOutEvent {
                reservation: reservation_event(&reservation),
                settlement: settled,
                unpaid,
            }));
        Ok(reservation)
    }

    // ── Extend ──────────────────────────────────────────────────

    pub async fn extend(
        &self,
        caller: &Caller,
        id: &str,
        new_end_time: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let _guard = self.locks.lock(id).await;
        let mut reservation = self.load_owned(caller, id).await?;
        let new_total = reservation.extension_total(new_end_time)?;

        let blocking = self
            .repos
            .reservations()
            .find_live_for_spot(&reservation.spot_id)
            .await?
            .into_iter()
            .find(|other| {
                other.id != reservation.id && other.overlaps(reservation.end_time, new_end_time)
            });
        if let Some(other) = blocking {
            return Err(DomainError::InvalidExtension(format!(
                "spot {} is booked from {} by another reservation",
                reservation.spot_id, other.start_time
            )));
        }

        let increment = new_total - reservation.total_cost;
        let payment = if increment > 0 {
            Some(
                self.ledger
                    .process_payment(
                        &reservation.user_id,
                        PaymentRequest {
                            amount: increment,
                            payment_type: PaymentType::Parking,
                            reference: ChargeReference::Reservation(reservation.id.clone()),
                            description: format!(
                                "Extension of {} until {}",
                                reservation.id, new_end_time
                            ),
                        },
                    )
                    .await?,
            )
        } else {
            None
        };

        reservation.apply_extension(new_end_time, new_total, self.clock.now());
        if let Err(e) = self.repos.reservations().update(reservation.clone()).await {
            if let Some(payment) = payment {
                self.compensate_payment(&payment.id, "Extension could not be stored")
                    .await;
            }
            return Err(e);
        }

        info!(
            reservation_id = %reservation.id,
            end_time = %reservation.end_time,
            total_cost = reservation.total_cost,
            charged = increment,
            "Reservation extended"
        );
        record_outcome("extended");
        self.events
            .publish(Event::ReservationExtended(reservation_event(&reservation)));
        Ok(reservation)
    }

    // ── Cancel ──────────────────────────────────────────────────

    pub async fn cancel(&self, caller: &Caller, id: &str) -> DomainResult<Reservation> {
        let _guard = self.locks.lock(id).await;
        let reservation = self.load_owned(caller, id).await?;
        let percent = self.policy.refund_percent(&reservation, self.clock.now());
        let reservation = self
            .release(reservation, percent, "Reservation cancelled")
            .await?;
        record_outcome("cancelled");
        Ok(reservation)
    }

    /// Cancel, free the held spot and refund `percent`% of parking charges.
    async fn release(
        &self,
        mut reservation: Reservation,
        percent: u8,
        reason: &str,
    ) -> DomainResult<Reservation> {
        let held = reservation.status.held_spot_status();
        reservation.cancel(self.clock.now())?;

        let refunded = self
            .ledger
            .refund_share(&reservation.id, PaymentType::Parking, percent, reason)
            .await?;

        if let Err(e) = self.repos.reservations().update(reservation.clone()).await {
            error!(
                reservation_id = %reservation.id,
                refunded,
                error = %e,
                "Refund issued but cancellation could not be stored, a retry refunds only the remainder"
            );
            return Err(e);
        }
        if let Some(from) = held {
            self.move_spot(&reservation.spot_id, from, SpotStatus::Available)
                .await;
        }

        info!(
            reservation_id = %reservation.id,
            refund_percent = percent,
            refunded,
            "Reservation cancelled"
        );
        self.events
            .publish(Event::ReservationCancelled(ReservationCancelledEvent {
                reservation: reservation_event(&reservation),
                refunded,
            }));
        Ok(reservation)
    }

    /// Cancel confirmed reservations whose window ended without check-in.
    pub async fn sweep_no_shows(&self) -> DomainResult<usize> {
        let candidates = self
            .repos
            .reservations()
            .find_no_shows(self.clock.now())
            .await?;

        let mut cancelled = 0;
        for candidate in candidates {
            let _guard = self.locks.lock(&candidate.id).await;
            let Some(current) = self.repos.reservations().find_by_id(&candidate.id).await? else {
                continue;
            };
            if !current.is_no_show(self.clock.now()) {
                continue;
            }
            match self
                .release(current, self.policy.late_refund_percent, "No-show")
                .await
            {
                Ok(r) => {
                    info!(reservation_id = %r.id, "No-show reservation released");
                    record_outcome("no_show");
                    cancelled += 1;
                }
                Err(e) => warn!(reservation_id = %candidate.id, error = %e, "No-show release failed"),
            }
        }
        Ok(cancelled)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get(&self, caller: &Caller, id: &str) -> DomainResult<Reservation> {
        self.load_owned(caller, id).await
    }

    pub async fn list_for_caller(
        &self,
        caller: &Caller,
        status: Option<ReservationStatus>,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let statuses: Vec<ReservationStatus> = status.into_iter().collect();
        self.repos
            .reservations()
            .find_for_user(&caller.user_id, &statuses, page)
            .await
    }

    pub async fn active(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        self.repos
            .reservations()
            .find_for_user(&caller.user_id, &ReservationStatus::LIVE, page)
            .await
    }

    pub async fn history(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        self.repos
            .reservations()
            .find_for_user(&caller.user_id, &ReservationStatus::HISTORY, page)
            .await
    }

    pub async fn for_spot(
        &self,
        caller: &Caller,
        spot_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        caller.ensure_admin()?;
        self.load_spot(spot_id).await?;
        self.repos.reservations().find_for_spot(spot_id, page).await
    }
}

// ── Tests ──────────────────────────────────────────────────────
