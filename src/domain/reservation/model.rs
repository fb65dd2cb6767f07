//! Reservation domain entity
//!
//! Transitions are methods that validate the current status and either
//! mutate the reservation or return an error leaving it untouched.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::domain::anchor::LedgerAnchor;
use crate::domain::catalog::{ParkingSpot, SpotStatus};
use crate::shared::money::parking_cost;
use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Created, payment not yet settled
    Pending,
    /// Paid, waiting for check-in
    Confirmed,
    /// Checked in, vehicle on the spot
    Active,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Live reservations hold their spot.
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// Spot status a reservation in this state holds its spot in.
    pub fn held_spot_status(&self) -> Option<SpotStatus> {
        match self {
            Self::Pending | Self::Confirmed => Some(SpotStatus::Reserved),
            Self::Active => Some(SpotStatus::Occupied),
            Self::Completed | Self::Cancelled => None,
        }
    }

    pub const LIVE: [ReservationStatus; 3] = [Self::Pending, Self::Confirmed, Self::Active];
    pub const HISTORY: [ReservationStatus; 2] = [Self::Completed, Self::Cancelled];
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown reservation status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parking reservation
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: String,
    pub spot_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub actual_check_in: Option<DateTime<Utc>>,
    pub actual_check_out: Option<DateTime<Utc>>,
    /// Spot price at booking time, cents per hour
    pub price_per_hour: i64,
    /// Booked cost in cents, recomputed only on extension
    pub total_cost: i64,
    pub status: ReservationStatus,
    /// Check-in credential
    pub qr_code: Option<String>,
    /// Payment that settled the booking
    pub payment_id: Option<String>,
    pub anchor: Option<LedgerAnchor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booked cost of `[start, end)` at `price_per_hour`.
pub fn booked_cost(price_per_hour: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    parking_cost(price_per_hour, (end - start).num_seconds())
}

impl Reservation {
    /// Build a pending reservation for `spot`, validating the time range.
    pub fn new(
        spot: &ParkingSpot,
        user_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if end_time <= start_time {
            return Err(DomainError::InvalidTimeRange(format!(
                "end_time {} must be after start_time {}",
                end_time, start_time
            )));
        }
        if end_time <= now {
            return Err(DomainError::InvalidTimeRange(format!(
                "end_time {} is in the past",
                end_time
            )));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            spot_id: spot.id.clone(),
            user_id: user_id.into(),
            start_time,
            end_time,
            actual_check_in: None,
            actual_check_out: None,
            price_per_hour: spot.price_per_hour,
            total_cost: booked_cost(spot.price_per_hour, start_time, end_time),
            status: ReservationStatus::Pending,
            qr_code: None,
            payment_id: None,
            anchor: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn invalid_state(&self, operation: &'static str) -> DomainError {
        DomainError::InvalidState {
            entity: "Reservation",
            id: self.id.clone(),
            status: self.status.to_string(),
            operation,
        }
    }

    /// Payment settled: pending → confirmed.
    pub fn confirm(
        &mut self,
        payment_id: impl Into<String>,
        qr_code: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != ReservationStatus::Pending {
            return Err(self.invalid_state("confirm"));
        }
        self.payment_id = Some(payment_id.into());
        self.qr_code = Some(qr_code.into());
        self.status = ReservationStatus::Confirmed;
        self.updated_at = now;
        Ok(())
    }

    /// pending/confirmed → active, allowed from `start - grace` until `end`.
    pub fn check_in(&mut self, now: DateTime<Utc>, grace: Duration) -> Result<(), DomainError> {
        if !matches!(
            self.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(self.invalid_state("check in"));
        }
        let opens_at = self.start_time - grace;
        if now < opens_at {
            return Err(DomainError::InvalidTransition(format!(
                "reservation {} cannot be checked in before {}",
                self.id, opens_at
            )));
        }
        if now >= self.end_time {
            return Err(DomainError::InvalidTransition(format!(
                "reservation {} ended at {}",
                self.id, self.end_time
            )));
        }
        self.actual_check_in = Some(now);
        self.status = ReservationStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    /// active → completed.
    pub fn check_out(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != ReservationStatus::Active {
            return Err(self.invalid_state("check out"));
        }
        self.actual_check_out = Some(now);
        self.status = ReservationStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    /// New total for extending to `new_end`, without mutating.
    pub fn extension_total(&self, new_end: DateTime<Utc>) -> Result<i64, DomainError> {
        if !matches!(
            self.status,
            ReservationStatus::Confirmed | ReservationStatus::Active
        ) {
            return Err(self.invalid_state("extend"));
        }
        if new_end <= self.end_time {
            return Err(DomainError::InvalidExtension(format!(
                "new end {} must be after current end {}",
                new_end, self.end_time
            )));
        }
        Ok(booked_cost(self.price_per_hour, self.start_time, new_end))
    }

    pub fn apply_extension(&mut self, new_end: DateTime<Utc>, new_total: i64, now: DateTime<Utc>) {
        self.end_time = new_end;
        self.total_cost = new_total;
        self.updated_at = now;
    }

    /// pending/confirmed/active → cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(self.invalid_state("cancel"));
        }
        self.status = ReservationStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Whether `[start, end)` intersects this reservation's booked window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }

    /// Confirmed but never checked in, and the booked window is over.
    pub fn is_no_show(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Confirmed
            && self.actual_check_in.is_none()
            && self.end_time <= now
    }
}

// ── Tests ──────────────────────────────────────────────────────
