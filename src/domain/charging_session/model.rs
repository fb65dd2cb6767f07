//! Charging session domain entity

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::anchor::LedgerAnchor;
use crate::domain::catalog::ChargingStation;
use crate::shared::money::energy_cost;
use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub const LIVE: [SessionStatus; 2] = [Self::Starting, Self::Active];
    pub const HISTORY: [SessionStatus; 2] = [Self::Completed, Self::Cancelled];
}

impl FromStr for SessionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(Self::Starting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown session status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ChargingSession {
    pub id: String,
    pub station_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    /// Energy delivered so far, watt-hours; never decreases
    pub energy_wh: i64,
    /// Station price at start, cents per kWh
    pub price_per_kwh: i64,
    /// Running cost checkpoint in cents
    pub current_cost: i64,
    /// Final billed amount, set when the session ends
    pub total_cost: Option<i64>,
    pub status: SessionStatus,
    pub payment_id: Option<String>,
    pub anchor: Option<LedgerAnchor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargingSession {
    pub fn start(station: &ChargingStation, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            station_id: station.id.clone(),
            user_id: user_id.into(),
            start_time: now,
            end_time: None,
            duration_minutes: 0,
            energy_wh: 0,
            price_per_kwh: station.price_per_kwh,
            current_cost: 0,
            total_cost: None,
            status: SessionStatus::Starting,
            payment_id: None,
            anchor: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn invalid_state(&self, operation: &'static str) -> DomainError {
        DomainError::InvalidState {
            entity: "ChargingSession",
            id: self.id.clone(),
            status: self.status.to_string(),
            operation,
        }
    }

    /// starting → active, once energy delivery begins.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != SessionStatus::Starting {
            return Err(self.invalid_state("activate"));
        }
        self.status = SessionStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    /// Running-total checkpoint. `current_cost` defaults to the metered cost.
    pub fn record_progress(
        &mut self,
        energy_wh: i64,
        current_cost: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != SessionStatus::Active {
            return Err(self.invalid_state("update"));
        }
        if energy_wh < 0 {
            return Err(DomainError::InvalidInput(
                "energy consumed must not be negative".into(),
            ));
        }
        if energy_wh < self.energy_wh {
            return Err(DomainError::InvalidInput(format!(
                "energy consumed must not decrease ({} Wh < {} Wh)",
                energy_wh, self.energy_wh
            )));
        }
        let cost = current_cost.unwrap_or_else(|| energy_cost(self.price_per_kwh, energy_wh));
        if cost < 0 {
            return Err(DomainError::InvalidAmount(
                "current cost must not be negative".into(),
            ));
        }
        if cost < self.current_cost {
            return Err(DomainError::InvalidInput(format!(
                "current cost must not decrease ({} < {})",
                cost, self.current_cost
            )));
        }

        self.energy_wh = energy_wh;
        self.current_cost = cost;
        self.duration_minutes = (now - self.start_time).num_minutes().max(0);
        self.updated_at = now;
        Ok(())
    }

    /// Amount owed for what has been delivered: metered energy when known,
    /// otherwise the last reported running cost.
    pub fn metered_cost(&self) -> i64 {
        if self.energy_wh > 0 {
            energy_cost(self.price_per_kwh, self.energy_wh)
        } else {
            self.current_cost
        }
    }

    /// Check that `stop` is allowed without mutating.
    pub fn ensure_stoppable(&self) -> Result<(), DomainError> {
        if self.status != SessionStatus::Active {
            return Err(self.invalid_state("stop"));
        }
        Ok(())
    }

    pub fn ensure_cancellable(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(self.invalid_state("cancel"));
        }
        Ok(())
    }

    /// active → completed with the billed total.
    pub fn complete(
        &mut self,
        total_cost: i64,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_stoppable()?;
        self.finish(SessionStatus::Completed, total_cost, payment_id, now);
        Ok(())
    }

    /// starting/active → cancelled; `billed` is what was charged (may be 0).
    pub fn cancel(
        &mut self,
        billed: i64,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_cancellable()?;
        self.finish(SessionStatus::Cancelled, billed, payment_id, now);
        Ok(())
    }

    fn finish(
        &mut self,
        status: SessionStatus,
        total_cost: i64,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.end_time = Some(now);
        self.duration_minutes = (now - self.start_time).num_minutes().max(0);
        self.total_cost = Some(total_cost);
        if payment_id.is_some() {
            self.payment_id = payment_id;
        }
        self.updated_at = now;
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::charging_station::tests::sample_station;
    use chrono::Duration;

    fn active_session() -> ChargingSession {
        let station = sample_station("C1", 40);
        let now = Utc::now();
        let mut s = ChargingSession::start(&station, "u1", now);
        s.activate(now).unwrap();
        s
    }

    #[test]
    fn starts_with_price_snapshot() {
        let station = sample_station("C1", 40);
        let s = ChargingSession::start(&station, "u1", Utc::now());
        assert_eq!(s.status, SessionStatus::Starting);
        assert_eq!(s.price_per_kwh, 40);
        assert_eq!(s.energy_wh, 0);
    }

    #[test]
    fn progress_is_monotonic() {
        let mut s = active_session();
        let t = s.start_time + Duration::minutes(10);
        s.record_progress(5_000, None, t).unwrap();
        assert_eq!(s.current_cost, 200);
        assert_eq!(s.duration_minutes, 10);

        let err = s.record_progress(4_000, None, t).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(s.energy_wh, 5_000);
    }

    #[test]
    fn reported_cost_must_not_decrease() {
        let mut s = active_session();
        s.record_progress(1_000, Some(100), Utc::now()).unwrap();
        assert!(s.record_progress(2_000, Some(50), Utc::now()).is_err());
        assert!(s.record_progress(2_000, Some(-1), Utc::now()).is_err());
    }

    #[test]
    fn update_requires_active() {
        let station = sample_station("C1", 40);
        let mut s = ChargingSession::start(&station, "u1", Utc::now());
        let err = s.record_progress(100, None, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[test]
    fn metered_cost_prefers_energy() {
        let mut s = active_session();
        s.record_progress(0, Some(75), Utc::now()).unwrap();
        assert_eq!(s.metered_cost(), 75);
        s.record_progress(10_000, Some(75), Utc::now()).unwrap();
        assert_eq!(s.metered_cost(), 400);
    }

    #[test]
    fn complete_sets_total_and_end() {
        let mut s = active_session();
        s.record_progress(10_000, None, Utc::now()).unwrap();
        let now = Utc::now();
        s.complete(400, Some("p1".into()), now).unwrap();
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.total_cost, Some(400));
        assert_eq!(s.end_time, Some(now));
        assert!(s.complete(400, None, now).is_err());
    }

    #[test]
    fn cancel_from_starting() {
        let station = sample_station("C1", 40);
        let mut s = ChargingSession::start(&station, "u1", Utc::now());
        s.cancel(0, None, Utc::now()).unwrap();
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert!(s.cancel(0, None, Utc::now()).is_err());
    }
}
