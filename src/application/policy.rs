//! Lifecycle policy knobs (`[policy]` config section)
//!
//! Everything here is pure: given a reservation and a timestamp, decide
//! what to charge or refund. Services apply the outcome to the ledger.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Reservation, ReservationStatus};
use crate::shared::money::parking_cost;

/// How check-out settles the difference between booked and actual stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutSettlement {
    /// The booked total is final.
    BookedOnly,
    /// Stays past `end_time` are charged per started hour.
    #[default]
    OvertimeOnly,
    /// Recompute over the actual stay and charge or refund the difference.
    Actual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
    pub check_in_grace_minutes: i64,
    pub checkout_settlement: CheckoutSettlement,
    pub full_refund_before_minutes: i64,
    pub partial_refund_percent: u8,
    pub late_refund_percent: u8,
    pub bill_partial_on_cancel: bool,
    /// Minimum wallet balance (cents) to start charging; 0 disables the check
    pub min_start_balance: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            check_in_grace_minutes: 15,
            checkout_settlement: CheckoutSettlement::OvertimeOnly,
            full_refund_before_minutes: 60,
            partial_refund_percent: 50,
            late_refund_percent: 0,
            bill_partial_on_cancel: true,
            min_start_balance: 0,
        }
    }
}

/// Outcome of settling a check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    None,
    Charge(i64),
    Refund(i64),
}

impl LifecyclePolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.check_in_grace_minutes < 0 {
            return Err("policy.check_in_grace_minutes must not be negative".into());
        }
        if self.full_refund_before_minutes < 0 {
            return Err("policy.full_refund_before_minutes must not be negative".into());
        }
        if self.partial_refund_percent > 100 || self.late_refund_percent > 100 {
            return Err("policy refund percentages must be between 0 and 100".into());
        }
        if self.min_start_balance < 0 {
            return Err("policy.min_start_balance must not be negative".into());
        }
        Ok(())
    }

    pub fn check_in_grace(&self) -> Duration {
        Duration::minutes(self.check_in_grace_minutes)
    }

    /// Percentage of charged amounts refunded when cancelling at `now`.
    pub fn refund_percent(&self, reservation: &Reservation, now: DateTime<Utc>) -> u8 {
        if reservation.status == ReservationStatus::Active || now >= reservation.start_time {
            return self.late_refund_percent;
        }
        if reservation.start_time - now >= Duration::minutes(self.full_refund_before_minutes) {
            100
        } else {
            self.partial_refund_percent
        }
    }

    /// Amount owed for staying past `end_time`, per started hour.
    pub fn overtime_charge(reservation: &Reservation, checked_out_at: DateTime<Utc>) -> i64 {
        let extra_secs = (checked_out_at - reservation.end_time).num_seconds();
        if extra_secs <= 0 {
            return 0;
        }
        let started_hours = (extra_secs + 3599) / 3600;
        started_hours * reservation.price_per_hour
    }

    /// Settle a check-out at `checked_out_at` for a reservation that was
    /// checked in.
    pub fn settle_checkout(
        &self,
        reservation: &Reservation,
        checked_out_at: DateTime<Utc>,
    ) -> Settlement {
        match self.checkout_settlement {
            CheckoutSettlement::BookedOnly => Settlement::None,
            CheckoutSettlement::OvertimeOnly => {
                match Self::overtime_charge(reservation, checked_out_at) {
                    0 => Settlement::None,
                    owed => Settlement::Charge(owed),
                }
            }
            CheckoutSettlement::Actual => {
                let checked_in_at = reservation
                    .actual_check_in
                    .unwrap_or(reservation.start_time);
                let stayed = (checked_out_at - checked_in_at).num_seconds().max(0);
                let actual = parking_cost(reservation.price_per_hour, stayed);
                let diff = actual - reservation.total_cost;
                if diff > 0 {
                    Settlement::Charge(diff)
                } else if diff < 0 {
                    Settlement::Refund(-diff)
                } else {
                    Settlement::None
                }
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::parking_spot::tests::sample_spot;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    fn confirmed() -> Reservation {
        let spot = sample_spot("S1", 500);
        let mut r = Reservation::new(&spot, "u1", at(10, 0), at(12, 0), at(8, 0)).unwrap();
        r.confirm("p1", "qr", at(8, 0)).unwrap();
        r
    }

    #[test]
    fn refund_tiers() {
        let policy = LifecyclePolicy::default();
        let r = confirmed();
        assert_eq!(policy.refund_percent(&r, at(8, 0)), 100);
        assert_eq!(policy.refund_percent(&r, at(9, 0)), 100);
        assert_eq!(policy.refund_percent(&r, at(9, 30)), 50);
        assert_eq!(policy.refund_percent(&r, at(10, 0)), 0);
    }

    #[test]
    fn active_booking_gets_late_percent() {
        let policy = LifecyclePolicy {
            late_refund_percent: 10,
            ..Default::default()
        };
        let mut r = confirmed();
        r.check_in(at(9, 50), policy.check_in_grace()).unwrap();
        assert_eq!(policy.refund_percent(&r, at(9, 55)), 10);
    }

    #[test]
    fn overtime_is_billed_per_started_hour() {
        let mut r = confirmed();
        r.check_in(at(10, 0), Duration::zero()).unwrap();
        assert_eq!(LifecyclePolicy::overtime_charge(&r, at(11, 0)), 0);
        assert_eq!(LifecyclePolicy::overtime_charge(&r, at(12, 0)), 0);
        assert_eq!(LifecyclePolicy::overtime_charge(&r, at(12, 1)), 500);
        assert_eq!(LifecyclePolicy::overtime_charge(&r, at(13, 30)), 1000);
    }

    #[test]
    fn actual_settlement_charges_or_refunds_difference() {
        let policy = LifecyclePolicy {
            checkout_settlement: CheckoutSettlement::Actual,
            ..Default::default()
        };
        let mut r = confirmed();
        r.check_in(at(10, 0), Duration::zero()).unwrap();
        assert_eq!(policy.settle_checkout(&r, at(11, 0)), Settlement::Refund(500));
        assert_eq!(policy.settle_checkout(&r, at(12, 0)), Settlement::None);
        assert_eq!(policy.settle_checkout(&r, at(12, 30)), Settlement::Charge(250));
    }

    #[test]
    fn booked_only_never_settles() {
        let policy = LifecyclePolicy {
            checkout_settlement: CheckoutSettlement::BookedOnly,
            ..Default::default()
        };
        let mut r = confirmed();
        r.check_in(at(10, 0), Duration::zero()).unwrap();
        assert_eq!(policy.settle_checkout(&r, at(15, 0)), Settlement::None);
    }

    #[test]
    fn validate_rejects_bad_percent() {
        let policy = LifecyclePolicy {
            partial_refund_percent: 120,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
        assert!(LifecyclePolicy::default().validate().is_ok());
    }

    #[test]
    fn settlement_mode_parses_snake_case() {
        let parsed: LifecyclePolicy =
            toml::from_str("checkout_settlement = \"actual\"\nlate_refund_percent = 5").unwrap();
        assert_eq!(parsed.checkout_settlement, CheckoutSettlement::Actual);
        assert_eq!(parsed.late_refund_percent, 5);
        assert_eq!(parsed.check_in_grace_minutes, 15);
    }
}
