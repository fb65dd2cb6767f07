//! Money and energy arithmetic
//!
//! Domain amounts are integer minor units (cents) and energy is integer
//! watt-hours. `Decimal` only appears at the API boundary, where these
//! helpers convert exactly or reject the value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::errors::DomainError;

/// Divide with rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };
    rounded as i64
}

/// Cost of occupying a spot for `seconds` at `price_per_hour` cents.
pub fn parking_cost(price_per_hour: i64, seconds: i64) -> i64 {
    div_round(price_per_hour as i128 * seconds as i128, 3600)
}

/// Cost of `energy_wh` watt-hours at `price_per_kwh` cents.
pub fn energy_cost(price_per_kwh: i64, energy_wh: i64) -> i64 {
    div_round(price_per_kwh as i128 * energy_wh as i128, 1000)
}

/// `percent`% of `amount`, rounded to the cent.
pub fn percent_of(amount: i64, percent: u8) -> i64 {
    div_round(amount as i128 * percent as i128, 100)
}

/// Convert a major-unit decimal (e.g. `12.50`) into cents.
///
/// More than two fractional digits is rejected rather than rounded.
pub fn cents_from_decimal(value: Decimal) -> Result<i64, DomainError> {
    let normalized = value.normalize();
    if normalized.scale() > 2 {
        return Err(DomainError::InvalidAmount(format!(
            "{} has more than 2 decimal places",
            value
        )));
    }
    (normalized * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| DomainError::InvalidAmount(format!("{} is out of range", value)))
}

pub fn decimal_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Convert decimal kWh (up to Wh precision) into watt-hours.
pub fn wh_from_kwh(value: Decimal) -> Result<i64, DomainError> {
    let normalized = value.normalize();
    if normalized.scale() > 3 {
        return Err(DomainError::InvalidInput(format!(
            "energy {} kWh has more than 3 decimal places",
            value
        )));
    }
    (normalized * Decimal::ONE_THOUSAND)
        .to_i64()
        .ok_or_else(|| DomainError::InvalidInput(format!("energy {} kWh is out of range", value)))
}

pub fn kwh_from_wh(wh: i64) -> Decimal {
    Decimal::new(wh, 3)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parking_cost_two_hours_at_five_dollars() {
        assert_eq!(parking_cost(500, 2 * 3600), 1000);
    }

    #[test]
    fn parking_cost_rounds_partial_hours() {
        // 20 minutes at 1.00/h = 33.33 cents
        assert_eq!(parking_cost(100, 20 * 60), 33);
        // 50 minutes at 1.00/h = 83.33 cents
        assert_eq!(parking_cost(100, 50 * 60), 83);
        // 1 minute at 0.30/h = 0.5 cent, rounds up
        assert_eq!(parking_cost(30, 60), 1);
    }

    #[test]
    fn energy_cost_uses_watt_hours() {
        // 12.345 kWh at 0.40/kWh = 4.938 -> 4.94
        assert_eq!(energy_cost(40, 12_345), 494);
        assert_eq!(energy_cost(40, 0), 0);
    }

    #[test]
    fn percent_of_rounds_to_cent() {
        assert_eq!(percent_of(1000, 50), 500);
        assert_eq!(percent_of(1001, 50), 501);
        assert_eq!(percent_of(1000, 0), 0);
        assert_eq!(percent_of(999, 100), 999);
    }

    #[test]
    fn decimal_conversion_is_exact() {
        assert_eq!(cents_from_decimal(Decimal::from_str("10.00").unwrap()).unwrap(), 1000);
        assert_eq!(cents_from_decimal(Decimal::from_str("0.5").unwrap()).unwrap(), 50);
        assert_eq!(decimal_from_cents(1050), Decimal::from_str("10.50").unwrap());
    }

    #[test]
    fn decimal_with_sub_cent_precision_is_rejected() {
        let err = cents_from_decimal(Decimal::from_str("1.005").unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }

    #[test]
    fn kwh_round_trips_through_wh() {
        let wh = wh_from_kwh(Decimal::from_str("7.25").unwrap()).unwrap();
        assert_eq!(wh, 7250);
        assert_eq!(kwh_from_wh(wh), Decimal::from_str("7.250").unwrap());
        assert!(wh_from_kwh(Decimal::from_str("0.0001").unwrap()).is_err());
    }
}
