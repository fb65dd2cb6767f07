//! Charging session DTOs
//!
//! Energy crosses the API in kWh and money in currency units; both are
//! converted to Wh and cents before reaching the service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{ChargingSession, DomainResult};
use crate::interfaces::http::common::AnchorDto;
use crate::shared::money::{cents_from_decimal, decimal_from_cents, kwh_from_wh, wh_from_kwh};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartSessionRequest {
    #[validate(length(min = 1, message = "station_id is required"))]
    pub station_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProgressRequest {
    /// Cumulative energy delivered, kWh
    #[schema(example = "12.5")]
    pub energy_consumed_kwh: Decimal,
    /// Running cost reported by the station
    pub current_cost: Option<Decimal>,
}

impl ProgressRequest {
    /// `(energy_wh, current_cost_cents)`
    pub fn to_units(&self) -> DomainResult<(i64, Option<i64>)> {
        Ok((
            wh_from_kwh(self.energy_consumed_kwh)?,
            self.current_cost.map(cents_from_decimal).transpose()?,
        ))
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionListParams {
    /// starting, active, completed, cancelled
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDto {
    pub id: String,
    pub station_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    #[schema(example = "12.500")]
    pub energy_consumed_kwh: Decimal,
    #[schema(example = "0.30")]
    pub price_per_kwh: Decimal,
    pub current_cost: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Decimal>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(flatten)]
    pub anchor: Option<AnchorDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChargingSession> for SessionDto {
    fn from(s: ChargingSession) -> Self {
        Self {
            status: s.status.to_string(),
            energy_consumed_kwh: kwh_from_wh(s.energy_wh),
            price_per_kwh: decimal_from_cents(s.price_per_kwh),
            current_cost: decimal_from_cents(s.current_cost),
            total_cost: s.total_cost.map(decimal_from_cents),
            anchor: s.anchor.map(AnchorDto::from),
            id: s.id,
            station_id: s.station_id,
            user_id: s.user_id,
            start_time: s.start_time,
            end_time: s.end_time,
            duration_minutes: s.duration_minutes,
            payment_id: s.payment_id,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnergyStatsDto {
    /// Energy over completed sessions
    #[schema(example = "42.250")]
    pub total_energy_kwh: Decimal,
}
