//! Reservation DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::Reservation;
use crate::interfaces::http::common::AnchorDto;
use crate::shared::money::decimal_from_cents;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    #[validate(length(min = 1, message = "spot_id is required"))]
    pub spot_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CheckInRequest {
    /// Credential issued at confirmation; checked when present
    pub qr_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtendReservationRequest {
    pub new_end_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationListParams {
    /// pending, confirmed, active, completed, cancelled
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: String,
    pub spot_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_check_in: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_check_out: Option<DateTime<Utc>>,
    #[schema(example = "5.00")]
    pub price_per_hour: Decimal,
    #[schema(example = "10.00")]
    pub total_cost: Decimal,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(flatten)]
    pub anchor: Option<AnchorDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            status: r.status.to_string(),
            price_per_hour: decimal_from_cents(r.price_per_hour),
            total_cost: decimal_from_cents(r.total_cost),
            anchor: r.anchor.map(AnchorDto::from),
            id: r.id,
            spot_id: r.spot_id,
            user_id: r.user_id,
            start_time: r.start_time,
            end_time: r.end_time,
            actual_check_in: r.actual_check_in,
            actual_check_out: r.actual_check_out,
            qr_code: r.qr_code,
            payment_id: r.payment_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
