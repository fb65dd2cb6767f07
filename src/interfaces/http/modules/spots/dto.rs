//! Parking spot DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{NewSpot, SpotChanges};
use crate::domain::{DomainResult, ParkingSpot, SpotFilter};
use crate::interfaces::http::common::PaginationParams;
use crate::shared::money::{cents_from_decimal, decimal_from_cents};

#[derive(Debug, Serialize, ToSchema)]
pub struct SpotDto {
    pub id: String,
    pub operator_id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// standard, premium, disabled
    pub spot_type: String,
    #[schema(example = "5.00")]
    pub price_per_hour: Decimal,
    pub has_ev_charging: bool,
    pub features: Vec<String>,
    /// available, reserved, occupied, maintenance, out_of_service
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParkingSpot> for SpotDto {
    fn from(s: ParkingSpot) -> Self {
        Self {
            spot_type: s.spot_type.as_str().to_string(),
            status: s.status.as_str().to_string(),
            price_per_hour: decimal_from_cents(s.price_per_hour),
            id: s.id,
            operator_id: s.operator_id,
            name: s.name,
            location: s.location,
            latitude: s.latitude,
            longitude: s.longitude,
            has_ev_charging: s.has_ev_charging,
            features: s.features,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Search filters for `GET /parking/spots`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SpotSearchParams {
    /// Substring of the location or name
    pub location: Option<String>,
    pub spot_type: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub has_ev_charging: Option<bool>,
    #[serde(default)]
    pub available_only: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl SpotSearchParams {
    pub fn filter(&self) -> DomainResult<SpotFilter> {
        Ok(SpotFilter {
            location: self.location.clone().filter(|l| !l.trim().is_empty()),
            spot_type: self.spot_type.as_deref().map(str::parse).transpose()?,
            min_price: self.min_price.map(cents_from_decimal).transpose()?,
            max_price: self.max_price.map(cents_from_decimal).transpose()?,
            has_ev_charging: self.has_ev_charging,
            available_only: self.available_only,
            operator_id: None,
        })
    }

    pub fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSpotRequest {
    pub operator_id: Option<String>,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "location is required"))]
    pub location: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default = "default_spot_type")]
    pub spot_type: String,
    #[schema(example = "5.00")]
    pub price_per_hour: Decimal,
    #[serde(default)]
    pub has_ev_charging: bool,
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_spot_type() -> String {
    "standard".to_string()
}

impl CreateSpotRequest {
    pub fn into_new_spot(self) -> DomainResult<NewSpot> {
        Ok(NewSpot {
            spot_type: self.spot_type.parse()?,
            price_per_hour: cents_from_decimal(self.price_per_hour)?,
            operator_id: self.operator_id,
            name: self.name,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            has_ev_charging: self.has_ev_charging,
            features: self.features,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSpotRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub spot_type: Option<String>,
    pub price_per_hour: Option<Decimal>,
    pub has_ev_charging: Option<bool>,
    pub features: Option<Vec<String>>,
}

impl UpdateSpotRequest {
    pub fn into_changes(self) -> DomainResult<SpotChanges> {
        Ok(SpotChanges {
            spot_type: self.spot_type.as_deref().map(str::parse).transpose()?,
            price_per_hour: self.price_per_hour.map(cents_from_decimal).transpose()?,
            name: self.name,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            has_ev_charging: self.has_ev_charging,
            features: self.features,
        })
    }
}

/// Operator status change; only available, maintenance and out_of_service
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}
