//! Charging station DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{NewStation, StationChanges};
use crate::domain::{ChargingStation, DomainResult, StationFilter};
use crate::interfaces::http::common::PaginationParams;
use crate::shared::money::{cents_from_decimal, decimal_from_cents};

#[derive(Debug, Serialize, ToSchema)]
pub struct StationDto {
    pub id: String,
    pub operator_id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub power_output_kw: f64,
    /// ccs, chademo, type2
    pub connector_type: String,
    #[schema(example = "0.30")]
    pub price_per_kwh: Decimal,
    /// available, in_use, maintenance, out_of_service
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChargingStation> for StationDto {
    fn from(s: ChargingStation) -> Self {
        Self {
            connector_type: s.connector_type.as_str().to_string(),
            status: s.status.as_str().to_string(),
            price_per_kwh: decimal_from_cents(s.price_per_kwh),
            id: s.id,
            operator_id: s.operator_id,
            name: s.name,
            location: s.location,
            latitude: s.latitude,
            longitude: s.longitude,
            power_output_kw: s.power_output_kw,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StationSearchParams {
    pub location: Option<String>,
    pub connector_type: Option<String>,
    pub min_power_kw: Option<f64>,
    pub max_power_kw: Option<f64>,
    #[serde(default)]
    pub available_only: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl StationSearchParams {
    pub fn filter(&self) -> DomainResult<StationFilter> {
        Ok(StationFilter {
            location: self.location.clone().filter(|l| !l.trim().is_empty()),
            connector_type: self.connector_type.as_deref().map(str::parse).transpose()?,
            min_power_kw: self.min_power_kw,
            max_power_kw: self.max_power_kw,
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
pub struct CreateStationRequest {
    pub operator_id: Option<String>,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "location is required"))]
    pub location: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(exclusive_min = 0.0, max = 1000.0, message = "power must be positive"))]
    pub power_output_kw: f64,
    pub connector_type: String,
    #[schema(example = "0.30")]
    pub price_per_kwh: Decimal,
}

impl CreateStationRequest {
    pub fn into_new_station(self) -> DomainResult<NewStation> {
        Ok(NewStation {
            connector_type: self.connector_type.parse()?,
            price_per_kwh: cents_from_decimal(self.price_per_kwh)?,
            operator_id: self.operator_id,
            name: self.name,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            power_output_kw: self.power_output_kw,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStationRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub power_output_kw: Option<f64>,
    pub connector_type: Option<String>,
    pub price_per_kwh: Option<Decimal>,
}

impl UpdateStationRequest {
    pub fn into_changes(self) -> DomainResult<StationChanges> {
        Ok(StationChanges {
            connector_type: self.connector_type.as_deref().map(str::parse).transpose()?,
            price_per_kwh: self.price_per_kwh.map(cents_from_decimal).transpose()?,
            name: self.name,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            power_output_kw: self.power_output_kw,
        })
    }
}
