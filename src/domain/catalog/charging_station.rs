//! Charging station catalog entry

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::parking_spot::validate_coordinates;
use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorType {
    Ccs,
    Chademo,
    Type2,
}

impl ConnectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ccs => "ccs",
            Self::Chademo => "chademo",
            Self::Type2 => "type2",
        }
    }
}

impl FromStr for ConnectorType {
    type Err = DomainError;

    /// Accepts the lowercase wire names and the usual spellings (`CCS`, `CHAdeMO`, `Type2`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ccs" => Ok(Self::Ccs),
            "chademo" => Ok(Self::Chademo),
            "type2" | "type_2" => Ok(Self::Type2),
            _ => Err(DomainError::InvalidInput(format!(
                "unknown connector type '{}'",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Available,
    /// Held by a charging session
    InUse,
    Maintenance,
    OutOfService,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Maintenance => "maintenance",
            Self::OutOfService => "out_of_service",
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self, Self::InUse)
    }

    pub fn is_operator_settable(&self) -> bool {
        !self.is_held()
    }
}

impl FromStr for StationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "in_use" => Ok(Self::InUse),
            "maintenance" => Ok(Self::Maintenance),
            "out_of_service" => Ok(Self::OutOfService),
            other => Err(DomainError::InvalidInput(format!(
                "unknown station status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ChargingStation {
    pub id: String,
    pub operator_id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub power_output_kw: f64,
    pub connector_type: ConnectorType,
    /// Price per kWh in cents
    pub price_per_kwh: i64,
    pub status: StationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChargingStation {
    pub fn is_available(&self) -> bool {
        self.status == StationStatus::Available
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("name must not be empty".into()));
        }
        if self.price_per_kwh <= 0 {
            return Err(DomainError::InvalidAmount(
                "price_per_kwh must be positive".into(),
            ));
        }
        if self.power_output_kw.is_nan() || self.power_output_kw <= 0.0 {
            return Err(DomainError::InvalidInput(
                "power_output_kw must be positive".into(),
            ));
        }
        validate_coordinates(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StationFilter {
    pub location: Option<String>,
    pub connector_type: Option<ConnectorType>,
    pub min_power_kw: Option<f64>,
    pub max_power_kw: Option<f64>,
    pub available_only: bool,
    pub operator_id: Option<String>,
}

impl StationFilter {
    pub fn matches(&self, station: &ChargingStation) -> bool {
        if let Some(ref needle) = self.location {
            let needle = needle.to_lowercase();
            if !station.location.to_lowercase().contains(&needle)
                && !station.name.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.connector_type.is_some_and(|c| c != station.connector_type) {
            return false;
        }
        if self.min_power_kw.is_some_and(|min| station.power_output_kw < min) {
            return false;
        }
        if self.max_power_kw.is_some_and(|max| station.power_output_kw > max) {
            return false;
        }
        if self.available_only && !station.is_available() {
            return false;
        }
        if let Some(ref op) = self.operator_id {
            if &station.operator_id != op {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn sample_station(id: &str, price_per_kwh: i64) -> ChargingStation {
        let now = Utc::now();
        ChargingStation {
            id: id.to_string(),
            operator_id: "op-1".into(),
            name: format!("Charger {}", id),
            location: "Mall Parking East".into(),
            latitude: 41.3,
            longitude: 69.2,
            power_output_kw: 50.0,
            connector_type: ConnectorType::Ccs,
            price_per_kwh,
            status: StationStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn connector_type_accepts_common_spellings() {
        assert_eq!("CCS".parse::<ConnectorType>().unwrap(), ConnectorType::Ccs);
        assert_eq!(
            "CHAdeMO".parse::<ConnectorType>().unwrap(),
            ConnectorType::Chademo
        );
        assert_eq!("Type2".parse::<ConnectorType>().unwrap(), ConnectorType::Type2);
        assert!("tesla".parse::<ConnectorType>().is_err());
    }

    #[test]
    fn in_use_cannot_be_set_by_operator() {
        assert!(!StationStatus::InUse.is_operator_settable());
        assert!(StationStatus::Maintenance.is_operator_settable());
    }

    #[test]
    fn validate_rejects_zero_power() {
        let mut s = sample_station("C1", 40);
        s.power_output_kw = 0.0;
        assert!(s.validate().is_err());
        s.power_output_kw = 22.0;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn filter_by_power_range_and_connector() {
        let s = sample_station("C1", 40);
        let f = StationFilter {
            min_power_kw: Some(22.0),
            max_power_kw: Some(150.0),
            connector_type: Some(ConnectorType::Ccs),
            ..Default::default()
        };
        assert!(f.matches(&s));

        let f = StationFilter {
            min_power_kw: Some(100.0),
            ..Default::default()
        };
        assert!(!f.matches(&s));
    }
}
