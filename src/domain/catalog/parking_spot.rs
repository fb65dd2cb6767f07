//! Parking spot catalog entry

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::shared::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotType {
    Standard,
    Premium,
    Disabled,
}

impl SpotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for SpotType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            "disabled" => Ok(Self::Disabled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown spot type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotStatus {
    Available,
    /// Held by a confirmed reservation
    Reserved,
    /// Held by a checked-in reservation
    Occupied,
    Maintenance,
    OutOfService,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
            Self::OutOfService => "out_of_service",
        }
    }

    /// Held by a reservation lifecycle; only lifecycle transitions may leave it.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Reserved | Self::Occupied)
    }

    /// Statuses an operator may set directly.
    pub fn is_operator_settable(&self) -> bool {
        matches!(self, Self::Available | Self::Maintenance | Self::OutOfService)
    }
}

impl FromStr for SpotStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "reserved" => Ok(Self::Reserved),
            "occupied" => Ok(Self::Occupied),
            "maintenance" => Ok(Self::Maintenance),
            "out_of_service" => Ok(Self::OutOfService),
            other => Err(DomainError::InvalidInput(format!(
                "unknown spot status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ParkingSpot {
    pub id: String,
    pub operator_id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub spot_type: SpotType,
    /// Price per hour in cents
    pub price_per_hour: i64,
    pub has_ev_charging: bool,
    pub features: Vec<String>,
    pub status: SpotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ParkingSpot {
    pub fn is_available(&self) -> bool {
        self.status == SpotStatus::Available
    }

    /// Check the operator-editable fields.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("name must not be empty".into()));
        }
        if self.price_per_hour <= 0 {
            return Err(DomainError::InvalidAmount(
                "price_per_hour must be positive".into(),
            ));
        }
        validate_coordinates(self.latitude, self.longitude)
    }
}

pub(crate) fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), DomainError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(DomainError::InvalidInput(format!(
            "coordinates ({}, {}) out of range",
            latitude, longitude
        )));
    }
    Ok(())
}

/// Search criteria for parking spots. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct SpotFilter {
    /// Case-insensitive substring of `location` or `name`
    pub location: Option<String>,
    pub spot_type: Option<SpotType>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub has_ev_charging: Option<bool>,
    pub available_only: bool,
    pub operator_id: Option<String>,
}

impl SpotFilter {
    pub fn matches(&self, spot: &ParkingSpot) -> bool {
        if let Some(ref needle) = self.location {
            let needle = needle.to_lowercase();
            if !spot.location.to_lowercase().contains(&needle)
                && !spot.name.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if self.spot_type.is_some_and(|t| t != spot.spot_type) {
            return false;
        }
        if self.min_price.is_some_and(|min| spot.price_per_hour < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| spot.price_per_hour > max) {
            return false;
        }
        if self.has_ev_charging.is_some_and(|ev| ev != spot.has_ev_charging) {
            return false;
        }
        if self.available_only && !spot.is_available() {
            return false;
        }
        if let Some(ref op) = self.operator_id {
            if &spot.operator_id != op {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn sample_spot(id: &str, price_per_hour: i64) -> ParkingSpot {
        let now = Utc::now();
        ParkingSpot {
            id: id.to_string(),
            operator_id: "op-1".into(),
            name: format!("Spot {}", id),
            location: "Downtown Garage, Level 2".into(),
            latitude: 41.31,
            longitude: 69.27,
            spot_type: SpotType::Standard,
            price_per_hour,
            has_ev_charging: false,
            features: vec!["covered".into()],
            status: SpotStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn held_statuses() {
        assert!(SpotStatus::Reserved.is_held());
        assert!(SpotStatus::Occupied.is_held());
        assert!(!SpotStatus::Maintenance.is_held());
        assert!(!SpotStatus::Reserved.is_operator_settable());
        assert!(SpotStatus::OutOfService.is_operator_settable());
    }

    #[test]
    fn validate_rejects_bad_price_and_coordinates() {
        let mut s = sample_spot("S1", 0);
        assert!(matches!(s.validate(), Err(DomainError::InvalidAmount(_))));
        s.price_per_hour = 500;
        s.latitude = 91.0;
        assert!(matches!(s.validate(), Err(DomainError::InvalidInput(_))));
        s.latitude = 41.0;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn filter_by_location_type_and_price() {
        let spot = sample_spot("S1", 500);
        let mut f = SpotFilter {
            location: Some("downtown".into()),
            ..Default::default()
        };
        assert!(f.matches(&spot));

        f.spot_type = Some(SpotType::Premium);
        assert!(!f.matches(&spot));

        f.spot_type = None;
        f.min_price = Some(100);
        f.max_price = Some(400);
        assert!(!f.matches(&spot));
        f.max_price = Some(500);
        assert!(f.matches(&spot));
    }

    #[test]
    fn available_only_skips_reserved() {
        let mut spot = sample_spot("S1", 500);
        spot.status = SpotStatus::Reserved;
        let f = SpotFilter {
            available_only: true,
            ..Default::default()
        };
        assert!(!f.matches(&spot));
    }

    #[test]
    fn status_parses() {
        for s in [
            SpotStatus::Available,
            SpotStatus::Reserved,
            SpotStatus::Occupied,
            SpotStatus::Maintenance,
            SpotStatus::OutOfService,
        ] {
            assert_eq!(s.as_str().parse::<SpotStatus>().unwrap(), s);
        }
        assert!("in_use".parse::<SpotStatus>().is_err());
    }
}
