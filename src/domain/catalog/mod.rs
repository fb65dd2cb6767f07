//! Spot / station catalog aggregate

pub mod charging_station;
pub mod parking_spot;
pub mod repository;

pub use charging_station::{ChargingStation, ConnectorType, StationFilter, StationStatus};
pub use parking_spot::{ParkingSpot, SpotFilter, SpotStatus, SpotType};
pub use repository::{ChargingStationRepository, ParkingSpotRepository};
