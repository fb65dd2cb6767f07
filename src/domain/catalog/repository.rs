//! Catalog repository interfaces
//!
//! `update` persists descriptive fields only. Status moves exclusively
//! through `transition_status`, an atomic compare-and-set, so a concurrent
//! edit can never clobber a status flipped by a lifecycle.

use async_trait::async_trait;

use super::charging_station::{ChargingStation, StationFilter, StationStatus};
use super::parking_spot::{ParkingSpot, SpotFilter, SpotStatus};
use crate::domain::DomainResult;
use crate::shared::{PageRequest, PaginatedResult};

#[async_trait]
pub trait ParkingSpotRepository: Send + Sync {
    async fn save(&self, spot: ParkingSpot) -> DomainResult<()>;

    async fn update(&self, spot: ParkingSpot) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingSpot>>;

    async fn search(
        &self,
        filter: &SpotFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ParkingSpot>>;

    async fn delete(&self, id: &str) -> DomainResult<()>;

    /// Set status to `to` only if it currently is `from`.
    /// Returns `false` when the spot was not in `from` (or does not exist).
    async fn transition_status(
        &self,
        id: &str,
        from: SpotStatus,
        to: SpotStatus,
    ) -> DomainResult<bool>;
}

#[async_trait]
pub trait ChargingStationRepository: Send + Sync {
    async fn save(&self, station: ChargingStation) -> DomainResult<()>;

    async fn update(&self, station: ChargingStation) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargingStation>>;

    async fn search(
        &self,
        filter: &StationFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingStation>>;

    async fn delete(&self, id: &str) -> DomainResult<()>;

    async fn transition_status(
        &self,
        id: &str,
        from: StationStatus,
        to: StationStatus,
    ) -> DomainResult<bool>;
}
