//! Spot and station catalog
//!
//! Reads are open to everyone. Writes are admin-only and never touch a
//! status held by a reservation or charging session.

use std::sync::Arc;

use tracing::info;

use crate::application::caller::Caller;
use crate::application::events::{Event, ResourceStatusEvent, SharedEventBus};
use crate::domain::{
    ChargingStation, ConnectorType, DomainError, DomainResult, ParkingSpot, RepositoryProvider,
    SpotFilter, SpotStatus, SpotType, StationFilter, StationStatus,
};
use crate::shared::{PageRequest, PaginatedResult, SharedClock};

/// Fields an operator supplies when adding a spot.
#[derive(Debug, Clone)]
pub struct NewSpot {
    pub operator_id: Option<String>,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub spot_type: SpotType,
    pub price_per_hour: i64,
    pub has_ev_charging: bool,
    pub features: Vec<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct SpotChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub spot_type: Option<SpotType>,
    pub price_per_hour: Option<i64>,
    pub has_ev_charging: Option<bool>,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewStation {
    pub operator_id: Option<String>,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub power_output_kw: f64,
    pub connector_type: ConnectorType,
    pub price_per_kwh: i64,
}

#[derive(Debug, Clone, Default)]
pub struct StationChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub power_output_kw: Option<f64>,
    pub connector_type: Option<ConnectorType>,
    pub price_per_kwh: Option<i64>,
}

pub struct CatalogService {
    repos: Arc<dyn RepositoryProvider>,
    events: SharedEventBus,
    clock: SharedClock,
}

impl CatalogService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, events: SharedEventBus, clock: SharedClock) -> Self {
        Self {
            repos,
            events,
            clock,
        }
    }

    // ── Parking spots ───────────────────────────────────────────

    pub async fn search_spots(
        &self,
        filter: &SpotFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ParkingSpot>> {
        self.repos.parking_spots().search(filter, page).await
    }

    pub async fn get_spot(&self, id: &str) -> DomainResult<ParkingSpot> {
        self.repos
            .parking_spots()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ParkingSpot", id))
    }

    pub async fn create_spot(&self, caller: &Caller, new: NewSpot) -> DomainResult<ParkingSpot> {
        caller.ensure_admin()?;
        let now = self.clock.now();
        let spot = ParkingSpot {
            id: uuid::Uuid::new_v4().to_string(),
            operator_id: new.operator_id.unwrap_or_else(|| caller.user_id.clone()),
            name: new.name,
            location: new.location,
            latitude: new.latitude,
            longitude: new.longitude,
            spot_type: new.spot_type,
            price_per_hour: new.price_per_hour,
            has_ev_charging: new.has_ev_charging,
            features: new.features,
            status: SpotStatus::Available,
            created_at: now,
            updated_at: now,
        };
        spot.validate()?;
        self.repos.parking_spots().save(spot.clone()).await?;
        info!(spot_id = %spot.id, name = %spot.name, "Parking spot created");
        Ok(spot)
    }

    pub async fn update_spot(
        &self,
        caller: &Caller,
        id: &str,
        changes: SpotChanges,
    ) -> DomainResult<ParkingSpot> {
        caller.ensure_admin()?;
        let mut spot = self.get_spot(id).await?;
        if let Some(name) = changes.name {
            spot.name = name;
        }
        if let Some(location) = changes.location {
            spot.location = location;
        }
        if let Some(latitude) = changes.latitude {
            spot.latitude = latitude;
        }
        if let Some(longitude) = changes.longitude {
            spot.longitude = longitude;
        }
        if let Some(spot_type) = changes.spot_type {
            spot.spot_type = spot_type;
        }
        if let Some(price) = changes.price_per_hour {
            spot.price_per_hour = price;
        }
        if let Some(ev) = changes.has_ev_charging {
            spot.has_ev_charging = ev;
        }
        if let Some(features) = changes.features {
            spot.features = features;
        }
        spot.updated_at = self.clock.now();
        spot.validate()?;

        self.repos.parking_spots().update(spot.clone()).await?;
        // status may have moved since the read; serve the stored one
        self.get_spot(id).await
    }

    pub async fn set_spot_status(
        &self,
        caller: &Caller,
        id: &str,
        status: SpotStatus,
    ) -> DomainResult<ParkingSpot> {
        caller.ensure_admin()?;
        if !status.is_operator_settable() {
            return Err(DomainError::InvalidInput(format!(
                "status '{}' is set by reservations only",
                status
            )));
        }
        let spot = self.get_spot(id).await?;
        if spot.status.is_held() {
            return Err(DomainError::SpotUnavailable {
                spot_id: spot.id,
                status: spot.status.to_string(),
            });
        }
        if spot.status == status {
            return Ok(spot);
        }
        if !self
            .repos
            .parking_spots()
            .transition_status(id, spot.status, status)
            .await?
        {
            return Err(DomainError::Conflict(format!(
                "parking spot {} changed status concurrently",
                id
            )));
        }

        info!(spot_id = %id, from = %spot.status, to = %status, "Parking spot status changed");
        self.events
            .publish(Event::SpotStatusChanged(ResourceStatusEvent {
                resource_id: id.to_string(),
                old_status: spot.status.to_string(),
                new_status: status.to_string(),
                timestamp: self.clock.now(),
            }));
        self.get_spot(id).await
    }

    pub async fn delete_spot(&self, caller: &Caller, id: &str) -> DomainResult<()> {
        caller.ensure_admin()?;
        let spot = self.get_spot(id).await?;
        if spot.status.is_held() {
            return Err(DomainError::SpotUnavailable {
                spot_id: spot.id,
                status: spot.status.to_string(),
            });
        }
        if !self
            .repos
            .reservations()
            .find_live_for_spot(id)
            .await?
            .is_empty()
        {
            return Err(DomainError::Conflict(format!(
                "parking spot {} has a live reservation",
                id
            )));
        }
        self.repos.parking_spots().delete(id).await?;
        info!(spot_id = %id, "Parking spot deleted");
        Ok(())
    }

    // ── Charging stations ───────────────────────────────────────

    pub async fn search_stations(
        &self,
        filter: &StationFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingStation>> {
        self.repos.charging_stations().search(filter, page).await
    }

    pub async fn get_station(&self, id: &str) -> DomainResult<ChargingStation> {
        self.repos
            .charging_stations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingStation", id))
    }

    pub async fn create_station(
        &self,
        caller: &Caller,
        new: NewStation,
    ) -> DomainResult<ChargingStation> {
        caller.ensure_admin()?;
        let now = self.clock.now();
        let station = ChargingStation {
            id: uuid::Uuid::new_v4().to_string(),
            operator_id: new.operator_id.unwrap_or_else(|| caller.user_id.clone()),
            name: new.name,
            location: new.location,
            latitude: new.latitude,
            longitude: new.longitude,
            power_output_kw: new.power_output_kw,
            connector_type: new.connector_type,
            price_per_kwh: new.price_per_kwh,
            status: StationStatus::Available,
            created_at: now,
            updated_at: now,
        };
        station.validate()?;
        self.repos.charging_stations().save(station.clone()).await?;
        info!(station_id = %station.id, name = %station.name, "Charging station created");
        Ok(station)
    }

    pub async fn update_station(
        &self,
        caller: &Caller,
        id: &str,
        changes: StationChanges,
    ) -> DomainResult<ChargingStation> {
        caller.ensure_admin()?;
        let mut station = self.get_station(id).await?;
        if let Some(name) = changes.name {
            station.name = name;
        }
        if let Some(location) = changes.location {
            station.location = location;
        }
        if let Some(latitude) = changes.latitude {
            station.latitude = latitude;
        }
        if let Some(longitude) = changes.longitude {
            station.longitude = longitude;
        }
        if let Some(power) = changes.power_output_kw {
            station.power_output_kw = power;
        }
        if let Some(connector) = changes.connector_type {
            station.connector_type = connector;
        }
        if let Some(price) = changes.price_per_kwh {
            station.price_per_kwh = price;
        }
        station.updated_at = self.clock.now();
        station.validate()?;

        self.repos.charging_stations().update(station).await?;
        self.get_station(id).await
    }

    pub async fn set_station_status(
        &self,
        caller: &Caller,
        id: &str,
        status: StationStatus,
    ) -> DomainResult<ChargingStation> {
        caller.ensure_admin()?;
        if !status.is_operator_settable() {
            return Err(DomainError::InvalidInput(format!(
                "status '{}' is set by charging sessions only",
                status
            )));
        }
        let station = self.get_station(id).await?;
        if station.status.is_held() {
            return Err(DomainError::StationUnavailable {
                station_id: station.id,
                status: station.status.to_string(),
            });
        }
        if station.status == status {
            return Ok(station);
        }
        if !self
            .repos
            .charging_stations()
            .transition_status(id, station.status, status)
            .await?
        {
            return Err(DomainError::Conflict(format!(
                "charging station {} changed status concurrently",
                id
            )));
        }

        info!(station_id = %id, from = %station.status, to = %status, "Charging station status changed");
        self.events
            .publish(Event::StationStatusChanged(ResourceStatusEvent {
                resource_id: id.to_string(),
                old_status: station.status.to_string(),
                new_status: status.to_string(),
                timestamp: self.clock.now(),
            }));
        self.get_station(id).await
    }

    pub async fn delete_station(&self, caller: &Caller, id: &str) -> DomainResult<()> {
        caller.ensure_admin()?;
        let station = self.get_station(id).await?;
        if station.status.is_held() {
            return Err(DomainError::StationUnavailable {
                station_id: station.id,
                status: station.status.to_string(),
            });
        }
        self.repos.charging_stations().delete(id).await?;
        info!(station_id = %id, "Charging station deleted");
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{at, Harness};

    fn new_spot(price: i64) -> NewSpot {
        NewSpot {
            operator_id: None,
            name: "Level 2 / A7".into(),
            location: "Central Garage".into(),
            latitude: 41.31,
            longitude: 69.24,
            spot_type: SpotType::Standard,
            price_per_hour: price,
            has_ev_charging: false,
            features: vec!["covered".into()],
        }
    }

    #[tokio::test]
    async fn admin_creates_and_users_search() {
        let h = Harness::new().await;
        let admin = Caller::admin("admin");
        let spot = h.catalog.create_spot(&admin, new_spot(300)).await.unwrap();
        assert_eq!(spot.status, SpotStatus::Available);
        assert_eq!(spot.operator_id, "admin");

        let err = h
            .catalog
            .create_spot(&Caller::user("u1"), new_spot(300))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let found = h
            .catalog
            .search_spots(
                &SpotFilter {
                    location: Some("central".into()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(found.total, 1);
    }

    #[tokio::test]
    async fn invalid_price_is_rejected() {
        let h = Harness::new().await;
        let err = h
            .catalog
            .create_spot(&Caller::admin("admin"), new_spot(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn update_keeps_lifecycle_status() {
        let h = Harness::new().await;
        h.add_spot("S1", 500).await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        h.reservations
            .create(&Caller::user("u1"), "S1", at(10, 0), at(11, 0))
            .await
            .unwrap();

        let updated = h
            .catalog
            .update_spot(
                &Caller::admin("admin"),
                "S1",
                SpotChanges {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.status, SpotStatus::Reserved);
    }

    #[tokio::test]
    async fn held_spot_cannot_be_moved_or_deleted() {
        let h = Harness::new().await;
        h.add_spot("S1", 500).await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        h.reservations
            .create(&Caller::user("u1"), "S1", at(10, 0), at(11, 0))
            .await
            .unwrap();
        let admin = Caller::admin("admin");

        let err = h
            .catalog
            .set_spot_status(&admin, "S1", SpotStatus::Maintenance)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SpotUnavailable { .. }));
        let err = h.catalog.delete_spot(&admin, "S1").await.unwrap_err();
        assert!(matches!(err, DomainError::SpotUnavailable { .. }));
    }

    #[tokio::test]
    async fn lifecycle_statuses_are_not_operator_settable() {
        let h = Harness::new().await;
        h.add_spot("S1", 500).await;
        let err = h
            .catalog
            .set_spot_status(&Caller::admin("admin"), "S1", SpotStatus::Occupied)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn maintenance_round_trip_publishes_events() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        let mut sub = h.events.subscribe();
        let admin = Caller::admin("admin");

        let station = h
            .catalog
            .set_station_status(&admin, "C1", StationStatus::Maintenance)
            .await
            .unwrap();
        assert_eq!(station.status, StationStatus::Maintenance);
        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.event.event_type(), "station_status_changed");

        let err = h
            .charging
            .start(&Caller::user("u1"), "C1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StationUnavailable { .. }));

        h.catalog
            .set_station_status(&admin, "C1", StationStatus::Available)
            .await
            .unwrap();
        h.charging.start(&Caller::user("u1"), "C1").await.unwrap();
    }

    #[tokio::test]
    async fn station_in_use_cannot_be_deleted() {
        let h = Harness::new().await;
        h.add_station("C1", 40).await;
        h.charging.start(&Caller::user("u1"), "C1").await.unwrap();
        let err = h
            .catalog
            .delete_station(&Caller::admin("admin"), "C1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StationUnavailable { .. }));
    }

    #[tokio::test]
    async fn station_filters_apply() {
        let h = Harness::new().await;
        let admin = Caller::admin("admin");
        for (name, kw, connector) in [
            ("Fast", 150.0, ConnectorType::Ccs),
            ("Slow", 11.0, ConnectorType::Type2),
        ] {
            h.catalog
                .create_station(
                    &admin,
                    NewStation {
                        operator_id: None,
                        name: name.into(),
                        location: "Hub".into(),
                        latitude: 0.0,
                        longitude: 0.0,
                        power_output_kw: kw,
                        connector_type: connector,
                        price_per_kwh: 35,
                    },
                )
                .await
                .unwrap();
        }

        let fast = h
            .catalog
            .search_stations(
                &StationFilter {
                    min_power_kw: Some(50.0),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(fast.total, 1);
        assert_eq!(fast.items[0].name, "Fast");
    }
}
