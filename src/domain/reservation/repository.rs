//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Reservation, ReservationStatus};
use crate::domain::DomainResult;
use crate::shared::{PageRequest, PaginatedResult};

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn save(&self, reservation: Reservation) -> DomainResult<()>;

    async fn update(&self, reservation: Reservation) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>>;

    /// Reservations of a user, newest first. Empty `statuses` means any.
    async fn find_for_user(
        &self,
        user_id: &str,
        statuses: &[ReservationStatus],
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>>;

    async fn find_for_spot(
        &self,
        spot_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>>;

    /// Pending / confirmed / active reservations on a spot.
    async fn find_live_for_spot(&self, spot_id: &str) -> DomainResult<Vec<Reservation>>;

    /// Confirmed reservations never checked in whose `end_time <= now`.
    async fn find_no_shows(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;
}
