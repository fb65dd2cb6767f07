//! Charging session repository interface

use async_trait::async_trait;

use super::model::{ChargingSession, SessionStatus};
use crate::domain::DomainResult;
use crate::shared::{PageRequest, PaginatedResult};

#[async_trait]
pub trait ChargingSessionRepository: Send + Sync {
    async fn save(&self, session: ChargingSession) -> DomainResult<()>;

    async fn update(&self, session: ChargingSession) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargingSession>>;

    /// Sessions of a user, newest first. Empty `statuses` means any.
    async fn find_for_user(
        &self,
        user_id: &str,
        statuses: &[SessionStatus],
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>>;

    async fn find_for_station(
        &self,
        station_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>>;

    /// Sum of `energy_wh` over the user's completed sessions.
    async fn total_energy_for_user(&self, user_id: &str) -> DomainResult<i64>;
}
