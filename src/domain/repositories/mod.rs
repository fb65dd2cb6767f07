//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `DomainResult`: standard result type for domain operations

use super::catalog::{ChargingStationRepository, ParkingSpotRepository};
use super::charging_session::ChargingSessionRepository;
use super::reservation::ReservationRepository;
use super::user::UserRepository;
use super::wallet::WalletRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let spot = repos.parking_spots().find_by_id("S1").await?;
///     let wallet = repos.wallets().find_by_user("user-1").await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn wallets(&self) -> &dyn WalletRepository;
    fn parking_spots(&self) -> &dyn ParkingSpotRepository;
    fn charging_stations(&self) -> &dyn ChargingStationRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn charging_sessions(&self) -> &dyn ChargingSessionRepository;
}
