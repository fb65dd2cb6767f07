//! Domain layer: entities, status machines and repository interfaces.

pub mod anchor;
pub mod catalog;
pub mod charging_session;
pub mod events;
pub mod repositories;
pub mod reservation;
pub mod user;
pub mod wallet;

pub use anchor::LedgerAnchor;
pub use catalog::{
    ChargingStation, ConnectorType, ParkingSpot, SpotFilter, SpotStatus, SpotType,
    StationFilter, StationStatus,
};
pub use charging_session::{ChargingSession, SessionStatus};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{Reservation, ReservationStatus};
pub use user::{User, UserRole};
pub use wallet::{
    ChargeReference, LedgerTransaction, Payment, PaymentStatus, PaymentType, TransactionStatus,
    TransactionType, WalletInfo,
};

pub use crate::shared::errors::DomainError;
