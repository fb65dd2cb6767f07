//! Charging session aggregate

pub mod model;
pub mod repository;

pub use model::{ChargingSession, SessionStatus};
pub use repository::ChargingSessionRepository;
