//! Database entities module

pub mod charging_session;
pub mod charging_station;
pub mod ledger_transaction;
pub mod parking_spot;
pub mod payment;
pub mod reservation;
pub mod user;
pub mod wallet;

pub use charging_session::Entity as ChargingSession;
pub use charging_station::Entity as ChargingStation;
pub use ledger_transaction::Entity as LedgerTransaction;
pub use parking_spot::Entity as ParkingSpot;
pub use payment::Entity as Payment;
pub use reservation::Entity as Reservation;
pub use user::Entity as User;
pub use wallet::Entity as Wallet;
