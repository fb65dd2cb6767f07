//! Application services

pub mod catalog;
pub mod charging;
pub mod identity;
pub mod ledger;
pub mod no_show;
pub mod reservation;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{CatalogService, NewSpot, NewStation, SpotChanges, StationChanges};
pub use charging::ChargingService;
pub use identity::{
    ActivityEntry, ActivityKind, AdminSeed, AuthResult, IdentityService, UserChanges, UserProfile,
};
pub use ledger::{
    PaymentRequest, Receipt, ReconciliationReport, SpendingSummary, WalletLedger, WalletSettings,
};
pub use no_show::start_no_show_task;
pub use reservation::ReservationService;
