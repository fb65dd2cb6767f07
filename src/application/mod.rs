//! Application layer: lifecycle orchestration over the domain.

pub mod caller;
pub mod events;
pub mod policy;
pub mod ports;
pub mod services;

pub use caller::Caller;
pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use policy::{CheckoutSettlement, LifecyclePolicy};
pub use services::{
    start_no_show_task, ActivityEntry, ActivityKind, AdminSeed, AuthResult, CatalogService,
    ChargingService, IdentityService, NewSpot, NewStation, PaymentRequest, Receipt,
    ReconciliationReport, ReservationService, SpendingSummary, SpotChanges, StationChanges,
    UserChanges, UserProfile, WalletLedger, WalletSettings,
};
