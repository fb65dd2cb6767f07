//! # ParkCharge
//!
//! Parking reservations and EV charging sessions paid from a prepaid
//! wallet, with every money movement recorded in an append-only ledger.
//!
//! ## Architecture
//!
//! - **domain**: entities, status machines and repository traits
//! - **application**: lifecycle services, policy, event bus
//! - **infrastructure**: SeaORM and in-memory storage, crypto, ledger anchoring
//! - **interfaces**: REST API (`/api/v1`) and WebSocket notifications
//! - **server**: process lifecycle used by the CLI binary

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{init_database, DatabaseConfig};

pub use interfaces::http::{create_api_router, ApiContext};

pub use application::{create_event_bus, Event, EventBus, SharedEventBus};

pub use server::{init_tracing, ServerHandle, ServerOptions, Services};
