//! Infrastructure layer - external concerns

pub mod anchor;
pub mod crypto;
pub mod database;
pub mod storage;

pub use anchor::{create_anchor_source, AnchorMode, DigestAnchor, LedgerConfig};
pub use database::{init_database, run_migrations, DatabaseConfig, SeaOrmRepositoryProvider};
pub use storage::InMemoryRepositoryProvider;
