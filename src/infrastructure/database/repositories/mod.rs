//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod charging_session_repository;
pub mod charging_station_repository;
pub mod parking_spot_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod user_repository;
pub mod wallet_repository;

pub use repository_provider::SeaOrmRepositoryProvider;

use std::str::FromStr;

use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QuerySelect, Select,
};

use crate::domain::{DomainError, DomainResult, LedgerAnchor};
use crate::shared::PageRequest;

// ── Shared conversion helpers ───────────────────────────────────

fn db_err(e: DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Storage`.
fn insert_err(e: DbErr, conflict: impl FnOnce() -> String) -> DomainError {
    let text = e.to_string();
    if text.contains("UNIQUE") || text.contains("duplicate") {
        DomainError::Conflict(conflict())
    } else {
        db_err(e)
    }
}

/// Parse a status / type column; an unknown value means corrupted data.
fn parse_column<T>(column: &'static str, value: &str) -> DomainResult<T>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|_| DomainError::Storage(format!("invalid {} '{}' in database", column, value)))
}

type AnchorColumns = (Option<String>, Option<i64>, Option<String>);

fn anchor_columns(anchor: &Option<LedgerAnchor>) -> AnchorColumns {
    match anchor {
        Some(a) => (
            Some(a.blockchain_tx_hash.clone()),
            i64::try_from(a.block_number).ok(),
            Some(a.orgs_to_column()),
        ),
        None => (None, None, None),
    }
}

/// Count the query, then fetch one page of it.
async fn fetch_page<E, C>(
    db: &C,
    query: Select<E>,
    page: PageRequest,
) -> DomainResult<(Vec<E::Model>, u64)>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let total = query.clone().count(db).await.map_err(db_err)?;
    let models = query
        .offset(page.offset())
        .limit(page.limit as u64)
        .all(db)
        .await
        .map_err(db_err)?;
    Ok((models, total))
}
