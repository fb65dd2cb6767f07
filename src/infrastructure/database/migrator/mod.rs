//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_users;
mod m20250101_000002_create_wallets;
mod m20250101_000003_create_ledger_transactions;
mod m20250101_000004_create_payments;
mod m20250101_000005_create_parking_spots;
mod m20250101_000006_create_charging_stations;
mod m20250101_000007_create_reservations;
mod m20250101_000008_create_charging_sessions;
mod m20250101_000009_add_user_profile;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_users::Migration),
            Box::new(m20250101_000002_create_wallets::Migration),
            Box::new(m20250101_000003_create_ledger_transactions::Migration),
            Box::new(m20250101_000004_create_payments::Migration),
            Box::new(m20250101_000005_create_parking_spots::Migration),
            Box::new(m20250101_000006_create_charging_stations::Migration),
            Box::new(m20250101_000007_create_reservations::Migration),
            Box::new(m20250101_000008_create_charging_sessions::Migration),
            Box::new(m20250101_000009_add_user_profile::Migration),
        ]
    }
}
