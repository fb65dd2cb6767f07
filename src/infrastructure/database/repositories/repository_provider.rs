//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::catalog::{ChargingStationRepository, ParkingSpotRepository};
use crate::domain::charging_session::ChargingSessionRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::user::UserRepository;
use crate::domain::wallet::WalletRepository;

use super::charging_session_repository::SeaOrmChargingSessionRepository;
use super::charging_station_repository::SeaOrmChargingStationRepository;
use super::parking_spot_repository::SeaOrmParkingSpotRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::user_repository::SeaOrmUserRepository;
use super::wallet_repository::SeaOrmWalletRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let spot = repos.parking_spots().find_by_id("S1").await?;
/// let live = repos.reservations().find_live_for_spot("S1").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    users: SeaOrmUserRepository,
    wallets: SeaOrmWalletRepository,
    parking_spots: SeaOrmParkingSpotRepository,
    charging_stations: SeaOrmChargingStationRepository,
    reservations: SeaOrmReservationRepository,
    charging_sessions: SeaOrmChargingSessionRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            wallets: SeaOrmWalletRepository::new(db.clone()),
            parking_spots: SeaOrmParkingSpotRepository::new(db.clone()),
            charging_stations: SeaOrmChargingStationRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            charging_sessions: SeaOrmChargingSessionRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn wallets(&self) -> &dyn WalletRepository {
        &self.wallets
    }

    fn parking_spots(&self) -> &dyn ParkingSpotRepository {
        &self.parking_spots
    }

    fn charging_stations(&self) -> &dyn ChargingStationRepository {
        &self.charging_stations
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn charging_sessions(&self) -> &dyn ChargingSessionRepository {
        &self.charging_sessions
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::catalog::charging_station::tests::sample_station;
    use crate::domain::catalog::parking_spot::tests::sample_spot;
    use crate::domain::wallet::{LedgerAppend, TransactionFilter};
    use crate::domain::{
        ChargingSession, DomainError, LedgerTransaction, Reservation, ReservationStatus,
        SpotFilter, SpotStatus, TransactionStatus, TransactionType, User, UserRole, WalletInfo,
    };
    use crate::infrastructure::database::{init_database, run_migrations, DatabaseConfig};
    use crate::shared::PageRequest;

    async fn provider() -> SeaOrmRepositoryProvider {
        let db = init_database(&DatabaseConfig::sqlite_memory()).await.unwrap();
        run_migrations(&db).await.unwrap();
        SeaOrmRepositoryProvider::new(db)
    }

    async fn user_with_wallet(repos: &SeaOrmRepositoryProvider, name: &str) -> WalletInfo {
        let user = User::new(
            name,
            format!("{}@example.com", name),
            "hash",
            UserRole::User,
            Utc::now(),
        );
        repos.users().create(user.clone()).await.unwrap();
        let wallet = WalletInfo::new(&user.id, "USD", Utc::now());
        repos.wallets().create(wallet.clone()).await.unwrap();
        wallet
    }

    fn deposit(wallet: &WalletInfo, amount: i64) -> LedgerAppend {
        let now = Utc::now();
        let transaction = LedgerTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_id: wallet.id.clone(),
            user_id: wallet.user_id.clone(),
            tx_type: TransactionType::Deposit,
            amount,
            balance_before: wallet.balance,
            balance_after: wallet.balance + amount,
            status: TransactionStatus::Confirmed,
            reservation_id: None,
            session_id: None,
            payment_id: None,
            description: "top-up".into(),
            anchor: None,
            created_at: now,
        };
        LedgerAppend {
            wallet: WalletInfo {
                balance: wallet.balance + amount,
                version: wallet.version + 1,
                updated_at: now,
                ..wallet.clone()
            },
            expected_version: wallet.version,
            transaction,
            payments: vec![],
        }
    }

    #[tokio::test]
    async fn ledger_append_checks_version() {
        let repos = provider().await;
        let wallet = user_with_wallet(&repos, "alice").await;

        repos.wallets().append(deposit(&wallet, 5000)).await.unwrap();

        // Stale read: same expected version again
        let err = repos.wallets().append(deposit(&wallet, 100)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let stored = repos.wallets().find_by_user(&wallet.user_id).await.unwrap().unwrap();
        assert_eq!(stored.balance, 5000);
        assert_eq!(stored.version, 1);

        let page = repos
            .wallets()
            .find_transactions(&wallet.id, &TransactionFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].is_consistent());
    }

    #[tokio::test]
    async fn duplicate_wallet_conflicts() {
        let repos = provider().await;
        let wallet = user_with_wallet(&repos, "bob").await;
        let again = WalletInfo::new(&wallet.user_id, "USD", Utc::now());
        let err = repos.wallets().create(again).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn spot_status_is_compare_and_set() {
        let repos = provider().await;
        repos.parking_spots().save(sample_spot("S1", 500)).await.unwrap();

        let spots = repos.parking_spots();
        assert!(spots
            .transition_status("S1", SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap());
        assert!(!spots
            .transition_status("S1", SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap());

        // Descriptive update leaves the held status alone
        let mut spot = spots.find_by_id("S1").await.unwrap().unwrap();
        spot.status = SpotStatus::Available;
        spot.name = "Renamed".into();
        spots.update(spot).await.unwrap();
        let spot = spots.find_by_id("S1").await.unwrap().unwrap();
        assert_eq!(spot.status, SpotStatus::Reserved);
        assert_eq!(spot.name, "Renamed");
        assert_eq!(spot.features, vec!["covered".to_string()]);
    }

    #[tokio::test]
    async fn spot_search_filters() {
        let repos = provider().await;
        repos.parking_spots().save(sample_spot("S1", 500)).await.unwrap();
        repos.parking_spots().save(sample_spot("S2", 900)).await.unwrap();

        let filter = SpotFilter {
            location: Some("downtown".into()),
            max_price: Some(600),
            ..Default::default()
        };
        let page = repos
            .parking_spots()
            .search(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "S1");
    }

    #[tokio::test]
    async fn reservation_queries() {
        let repos = provider().await;
        let spot = sample_spot("S1", 500);
        repos.parking_spots().save(spot.clone()).await.unwrap();

        let now = Utc::now();
        let mut overdue =
            Reservation::new(&spot, "u1", now - Duration::hours(3), now + Duration::hours(1), now - Duration::hours(4))
                .unwrap();
        overdue.status = ReservationStatus::Confirmed;
        overdue.end_time = now - Duration::hours(1);
        repos.reservations().save(overdue.clone()).await.unwrap();

        let mut done =
            Reservation::new(&spot, "u1", now, now + Duration::hours(1), now).unwrap();
        done.status = ReservationStatus::Completed;
        repos.reservations().save(done).await.unwrap();

        let no_shows = repos.reservations().find_no_shows(now).await.unwrap();
        assert_eq!(no_shows.len(), 1);
        assert_eq!(no_shows[0].id, overdue.id);

        let live = repos.reservations().find_live_for_spot("S1").await.unwrap();
        assert_eq!(live.len(), 1);

        let history = repos
            .reservations()
            .find_for_user("u1", &ReservationStatus::HISTORY, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(history.total, 1);

        let all = repos
            .reservations()
            .find_for_user("u1", &[], PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn energy_total_counts_completed_sessions() {
        let repos = provider().await;
        let station = sample_station("C1", 30);
        repos.charging_stations().save(station.clone()).await.unwrap();

        let mut done = ChargingSession::start(&station, "u1", Utc::now());
        done.status = crate::domain::SessionStatus::Completed;
        done.energy_wh = 12_500;
        repos.charging_sessions().save(done).await.unwrap();

        let mut live = ChargingSession::start(&station, "u1", Utc::now());
        live.energy_wh = 4_000;
        repos.charging_sessions().save(live).await.unwrap();

        let total = repos.charging_sessions().total_energy_for_user("u1").await.unwrap();
        assert_eq!(total, 12_500);
        assert_eq!(
            repos.charging_sessions().total_energy_for_user("u2").await.unwrap(),
            0
        );
    }
}
