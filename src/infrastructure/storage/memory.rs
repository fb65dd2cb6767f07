//! In-memory repository provider for development and testing
//!
//! Catalog, reservation and session tables are `DashMap`s; a shard write
//! lock makes `transition_status` an atomic compare-and-set. The ledger
//! (wallets, transactions, payments) sits behind one `RwLock` so an append
//! is all-or-nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::catalog::{
    ChargingStation, ChargingStationRepository, ParkingSpot, ParkingSpotRepository, SpotFilter,
    SpotStatus, StationFilter, StationStatus,
};
use crate::domain::charging_session::{ChargingSession, ChargingSessionRepository, SessionStatus};
use crate::domain::reservation::{Reservation, ReservationRepository, ReservationStatus};
use crate::domain::user::{User, UserRepository};
use crate::domain::wallet::{
    LedgerAppend, LedgerTransaction, Payment, TransactionFilter, WalletInfo, WalletRepository,
};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::{PageRequest, PaginatedResult};

fn poisoned<T>(_: T) -> DomainError {
    DomainError::Storage("in-memory lock poisoned".into())
}

/// Keyed rows plus an insertion sequence used as a stable ordering tiebreak.
struct Table<T> {
    rows: DashMap<String, (u64, T)>,
    seq: AtomicU64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    fn insert(&self, id: &str, value: T) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.rows.insert(id.to_string(), (seq, value));
    }

    fn get(&self, id: &str) -> Option<T> {
        self.rows.get(id).map(|r| r.value().1.clone())
    }

    fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Matching rows, newest insertion first.
    fn newest_first(&self, mut keep: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut rows: Vec<(u64, T)> = self
            .rows
            .iter()
            .filter(|r| keep(&r.value().1))
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        rows.into_iter().map(|(_, v)| v).collect()
    }

    fn oldest_first(&self, keep: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut rows = self.newest_first(keep);
        rows.reverse();
        rows
    }
}

#[derive(Default)]
struct LedgerState {
    wallets: HashMap<String, WalletInfo>,
    transactions: Vec<LedgerTransaction>,
    payments: Vec<Payment>,
}

/// In-memory implementation of every repository.
pub struct InMemoryRepositoryProvider {
    users: Table<User>,
    user_write: Mutex<()>,
    ledger: RwLock<LedgerState>,
    spots: Table<ParkingSpot>,
    stations: Table<ChargingStation>,
    reservations: Table<Reservation>,
    sessions: Table<ChargingSession>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            users: Table::new(),
            user_write: Mutex::new(()),
            ledger: RwLock::new(LedgerState::default()),
            spots: Table::new(),
            stations: Table::new(),
            reservations: Table::new(),
            sessions: Table::new(),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        self
    }
    fn wallets(&self) -> &dyn WalletRepository {
        self
    }
    fn parking_spots(&self) -> &dyn ParkingSpotRepository {
        self
    }
    fn charging_stations(&self) -> &dyn ChargingStationRepository {
        self
    }
    fn reservations(&self) -> &dyn ReservationRepository {
        self
    }
    fn charging_sessions(&self) -> &dyn ChargingSessionRepository {
        self
    }
}

// ── Users ──────────────────────────────────────────────────────

#[async_trait]
impl UserRepository for InMemoryRepositoryProvider {
    async fn create(&self, user: User) -> DomainResult<()> {
        let _guard = self.user_write.lock().map_err(poisoned)?;
        let taken = self
            .users
            .rows
            .iter()
            .any(|r| r.value().1.username == user.username || r.value().1.email == user.email);
        if taken {
            return Err(DomainError::Conflict(
                "username or email already exists".into(),
            ));
        }
        self.users.insert(&user.id.clone(), user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id))
    }

    async fn find_by_login(&self, login: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .rows
            .iter()
            .map(|r| r.value().1.clone())
            .find(|u| u.username == login || u.email == login))
    }

    async fn exists(&self, username: &str, email: &str) -> DomainResult<bool> {
        Ok(self
            .users
            .rows
            .iter()
            .any(|r| r.value().1.username == username || r.value().1.email == email))
    }

    async fn update(&self, user: User) -> DomainResult<()> {
        let mut row = self
            .users
            .rows
            .get_mut(&user.id)
            .ok_or_else(|| DomainError::not_found("User", user.id.clone()))?;
        let stored = &mut row.value_mut().1;
        stored.first_name = user.first_name;
        stored.last_name = user.last_name;
        stored.phone = user.phone;
        stored.is_active = user.is_active;
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> DomainResult<PaginatedResult<User>> {
        Ok(page.apply(self.users.oldest_first(|_| true)))
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        match self.users.rows.get_mut(id) {
            Some(mut row) => {
                row.value_mut().1.last_login_at = Some(at);
                Ok(())
            }
            None => Err(DomainError::not_found("User", id)),
        }
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.users.rows.remove(id);
        Ok(())
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.users.rows.len() as u64)
    }
}

// ── Wallet ledger ──────────────────────────────────────────────

#[async_trait]
impl WalletRepository for InMemoryRepositoryProvider {
    async fn create(&self, wallet: WalletInfo) -> DomainResult<()> {
        let mut ledger = self.ledger.write().map_err(poisoned)?;
        if ledger.wallets.values().any(|w| w.user_id == wallet.user_id) {
            return Err(DomainError::Conflict(format!(
                "user {} already has a wallet",
                wallet.user_id
            )));
        }
        ledger.wallets.insert(wallet.id.clone(), wallet);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<WalletInfo>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger.wallets.get(id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Option<WalletInfo>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger.wallets.values().find(|w| w.user_id == user_id).cloned())
    }

    async fn append(&self, entry: LedgerAppend) -> DomainResult<()> {
        let mut ledger = self.ledger.write().map_err(poisoned)?;

        let stored_version = ledger
            .wallets
            .get(&entry.wallet.id)
            .map(|w| w.version)
            .ok_or_else(|| DomainError::not_found("Wallet", entry.wallet.id.clone()))?;
        if stored_version != entry.expected_version {
            return Err(DomainError::Conflict(format!(
                "wallet {} version {} != expected {}",
                entry.wallet.id, stored_version, entry.expected_version
            )));
        }

        ledger.wallets.insert(entry.wallet.id.clone(), entry.wallet);
        ledger.transactions.push(entry.transaction);
        for payment in entry.payments {
            match ledger.payments.iter_mut().find(|p| p.id == payment.id) {
                Some(existing) => *existing = payment,
                None => ledger.payments.push(payment),
            }
        }
        Ok(())
    }

    async fn record_payment(&self, payment: Payment) -> DomainResult<()> {
        let mut ledger = self.ledger.write().map_err(poisoned)?;
        if ledger.payments.iter().any(|p| p.id == payment.id) {
            return Err(DomainError::Conflict(format!(
                "payment {} already exists",
                payment.id
            )));
        }
        ledger.payments.push(payment);
        Ok(())
    }

    async fn find_transactions(
        &self,
        wallet_id: &str,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<LedgerTransaction>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        let items: Vec<LedgerTransaction> = ledger
            .transactions
            .iter()
            .rev()
            .filter(|t| t.wallet_id == wallet_id && filter.matches(t))
            .cloned()
            .collect();
        Ok(page.apply(items))
    }

    async fn all_transactions(&self, wallet_id: &str) -> DomainResult<Vec<LedgerTransaction>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    async fn find_transaction(&self, id: &str) -> DomainResult<Option<LedgerTransaction>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn find_payment(&self, id: &str) -> DomainResult<Option<Payment>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger.payments.iter().find(|p| p.id == id).cloned())
    }

    async fn find_payments_for_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Payment>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        let items: Vec<Payment> = ledger
            .payments
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(page.apply(items))
    }

    async fn find_payments_by_reference(&self, reference_id: &str) -> DomainResult<Vec<Payment>> {
        let ledger = self.ledger.read().map_err(poisoned)?;
        Ok(ledger
            .payments
            .iter()
            .filter(|p| p.reference_id == reference_id)
            .cloned()
            .collect())
    }
}

// ── Catalog ────────────────────────────────────────────────────

#[async_trait]
impl ParkingSpotRepository for InMemoryRepositoryProvider {
    async fn save(&self, spot: ParkingSpot) -> DomainResult<()> {
        if self.spots.contains(&spot.id) {
            return Err(DomainError::Conflict(format!("spot {} already exists", spot.id)));
        }
        self.spots.insert(&spot.id.clone(), spot);
        Ok(())
    }

    async fn update(&self, spot: ParkingSpot) -> DomainResult<()> {
        let mut row = self
            .spots
            .rows
            .get_mut(&spot.id)
            .ok_or_else(|| DomainError::not_found("ParkingSpot", spot.id.clone()))?;
        let current_status = row.value().1.status;
        row.value_mut().1 = ParkingSpot {
            status: current_status,
            ..spot
        };
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingSpot>> {
        Ok(self.spots.get(id))
    }

    async fn search(
        &self,
        filter: &SpotFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ParkingSpot>> {
        Ok(page.apply(self.spots.oldest_first(|s| filter.matches(s))))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.spots
            .rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("ParkingSpot", id))
    }

    async fn transition_status(
        &self,
        id: &str,
        from: SpotStatus,
        to: SpotStatus,
    ) -> DomainResult<bool> {
        let Some(mut row) = self.spots.rows.get_mut(id) else {
            return Ok(false);
        };
        let spot = &mut row.value_mut().1;
        if spot.status != from {
            return Ok(false);
        }
        spot.status = to;
        spot.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl ChargingStationRepository for InMemoryRepositoryProvider {
    async fn save(&self, station: ChargingStation) -> DomainResult<()> {
        if self.stations.contains(&station.id) {
            return Err(DomainError::Conflict(format!(
                "station {} already exists",
                station.id
            )));
        }
        self.stations.insert(&station.id.clone(), station);
        Ok(())
    }

    async fn update(&self, station: ChargingStation) -> DomainResult<()> {
        let mut row = self
            .stations
            .rows
            .get_mut(&station.id)
            .ok_or_else(|| DomainError::not_found("ChargingStation", station.id.clone()))?;
        let current_status = row.value().1.status;
        row.value_mut().1 = ChargingStation {
            status: current_status,
            ..station
        };
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargingStation>> {
        Ok(self.stations.get(id))
    }

    async fn search(
        &self,
        filter: &StationFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingStation>> {
        Ok(page.apply(self.stations.oldest_first(|s| filter.matches(s))))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.stations
            .rows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("ChargingStation", id))
    }

    async fn transition_status(
        &self,
        id: &str,
        from: StationStatus,
        to: StationStatus,
    ) -> DomainResult<bool> {
        let Some(mut row) = self.stations.rows.get_mut(id) else {
            return Ok(false);
        };
        let station = &mut row.value_mut().1;
        if station.status != from {
            return Ok(false);
        }
        station.status = to;
        station.updated_at = Utc::now();
        Ok(true)
    }
}

// ── Reservations ───────────────────────────────────────────────

#[async_trait]
impl ReservationRepository for InMemoryRepositoryProvider {
    async fn save(&self, reservation: Reservation) -> DomainResult<()> {
        if self.reservations.contains(&reservation.id) {
            return Err(DomainError::Conflict(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        self.reservations.insert(&reservation.id.clone(), reservation);
        Ok(())
    }

    async fn update(&self, reservation: Reservation) -> DomainResult<()> {
        let mut row = self
            .reservations
            .rows
            .get_mut(&reservation.id)
            .ok_or_else(|| DomainError::not_found("Reservation", reservation.id.clone()))?;
        row.value_mut().1 = reservation;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(id))
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        statuses: &[ReservationStatus],
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let items = self.reservations.newest_first(|r| {
            r.user_id == user_id && (statuses.is_empty() || statuses.contains(&r.status))
        });
        Ok(page.apply(items))
    }

    async fn find_for_spot(
        &self,
        spot_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        Ok(page.apply(self.reservations.newest_first(|r| r.spot_id == spot_id)))
    }

    async fn find_live_for_spot(&self, spot_id: &str) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .oldest_first(|r| r.spot_id == spot_id && r.status.is_live()))
    }

    async fn find_no_shows(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self.reservations.oldest_first(|r| r.is_no_show(now)))
    }
}

// ── Charging sessions ──────────────────────────────────────────

#[async_trait]
impl ChargingSessionRepository for InMemoryRepositoryProvider {
    async fn save(&self, session: ChargingSession) -> DomainResult<()> {
        if self.sessions.contains(&session.id) {
            return Err(DomainError::Conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        self.sessions.insert(&session.id.clone(), session);
        Ok(())
    }

    async fn update(&self, session: ChargingSession) -> DomainResult<()> {
        let mut row = self
            .sessions
            .rows
            .get_mut(&session.id)
            .ok_or_else(|| DomainError::not_found("ChargingSession", session.id.clone()))?;
        row.value_mut().1 = session;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargingSession>> {
        Ok(self.sessions.get(id))
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        statuses: &[SessionStatus],
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        let items = self.sessions.newest_first(|s| {
            s.user_id == user_id && (statuses.is_empty() || statuses.contains(&s.status))
        });
        Ok(page.apply(items))
    }

    async fn find_for_station(
        &self,
        station_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        Ok(page.apply(self.sessions.newest_first(|s| s.station_id == station_id)))
    }

    async fn total_energy_for_user(&self, user_id: &str) -> DomainResult<i64> {
        Ok(self
            .sessions
            .rows
            .iter()
            .map(|r| r.value().1.clone())
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::Completed)
            .map(|s| s.energy_wh)
            .sum())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::parking_spot::tests::sample_spot;
    use crate::domain::wallet::{TransactionStatus, TransactionType};

    fn deposit(wallet: &WalletInfo, amount: i64) -> LedgerAppend {
        let mut next = wallet.clone();
        next.balance += amount;
        next.version += 1;
        LedgerAppend {
            expected_version: wallet.version,
            transaction: LedgerTransaction {
                id: uuid::Uuid::new_v4().to_string(),
                wallet_id: wallet.id.clone(),
                user_id: wallet.user_id.clone(),
                tx_type: TransactionType::Deposit,
                amount,
                balance_before: wallet.balance,
                balance_after: next.balance,
                status: TransactionStatus::Confirmed,
                reservation_id: None,
                session_id: None,
                payment_id: None,
                description: "test".into(),
                anchor: None,
                created_at: Utc::now(),
            },
            wallet: next,
            payments: vec![],
        }
    }

    #[tokio::test]
    async fn spot_transition_is_compare_and_set() {
        let repo = InMemoryRepositoryProvider::new();
        ParkingSpotRepository::save(&repo, sample_spot("S1", 500))
            .await
            .unwrap();

        let spots = repo.parking_spots();
        assert!(spots
            .transition_status("S1", SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap());
        assert!(!spots
            .transition_status("S1", SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap());
        assert!(!spots
            .transition_status("missing", SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_keeps_lifecycle_status() {
        let repo = InMemoryRepositoryProvider::new();
        let spots = repo.parking_spots();
        spots.save(sample_spot("S1", 500)).await.unwrap();
        spots
            .transition_status("S1", SpotStatus::Available, SpotStatus::Reserved)
            .await
            .unwrap();

        let mut edited = sample_spot("S1", 700);
        edited.status = SpotStatus::Available;
        spots.update(edited).await.unwrap();

        let stored = spots.find_by_id("S1").await.unwrap().unwrap();
        assert_eq!(stored.price_per_hour, 700);
        assert_eq!(stored.status, SpotStatus::Reserved);
    }

    #[tokio::test]
    async fn stale_append_is_rejected_without_writes() {
        let repo = InMemoryRepositoryProvider::new();
        let wallets = repo.wallets();
        let wallet = WalletInfo::new("u1", "USD", Utc::now());
        wallets.create(wallet.clone()).await.unwrap();

        wallets.append(deposit(&wallet, 100)).await.unwrap();
        let err = wallets.append(deposit(&wallet, 50)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let stored = wallets.find_by_id(&wallet.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, 100);
        assert_eq!(wallets.all_transactions(&wallet.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_wallet_per_user() {
        let repo = InMemoryRepositoryProvider::new();
        let wallets = repo.wallets();
        wallets
            .create(WalletInfo::new("u1", "USD", Utc::now()))
            .await
            .unwrap();
        let err = wallets
            .create(WalletInfo::new("u1", "USD", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
