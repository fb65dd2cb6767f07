//! Service wiring over the in-memory store and a pinned clock.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use super::{
    CatalogService, ChargingService, IdentityService, ReservationService, WalletLedger,
    WalletSettings,
};
use crate::application::events::{create_event_bus, SharedEventBus};
use crate::application::policy::LifecyclePolicy;
use crate::application::ports::{NoAnchor, SharedAnchorSource};
use crate::domain::catalog::charging_station::tests::sample_station;
use crate::domain::catalog::parking_spot::tests::sample_spot;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::JwtConfig;
use crate::infrastructure::storage::InMemoryRepositoryProvider;
use crate::shared::{ManualClock, SharedClock};

/// `hour:minute` on 2025-06-01 UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub struct Harness {
    pub repos: Arc<InMemoryRepositoryProvider>,
    pub clock: ManualClock,
    pub events: SharedEventBus,
    pub ledger: Arc<WalletLedger>,
    pub reservations: Arc<ReservationService>,
    pub charging: Arc<ChargingService>,
    pub catalog: Arc<CatalogService>,
    pub identity: Arc<IdentityService>,
}

impl Harness {
    /// Clock at 08:00, default policy, empty wallets for `u1` and `u2`.
    pub async fn new() -> Self {
        Self::with_policy(LifecyclePolicy::default()).await
    }

    pub async fn with_policy(policy: LifecyclePolicy) -> Self {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let provider: Arc<dyn RepositoryProvider> = repos.clone();
        let clock = ManualClock::new(at(8, 0));
        let shared_clock: SharedClock = Arc::new(clock.clone());
        let events = create_event_bus();
        let anchors: SharedAnchorSource = Arc::new(NoAnchor);

        let ledger = Arc::new(WalletLedger::new(
            provider.clone(),
            events.clone(),
            anchors.clone(),
            shared_clock.clone(),
            WalletSettings::default(),
        ));
        let reservations = Arc::new(ReservationService::new(
            provider.clone(),
            ledger.clone(),
            events.clone(),
            anchors.clone(),
            shared_clock.clone(),
            policy.clone(),
        ));
        let charging = Arc::new(ChargingService::new(
            provider.clone(),
            ledger.clone(),
            events.clone(),
            anchors,
            shared_clock.clone(),
            policy,
        ));
        let catalog = Arc::new(CatalogService::new(
            provider.clone(),
            events.clone(),
            shared_clock.clone(),
        ));
        let identity = Arc::new(IdentityService::new(
            provider,
            ledger.clone(),
            JwtConfig::new("test-secret", 1),
            shared_clock,
        ));

        for user in ["u1", "u2"] {
            ledger.create_wallet(user).await.unwrap();
        }

        Self {
            repos,
            clock,
            events,
            ledger,
            reservations,
            charging,
            catalog,
            identity,
        }
    }

    pub async fn add_spot(&self, id: &str, price_per_hour: i64) {
        self.repos
            .parking_spots()
            .save(sample_spot(id, price_per_hour))
            .await
            .unwrap();
    }

    pub async fn add_station(&self, id: &str, price_per_kwh: i64) {
        self.repos
            .charging_stations()
            .save(sample_station(id, price_per_kwh))
            .await
            .unwrap();
    }

    pub async fn balance(&self, user_id: &str) -> i64 {
        self.ledger.wallet_for_user(user_id).await.unwrap().balance
    }
}
