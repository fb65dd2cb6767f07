//! End-to-end lifecycle scenarios over the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use parkcharge::application::ports::{NoAnchor, SharedAnchorSource};
use parkcharge::application::{Caller, NewSpot, NewStation, PaymentRequest};
use parkcharge::config::AppConfig;
use parkcharge::domain::wallet::TransactionFilter;
use parkcharge::domain::{
    ChargeReference, ConnectorType, DomainError, PaymentType, RepositoryProvider,
    ReservationStatus, SessionStatus, SpotStatus, SpotType, StationStatus, TransactionType,
};
use parkcharge::infrastructure::InMemoryRepositoryProvider;
use parkcharge::server::Services;
use parkcharge::shared::{ManualClock, PageRequest, SharedClock};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
}

struct World {
    services: Services,
    clock: ManualClock,
    admin: Caller,
}

impl World {
    async fn new() -> Self {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let clock = ManualClock::new(at(8, 0));
        let shared: SharedClock = Arc::new(clock.clone());
        let anchors: SharedAnchorSource = Arc::new(NoAnchor);
        let services = Services::build(repos, shared, anchors, &AppConfig::default());
        Self {
            services,
            clock,
            admin: Caller::admin("ops"),
        }
    }

    async fn user_with(&self, user_id: &str, cents: i64) -> Caller {
        self.services.ledger.create_wallet(user_id).await.unwrap();
        if cents > 0 {
            self.services
                .ledger
                .add_funds(user_id, cents, None)
                .await
                .unwrap();
        }
        Caller::user(user_id)
    }

    async fn spot(&self, price_per_hour: i64) -> String {
        self.services
            .catalog
            .create_spot(
                &self.admin,
                NewSpot {
                    operator_id: None,
                    name: "Level 1 Bay 4".into(),
                    location: "Main Street Garage".into(),
                    latitude: 41.31,
                    longitude: 69.24,
                    spot_type: SpotType::Standard,
                    price_per_hour,
                    has_ev_charging: false,
                    features: vec!["covered".into()],
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn station(&self, price_per_kwh: i64) -> String {
        self.services
            .catalog
            .create_station(
                &self.admin,
                NewStation {
                    operator_id: None,
                    name: "Fast Charger A".into(),
                    location: "Main Street Garage".into(),
                    latitude: 41.31,
                    longitude: 69.24,
                    power_output_kw: 50.0,
                    connector_type: ConnectorType::Ccs,
                    price_per_kwh,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn balance(&self, user_id: &str) -> i64 {
        self.services
            .ledger
            .wallet_for_user(user_id)
            .await
            .unwrap()
            .balance
    }

    async fn spot_status(&self, id: &str) -> SpotStatus {
        self.services.catalog.get_spot(id).await.unwrap().status
    }
}

#[tokio::test]
async fn booking_then_early_cancel_refunds_in_full() {
    let w = World::new().await;
    let alice = w.user_with("alice", 5_000).await;
    let spot = w.spot(500).await;

    let reservation = w
        .services
        .reservations
        .create(&alice, &spot, at(10, 0), at(12, 0))
        .await
        .unwrap();
    assert_eq!(reservation.total_cost, 1_000);
    assert_eq!(reservation.status, ReservationStatus::Confirmed);
    assert!(reservation.qr_code.is_some());
    assert_eq!(w.spot_status(&spot).await, SpotStatus::Reserved);
    assert_eq!(w.balance("alice").await, 4_000);

    let cancelled = w
        .services
        .reservations
        .cancel(&alice, &reservation.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(w.spot_status(&spot).await, SpotStatus::Available);
    assert_eq!(w.balance("alice").await, 5_000);

    let refunds = w
        .services
        .ledger
        .transactions(
            "alice",
            &TransactionFilter {
                tx_type: Some(TransactionType::Refund),
            },
            PageRequest::new(1, 20),
        )
        .await
        .unwrap();
    assert_eq!(refunds.items.len(), 1);
    assert_eq!(refunds.items[0].amount, 1_000);
}

#[tokio::test]
async fn concurrent_bookings_of_one_spot_have_one_winner() {
    let w = World::new().await;
    let spot = w.spot(500).await;
    let alice = w.user_with("alice", 5_000).await;
    let bob = w.user_with("bob", 5_000).await;

    let (a, b) = tokio::join!(
        w.services
            .reservations
            .create(&alice, &spot, at(10, 0), at(12, 0)),
        w.services
            .reservations
            .create(&bob, &spot, at(10, 0), at(12, 0)),
    );

    let outcomes = [a, b];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(DomainError::SpotUnavailable { .. }))));
    assert_eq!(w.spot_status(&spot).await, SpotStatus::Reserved);

    // only the winner paid
    let total = w.balance("alice").await + w.balance("bob").await;
    assert_eq!(total, 9_000);
}

#[tokio::test]
async fn failed_payment_leaves_no_trace() {
    let w = World::new().await;
    let carol = w.user_with("carol", 5_000).await;

    let err = w
        .services
        .ledger
        .process_payment(
            &carol.user_id,
            PaymentRequest {
                amount: 6_000,
                payment_type: PaymentType::Parking,
                reference: ChargeReference::Other("booking1".into()),
                description: "test".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientFunds {
            available: 5_000,
            required: 6_000
        }
    ));
    assert_eq!(w.balance("carol").await, 5_000);

    let txs = w
        .services
        .ledger
        .transactions("carol", &TransactionFilter::default(), PageRequest::new(1, 20))
        .await
        .unwrap();
    assert_eq!(txs.total, 1);
    assert_eq!(txs.items[0].tx_type, TransactionType::Deposit);

    // a booking that cannot be paid releases the spot again
    let spot = w.spot(5_000).await;
    let err = w
        .services
        .reservations
        .create(&carol, &spot, at(10, 0), at(12, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientFunds { .. }));
    assert_eq!(w.spot_status(&spot).await, SpotStatus::Available);
}

#[tokio::test]
async fn pay_then_refund_restores_balance() {
    let w = World::new().await;
    let dave = w.user_with("dave", 10_000).await;

    let payment = w
        .services
        .ledger
        .process_payment(
            &dave.user_id,
            PaymentRequest {
                amount: 3_000,
                payment_type: PaymentType::Charging,
                reference: ChargeReference::Other("manual-1".into()),
                description: "Manual charge".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(w.balance("dave").await, 7_000);

    w.services
        .ledger
        .refund_payment(&payment.id, None, Some("goodwill".into()))
        .await
        .unwrap();
    assert_eq!(w.balance("dave").await, 10_000);

    // nothing left to refund
    assert!(w
        .services
        .ledger
        .refund_payment(&payment.id, None, None)
        .await
        .is_err());

    let report = w.services.ledger.reconcile("dave").await.unwrap();
    assert!(report.is_consistent);
    assert_eq!(report.total_credits, 13_000);
    assert_eq!(report.total_debits, 3_000);
    assert_eq!(report.computed_balance, 10_000);
}

#[tokio::test]
async fn check_in_then_cancel_keeps_payment() {
    let w = World::new().await;
    let erin = w.user_with("erin", 5_000).await;
    let spot = w.spot(500).await;

    let reservation = w
        .services
        .reservations
        .create(&erin, &spot, at(10, 0), at(12, 0))
        .await
        .unwrap();

    // too early for check-in
    let early = w
        .services
        .reservations
        .check_in(&erin, &reservation.id, None)
        .await;
    assert!(matches!(early, Err(DomainError::InvalidTransition(_))));

    w.clock.set(at(9, 50));
    let active = w
        .services
        .reservations
        .check_in(&erin, &reservation.id, reservation.qr_code.as_deref())
        .await
        .unwrap();
    assert_eq!(active.status, ReservationStatus::Active);
    assert_eq!(w.spot_status(&spot).await, SpotStatus::Occupied);

    w.clock.advance(Duration::minutes(30));
    let cancelled = w
        .services
        .reservations
        .cancel(&erin, &reservation.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(w.spot_status(&spot).await, SpotStatus::Available);
    assert_eq!(w.balance("erin").await, 4_000);

    // terminal reservations stay terminal
    assert!(w
        .services
        .reservations
        .cancel(&erin, &reservation.id)
        .await
        .is_err());
}

#[tokio::test]
async fn charging_session_bills_metered_energy() {
    let w = World::new().await;
    let frank = w.user_with("frank", 2_000).await;
    let station = w.station(40).await;

    let session = w.services.charging.start(&frank, &station).await.unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(
        w.services.catalog.get_station(&station).await.unwrap().status,
        StationStatus::InUse
    );

    // second start on a busy station
    let other = w.user_with("grace", 2_000).await;
    assert!(matches!(
        w.services.charging.start(&other, &station).await,
        Err(DomainError::StationUnavailable { .. })
    ));

    w.clock.advance(Duration::minutes(45));
    w.services
        .charging
        .update_progress(&frank, &session.id, 12_500, None)
        .await
        .unwrap();
    let done = w.services.charging.stop(&frank, &session.id).await.unwrap();
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.total_cost, Some(500));
    assert_eq!(done.duration_minutes, 45);
    assert_eq!(w.balance("frank").await, 1_500);
    assert_eq!(
        w.services.catalog.get_station(&station).await.unwrap().status,
        StationStatus::Available
    );

    assert_eq!(w.services.charging.total_energy(&frank).await.unwrap(), 12_500);
    assert!(w.services.ledger.reconcile("frank").await.unwrap().is_consistent);
}

#[tokio::test]
async fn ledger_stays_reconciled_across_mixed_activity() {
    let w = World::new().await;
    let hank = w.user_with("hank", 20_000).await;
    let spot = w.spot(750).await;
    let station = w.station(35).await;

    let r1 = w
        .services
        .reservations
        .create(&hank, &spot, at(9, 0), at(10, 30))
        .await
        .unwrap();
    w.services
        .reservations
        .cancel(&hank, &r1.id)
        .await
        .unwrap();

    let session = w.services.charging.start(&hank, &station).await.unwrap();
    w.services
        .charging
        .update_progress(&hank, &session.id, 8_000, None)
        .await
        .unwrap();
    w.services.charging.stop(&hank, &session.id).await.unwrap();
    w.services.ledger.add_funds("hank", 1_234, None).await.unwrap();

    let report = w.services.ledger.reconcile("hank").await.unwrap();
    assert!(report.is_consistent, "broken: {:?}", report.broken_links);
    assert_eq!(report.balance, report.computed_balance);
    assert_eq!(report.balance, w.balance("hank").await);

    let spending = w.services.ledger.spending("hank").await.unwrap();
    assert_eq!(
        spending.net_spending,
        spending.total_spending - spending.total_refunds
    );
}
