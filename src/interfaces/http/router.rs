//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::{AnchorDto, ApiResponse, EmptyData, PaginationParams};
use super::middleware::{auth_middleware, AuthState};
use super::modules::{
    auth, health, metrics, payments, request_id, reservations, sessions, spots, stations, users,
    wallet,
};
use crate::application::{
    CatalogService, ChargingService, IdentityService, ReservationService, SharedEventBus,
    WalletLedger,
};
use crate::interfaces::ws::{create_notification_state, ws_notifications_handler};

/// Everything the HTTP layer needs, built once at startup.
#[derive(Clone)]
pub struct ApiContext {
    pub identity: Arc<IdentityService>,
    pub catalog: Arc<CatalogService>,
    pub reservations: Arc<ReservationService>,
    pub charging: Arc<ChargingService>,
    pub ledger: Arc<WalletLedger>,
    pub events: SharedEventBus,
    /// `None` on the in-memory store
    pub db: Option<DatabaseConnection>,
    /// `None` when no Prometheus recorder is installed; `/metrics` is then not mounted
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Arc<Instant>,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::deactivate_user,
        users::user_history,
        // Parking spots
        spots::list_spots,
        spots::get_spot,
        spots::create_spot,
        spots::update_spot,
        spots::set_spot_status,
        spots::delete_spot,
        spots::spot_bookings,
        // Reservations
        reservations::create_reservation,
        reservations::check_in,
        reservations::check_out,
        reservations::extend_reservation,
        reservations::cancel_reservation,
        reservations::list_reservations,
        reservations::active_reservations,
        reservations::reservation_history,
        reservations::get_reservation,
        // Charging stations
        stations::list_stations,
        stations::get_station,
        stations::create_station,
        stations::update_station,
        stations::set_station_status,
        stations::delete_station,
        stations::station_sessions,
        // Charging sessions
        sessions::start_session,
        sessions::update_progress,
        sessions::stop_session,
        sessions::cancel_session,
        sessions::list_sessions,
        sessions::active_sessions,
        sessions::session_history,
        sessions::get_session,
        sessions::energy_stats,
        // Wallet
        wallet::get_wallet,
        wallet::add_funds,
        wallet::list_transactions,
        wallet::get_transaction,
        wallet::spending_summary,
        wallet::reconcile_wallet,
        // Payments
        payments::create_payment,
        payments::refund_payment,
        payments::list_payments,
        payments::get_payment,
        payments::payment_receipt,
    ),
    components(
        schemas(
            ApiResponse<EmptyData>,
            EmptyData,
            PaginationParams,
            AnchorDto,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            auth::ProfileResponse,
            users::UpdateUserRequest,
            users::ActivityDto,
            spots::SpotDto,
            spots::CreateSpotRequest,
            spots::UpdateSpotRequest,
            spots::SetStatusRequest,
            reservations::ReservationDto,
            reservations::CreateReservationRequest,
            reservations::CheckInRequest,
            reservations::ExtendReservationRequest,
            stations::StationDto,
            stations::CreateStationRequest,
            stations::UpdateStationRequest,
            sessions::SessionDto,
            sessions::StartSessionRequest,
            sessions::ProgressRequest,
            sessions::EnergyStatsDto,
            wallet::WalletDto,
            wallet::AddFundsRequest,
            wallet::TransactionDto,
            wallet::SpendingDto,
            wallet::ReconciliationDto,
            payments::PaymentDto,
            payments::CreatePaymentRequest,
            payments::RefundRequest,
            payments::ReceiptDto,
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and storage reachability"),
        (name = "Authentication", description = "Registration, login (JWT) and profile"),
        (name = "Users", description = "Profile edits, deactivation, admin listing and account history"),
        (name = "Parking Spots", description = "Spot search and operator administration"),
        (name = "Reservations", description = "Book, check in, check out, extend and cancel"),
        (name = "Charging Stations", description = "Station search and operator administration"),
        (name = "Charging Sessions", description = "Start, meter, stop and cancel charging"),
        (name = "Wallet", description = "Balance, deposits and the transaction ledger"),
        (name = "Payments", description = "Wallet payments, refunds and receipts"),
    ),
    info(
        title = "ParkCharge API",
        version = "1.0.0",
        description = "Parking reservations, EV charging sessions and wallet payments",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the full application router.
pub fn create_api_router(ctx: ApiContext) -> Router {
    let auth_state = AuthState {
        jwt_config: ctx.identity.jwt_config().clone(),
    };

    // ── Auth ────────────────────────────────────────────────────
    let auth_handler_state = auth::AuthHandlerState {
        identity: ctx.identity.clone(),
    };
    let public_auth = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(auth_handler_state.clone());
    let session_auth = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .with_state(auth_handler_state);

    let user_routes = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        )
        .route("/users/{id}/history", get(users::user_history))
        .with_state(users::UserAppState {
            identity: ctx.identity.clone(),
        });

    // ── Parking ─────────────────────────────────────────────────
    let spot_routes = Router::new()
        .route("/parking/spots", get(spots::list_spots).post(spots::create_spot))
        .route(
            "/parking/spots/{id}",
            get(spots::get_spot)
                .put(spots::update_spot)
                .delete(spots::delete_spot),
        )
        .route("/parking/spots/{id}/status", put(spots::set_spot_status))
        .route("/parking/spots/{id}/bookings", get(spots::spot_bookings))
        .with_state(spots::SpotAppState {
            catalog: ctx.catalog.clone(),
            reservations: ctx.reservations.clone(),
        });

    let reservation_routes = Router::new()
        .route(
            "/parking/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/parking/reservations/active",
            get(reservations::active_reservations),
        )
        .route(
            "/parking/reservations/history",
            get(reservations::reservation_history),
        )
        .route(
            "/parking/reservations/{id}",
            get(reservations::get_reservation),
        )
        .route(
            "/parking/reservations/{id}/check-in",
            post(reservations::check_in),
        )
        .route(
            "/parking/reservations/{id}/check-out",
            post(reservations::check_out),
        )
        .route(
            "/parking/reservations/{id}/extend",
            post(reservations::extend_reservation),
        )
        .route(
            "/parking/reservations/{id}/cancel",
            post(reservations::cancel_reservation),
        )
        .with_state(reservations::ReservationAppState {
            reservations: ctx.reservations.clone(),
        });

    // ── Charging ────────────────────────────────────────────────
    let station_routes = Router::new()
        .route(
            "/charging/stations",
            get(stations::list_stations).post(stations::create_station),
        )
        .route(
            "/charging/stations/{id}",
            get(stations::get_station)
                .put(stations::update_station)
                .delete(stations::delete_station),
        )
        .route(
            "/charging/stations/{id}/status",
            put(stations::set_station_status),
        )
        .route(
            "/charging/stations/{id}/sessions",
            get(stations::station_sessions),
        )
        .with_state(stations::StationAppState {
            catalog: ctx.catalog.clone(),
            charging: ctx.charging.clone(),
        });

    let session_routes = Router::new()
        .route(
            "/charging/sessions",
            get(sessions::list_sessions).post(sessions::start_session),
        )
        .route("/charging/sessions/active", get(sessions::active_sessions))
        .route("/charging/sessions/history", get(sessions::session_history))
        .route("/charging/sessions/{id}", get(sessions::get_session))
        .route(
            "/charging/sessions/{id}/progress",
            put(sessions::update_progress),
        )
        .route("/charging/sessions/{id}/stop", post(sessions::stop_session))
        .route(
            "/charging/sessions/{id}/cancel",
            post(sessions::cancel_session),
        )
        .route("/charging/stats/energy", get(sessions::energy_stats))
        .with_state(sessions::SessionAppState {
            charging: ctx.charging.clone(),
        });

    // ── Money ───────────────────────────────────────────────────
    let wallet_routes = Router::new()
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/funds", post(wallet::add_funds))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wallet/transactions/{id}", get(wallet::get_transaction))
        .route("/wallet/spending", get(wallet::spending_summary))
        .route("/wallet/reconcile", get(wallet::reconcile_wallet))
        .with_state(wallet::WalletAppState {
            ledger: ctx.ledger.clone(),
        });

    let payment_routes = Router::new()
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route("/payments/{id}", get(payments::get_payment))
        .route("/payments/{id}/refund", post(payments::refund_payment))
        .route("/payments/{id}/receipt", get(payments::payment_receipt))
        .with_state(payments::PaymentAppState {
            ledger: ctx.ledger.clone(),
        });

    let protected = Router::new()
        .merge(session_auth)
        .merge(user_routes)
        .merge(spot_routes)
        .merge(reservation_routes)
        .merge(station_routes)
        .merge(session_routes)
        .merge(wallet_routes)
        .merge(payment_routes)
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    // The token is checked by the handler; upgrades cannot carry headers.
    let notification_routes = Router::new()
        .route("/notifications/ws", get(ws_notifications_handler))
        .with_state(create_notification_state(
            ctx.events.clone(),
            ctx.identity.jwt_config().clone(),
        ));

    let api = Router::new()
        .merge(public_auth)
        .merge(protected)
        .merge(notification_routes);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db: ctx.db.clone(),
            events: ctx.events.clone(),
            started_at: ctx.started_at.clone(),
        });

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(health_routes)
        .nest("/api/v1", api);

    if let Some(handle) = ctx.metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

// ── Tests ──────────────────────────────────────────────────────
