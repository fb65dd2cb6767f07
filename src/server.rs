//! Service runtime
//!
//! [`ServerHandle`] owns the whole lifecycle: metrics recorder, storage,
//! migrations, admin seeding, the REST API, the no-show sweep and graceful
//! shutdown. The CLI binary is a thin wrapper around it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::application::ports::SharedAnchorSource;
use crate::application::{
    create_event_bus, start_no_show_task, CatalogService, ChargingService, IdentityService,
    ReservationService, SharedEventBus, WalletLedger,
};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::{
    create_anchor_source, init_database, run_migrations, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};
use crate::interfaces::http::{create_api_router, ApiContext};
use crate::shared::{AppError, SharedClock, ShutdownCoordinator, ShutdownSignal, SystemClock};

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true)
    pub auto_migrate: bool,
    /// Seed an admin when no users exist (default: true; also gated by `admin.create_default`)
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── Services ───────────────────────────────────────────────────────

/// The application services wired over one repository provider.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<IdentityService>,
    pub catalog: Arc<CatalogService>,
    pub reservations: Arc<ReservationService>,
    pub charging: Arc<ChargingService>,
    pub ledger: Arc<WalletLedger>,
    pub events: SharedEventBus,
}

impl Services {
    pub fn build(
        repos: Arc<dyn RepositoryProvider>,
        clock: SharedClock,
        anchors: SharedAnchorSource,
        config: &AppConfig,
    ) -> Self {
        let events = create_event_bus();
        let ledger = Arc::new(WalletLedger::new(
            repos.clone(),
            events.clone(),
            anchors.clone(),
            clock.clone(),
            config.wallet.clone(),
        ));
        let reservations = Arc::new(ReservationService::new(
            repos.clone(),
            ledger.clone(),
            events.clone(),
            anchors.clone(),
            clock.clone(),
            config.policy.clone(),
        ));
        let charging = Arc::new(ChargingService::new(
            repos.clone(),
            ledger.clone(),
            events.clone(),
            anchors,
            clock.clone(),
            config.policy.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(repos.clone(), events.clone(), clock.clone()));
        let identity = Arc::new(IdentityService::new(
            repos,
            ledger.clone(),
            config.jwt_config(),
            clock,
        ));

        Self {
            identity,
            catalog,
            reservations,
            charging,
            ledger,
            events,
        }
    }

    pub fn api_context(
        &self,
        db: Option<DatabaseConnection>,
        metrics: Option<PrometheusHandle>,
    ) -> ApiContext {
        ApiContext {
            identity: self.identity.clone(),
            catalog: self.catalog.clone(),
            reservations: self.reservations.clone(),
            charging: self.charging.clone(),
            ledger: self.ledger.clone(),
            events: self.events.clone(),
            db,
            metrics,
            started_at: Arc::new(Instant::now()),
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running service.
///
/// ```rust,no_run
/// use parkcharge::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub services: Services,
    pub repos: Arc<dyn RepositoryProvider>,
    pub config: AppConfig,
    /// Address the REST API is bound to
    pub local_addr: SocketAddr,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
    sweep_task: tokio::task::JoinHandle<()>,
}

/// The global recorder can only be installed once per process; later
/// starts in the same process reuse it.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("📊 Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Metrics recorder unavailable, /metrics disabled");
                None
            }
        })
        .clone()
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, AppError> {
        let config = opts.config;
        config.validate()?;
        info!("Starting ParkCharge service...");

        if config.uses_default_secret() {
            warn!("⚠️  Using the built-in JWT secret; set security.jwt_secret or JWT_SECRET");
        }

        let metrics = prometheus_handle();

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            if config.database.is_memory_store() {
                warn!("Using the in-memory store; data is lost on shutdown");
                (Arc::new(InMemoryRepositoryProvider::new()), None)
            } else {
                let db = init_database(&config.database).await?;
                if opts.auto_migrate {
                    run_migrations(&db).await?;
                }
                (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
            };

        // ── Services ───────────────────────────────────────────
        let clock: SharedClock = Arc::new(SystemClock);
        let anchors = create_anchor_source(&config.ledger);
        let services = Services::build(repos.clone(), clock, anchors, &config);
        info!(
            anchor = ?config.ledger.anchor,
            currency = %config.wallet.currency,
            "Services initialized"
        );

        if opts.create_default_admin && config.admin.create_default {
            if let Err(e) = services.identity.ensure_default_admin(&config.admin.seed()).await {
                error!(error = %e, "Failed to create default admin");
            }
        }

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let sweep_task = start_no_show_task(
            services.reservations.clone(),
            shutdown.signal(),
            config.tasks.no_show_sweep_interval_secs,
        );

        // ── REST API ───────────────────────────────────────────
        let router = create_api_router(services.api_context(db.clone(), metrics));
        let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown.signal();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("🛑 REST API received shutdown signal");
            });
            if let Err(e) = server.await {
                error!(error = %e, "REST API server error");
            }
        });

        info!("🚀 ParkCharge started");

        Ok(Self {
            services,
            repos,
            config,
            local_addr,
            db,
            shutdown,
            api_task,
            sweep_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for every task to stop after shutdown was triggered, bounded by
    /// `server.shutdown_timeout`.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            sweep_task,
            ..
        } = self;

        let finished = shutdown
            .shutdown_with_cleanup(|| async move {
                if let Err(e) = api_task.await {
                    error!(error = %e, "REST API task panicked");
                }
                if let Err(e) = sweep_task.await {
                    error!(error = %e, "No-show sweep task panicked");
                }
                if let Some(db) = db {
                    match db.close().await {
                        Ok(()) => info!("✅ Database connection closed"),
                        Err(e) => warn!(error = %e, "Error closing database connection"),
                    }
                }
            })
            .await;

        if finished {
            info!("👋 ParkCharge shutdown complete");
        }
    }

    pub async fn shutdown(self) {
        info!("🛑 Shutting down ParkCharge...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = "memory".into();
        config.server.host = "127.0.0.1".into();
        config.server.port = 0;
        config
    }

    #[tokio::test]
    async fn invalid_config_refuses_to_start() {
        let mut config = memory_config();
        config.policy.late_refund_percent = 101;
        let result = ServerHandle::start(ServerOptions {
            config,
            ..Default::default()
        })
        .await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn starts_and_shuts_down_on_memory_store() {
        let handle = ServerHandle::start(ServerOptions {
            config: memory_config(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(handle.is_running());
        assert_ne!(handle.local_addr.port(), 0);

        // admin was seeded on startup
        let seeded = handle
            .services
            .identity
            .ensure_default_admin(&handle.config.admin.seed())
            .await
            .unwrap();
        assert!(seeded.is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn builds_services_over_memory_store() {
        let config = memory_config();
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let services = Services::build(
            repos,
            Arc::new(SystemClock),
            create_anchor_source(&config.ledger),
            &config,
        );
        let admin = services
            .identity
            .ensure_default_admin(&config.admin.seed())
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());
        let wallet = services.ledger.wallet_for_user(&admin.id).await.unwrap();
        assert_eq!(wallet.balance, 0);
    }
}
