//! ParkCharge service binary
//!
//! Runs the REST API, the notification socket and the no-show sweep as a
//! single process (systemd unit, container, or foreground).
//!
//! ```sh
//! # Default config (~/.config/parkcharge/config.toml)
//! parkcharge-service
//!
//! # Custom config path
//! parkcharge-service --config /etc/parkcharge/config.toml
//!
//! # Throwaway in-memory store
//! PARKCHARGE_DATABASE_URL=memory parkcharge-service --port 8081
//!
//! # Validate config without starting
//! parkcharge-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use parkcharge::config::AppConfig;
use parkcharge::server::{init_tracing, ServerHandle, ServerOptions};

/// ParkCharge: parking reservations and EV charging paid from a wallet.
#[derive(Parser, Debug)]
#[command(
    name = "parkcharge-service",
    version,
    about = "Parking reservation and EV charging service",
    long_about = "ParkCharge REST API server for parking spot reservations, \
                  EV charging sessions and wallet payments.\n\n\
                  Default config: ~/.config/parkcharge/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "PARKCHARGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(parkcharge::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            if cli.check {
                eprintln!("❌ {}: {}", config_path.display(), e);
                std::process::exit(1);
            }
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
            AppConfig::default()
        }
    };

    // ── CLI overrides ──────────────────────────────────────────
    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
        config.logging.level = level.clone();
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if let Err(e) = config.validate() {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", config.database.connection_url());
        println!("   Currency    : {}", config.wallet.currency);
        println!("   Anchoring   : {:?}", config.ledger.anchor);
        println!("   Log level   : {}", config.logging.level);
        if config.uses_default_secret() {
            println!("   ⚠️  JWT secret is the built-in default");
        }
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
