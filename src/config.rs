//! Service configuration
//!
//! Read from a TOML file (`~/.config/parkcharge/config.toml` by default);
//! every section and field is optional and falls back to its default. A
//! few environment variables override the file:
//!
//! | Variable | Field |
//! |---|---|
//! | `PARKCHARGE_PORT` | `server.port` |
//! | `PARKCHARGE_DATABASE_URL` | `database.url` |
//! | `JWT_SECRET` | `security.jwt_secret` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::{AdminSeed, LifecyclePolicy, WalletSettings};
use crate::infrastructure::crypto::JwtConfig;
use crate::infrastructure::{DatabaseConfig, LedgerConfig};
use crate::shared::AppError;

pub const DEFAULT_JWT_SECRET: &str = "parkcharge-dev-secret-change-me";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub admin: AdminConfig,
    pub wallet: WalletSettings,
    pub policy: LifecyclePolicy,
    pub ledger: LedgerConfig,
    pub tasks: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.into(),
            jwt_expiration_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, or a full `EnvFilter` directive
    pub level: String,
    /// pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Seed an admin account when the user table is empty
    pub create_default: bool,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            create_default: true,
            username: "admin".into(),
            email: "admin@parkcharge.local".into(),
            password: "admin12345".into(),
        }
    }
}

impl AdminConfig {
    pub fn seed(&self) -> AdminSeed {
        AdminSeed {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub no_show_sweep_interval_secs: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            no_show_sweep_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load `path`, or the defaults when it does not exist, then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::from_toml_str(&raw)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AppError> {
        if let Some(port) = lookup("PARKCHARGE_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("PARKCHARGE_PORT is not a port: {}", port)))?;
        }
        if let Some(url) = lookup("PARKCHARGE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        let fail = |msg: &str| Err(AppError::Config(msg.to_string()));

        if self.server.host.trim().is_empty() {
            return fail("server.host must not be empty");
        }
        if self.database.url.trim().is_empty() {
            return fail("database.url must not be empty");
        }
        if self.security.jwt_secret.trim().is_empty() {
            return fail("security.jwt_secret must not be empty");
        }
        if self.security.jwt_expiration_hours <= 0 {
            return fail("security.jwt_expiration_hours must be positive");
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "pretty" | "json") {
            return fail("logging.format must be pretty or json");
        }
        if self.wallet.currency.trim().len() != 3 {
            return fail("wallet.currency must be a three-letter code");
        }
        if self.wallet.max_deposit < 0 {
            return fail("wallet.max_deposit must not be negative");
        }
        if self.admin.create_default && self.admin.password.len() < 8 {
            return fail("admin.password must be at least 8 characters");
        }
        self.policy.validate().map_err(AppError::Config)?;
        Ok(())
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig::new(
            self.security.jwt_secret.clone(),
            self.security.jwt_expiration_hours,
        )
    }

    pub fn uses_default_secret(&self) -> bool {
        self.security.jwt_secret == DEFAULT_JWT_SECRET
    }
}

pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parkcharge")
        .join("config.toml")
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::CheckoutSettlement;
    use crate::infrastructure::AnchorMode;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.uses_default_secret());
        assert_eq!(config.server.address(), "0.0.0.0:8080");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9090

            [policy]
            checkout_settlement = "actual"
            partial_refund_percent = 25

            [ledger]
            anchor = "digest"
            endorsing_orgs = ["CityMSP"]
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.policy.checkout_settlement, CheckoutSettlement::Actual);
        assert_eq!(config.policy.partial_refund_percent, 25);
        assert_eq!(config.policy.check_in_grace_minutes, 15);
        assert_eq!(config.ledger.anchor, AnchorMode::Digest);
        assert_eq!(config.wallet.currency, "USD");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let err = AppConfig::from_toml_str("[server\nport = ").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| match key {
                "PARKCHARGE_PORT" => Some("7000".into()),
                "PARKCHARGE_DATABASE_URL" => Some("memory".into()),
                "JWT_SECRET" => Some("s3cret".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.port, 7000);
        assert!(config.database.is_memory_store());
        assert!(!config.uses_default_secret());

        let err = config
            .apply_overrides(|key| (key == "PARKCHARGE_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn validation_rejects_inconsistent_settings() {
        let mut config = AppConfig::default();
        config.policy.partial_refund_percent = 150;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.security.jwt_secret = "  ".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("parkcharge-does-not-exist.toml");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.tasks.no_show_sweep_interval_secs, 60);
    }
}
