//! Registration, login, profile and account management
//!
//! HTTP handlers stay thin and delegate here. A user always owns exactly
//! one wallet: registration creates both or neither. Accounts are never
//! removed; deactivation only blocks further logins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::application::caller::Caller;
use crate::application::services::ledger::WalletLedger;
use crate::domain::wallet::TransactionFilter;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, User, UserRole};
use crate::infrastructure::crypto::{create_token, hash_password, verify_password, JwtConfig};
use crate::shared::{PageRequest, PaginatedResult, SharedClock};

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// User plus the balance read from their wallet.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub balance: i64,
    pub currency: String,
}

/// Profile fields a user may change. `Some("")` clears a field.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Account,
    Reservation,
    ChargingSession,
    Transaction,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Reservation => "reservation",
            Self::ChargingSession => "charging_session",
            Self::Transaction => "transaction",
        }
    }
}

/// One line of a user's account history.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub reference_id: String,
    /// Current status of the referenced record
    pub status: String,
    pub summary: String,
    /// Cents; `None` when the record carries no amount yet
    pub amount: Option<i64>,
    pub occurred_at: DateTime<Utc>,
}

fn clean(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Credentials for the account seeded on an empty database.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct IdentityService {
    repos: Arc<dyn RepositoryProvider>,
    ledger: Arc<WalletLedger>,
    jwt_config: JwtConfig,
    clock: SharedClock,
}

impl IdentityService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        ledger: Arc<WalletLedger>,
        jwt_config: JwtConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            repos,
            ledger,
            jwt_config,
            clock,
        }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Registration ────────────────────────────────────────────

    pub async fn register(&self, username: &str, email: &str, password: &str) -> DomainResult<User> {
        self.create_account(username, email, password, UserRole::User)
            .await
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> DomainResult<User> {
        let username = username.trim();
        let email = email.trim();
        if username.len() < 3 || username.len() > 50 {
            return Err(DomainError::InvalidInput(
                "Username must be 3-50 characters".into(),
            ));
        }
        if password.len() < 8 {
            return Err(DomainError::InvalidInput(
                "Password must be at least 8 characters".into(),
            ));
        }
        if !email.contains('@') {
            return Err(DomainError::InvalidInput("Invalid email address".into()));
        }

        let users = self.repos.users();
        if users.exists(username, email).await? {
            return Err(DomainError::Conflict(
                "Username or email already exists".into(),
            ));
        }

        let password_hash = hash_password(password)
            .map_err(|e| DomainError::Storage(format!("Failed to hash password: {}", e)))?;
        let user = User::new(username, email, password_hash, role, self.clock.now());
        users.create(user.clone()).await?;

        if let Err(e) = self.ledger.create_wallet(&user.id).await {
            warn!(user_id = %user.id, error = %e, "Wallet creation failed, removing user");
            if let Err(del) = users.delete(&user.id).await {
                error!(user_id = %user.id, error = %del, "Failed to remove user without wallet");
            }
            return Err(e);
        }

        info!(user_id = %user.id, username = %user.username, role = %user.role, "New user registered");
        Ok(user)
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by username or email and return a JWT.
    pub async fn login(&self, login: &str, password: &str) -> DomainResult<AuthResult> {
        let Some(user) = self.repos.users().find_by_login(login.trim()).await? else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        if !user.is_active {
            return Err(DomainError::Unauthorized("Account is disabled".into()));
        }

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        let token = create_token(&user.id, &user.username, user.role.as_str(), &self.jwt_config)
            .map_err(|e| DomainError::Storage(format!("Failed to create token: {}", e)))?;

        let now = self.clock.now();
        self.repos.users().touch_last_login(&user.id, now).await?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expires_in_secs(),
            user: User {
                last_login_at: Some(now),
                ..user
            },
        })
    }

    /// Tokens are stateless; logging out only acknowledges.
    pub async fn logout(&self, user_id: &str) -> DomainResult<()> {
        info!(user_id, "User logged out");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn me(&self, user_id: &str) -> DomainResult<UserProfile> {
        let user = self
            .repos
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;
        let wallet = self.ledger.wallet_for_user(user_id).await?;
        Ok(UserProfile {
            user,
            balance: wallet.balance,
            currency: wallet.currency,
        })
    }

    // ── User management ─────────────────────────────────────────

    async fn load_user(&self, id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// A user record; visible to its owner and to admins.
    pub async fn get_user(&self, caller: &Caller, id: &str) -> DomainResult<User> {
        caller.ensure_owner(id)?;
        self.load_user(id).await
    }

    pub async fn update_user(
        &self,
        caller: &Caller,
        id: &str,
        changes: UserChanges,
    ) -> DomainResult<User> {
        caller.ensure_owner(id)?;
        let mut user = self.load_user(id).await?;
        if let Some(first_name) = changes.first_name {
            user.first_name = clean(first_name);
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = clean(last_name);
        }
        if let Some(phone) = changes.phone {
            let phone = clean(phone);
            if let Some(p) = &phone {
                let digits = p.chars().filter(char::is_ascii_digit).count();
                let allowed = p
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
                if !allowed || !(7..=15).contains(&digits) {
                    return Err(DomainError::InvalidInput(format!(
                        "invalid phone number '{}'",
                        p
                    )));
                }
            }
            user.phone = phone;
        }
        user.updated_at = self.clock.now();
        self.repos.users().update(user.clone()).await?;

        info!(user_id = %user.id, updated_by = %caller.user_id, "User updated");
        Ok(user)
    }

    /// Soft delete: the account and its history stay, logins stop.
    pub async fn deactivate_user(&self, caller: &Caller, id: &str) -> DomainResult<User> {
        caller.ensure_owner(id)?;
        let mut user = self.load_user(id).await?;
        if !user.is_active {
            return Err(DomainError::InvalidState {
                entity: "User",
                id: user.id,
                status: "inactive".into(),
                operation: "deactivate",
            });
        }
        user.is_active = false;
        user.updated_at = self.clock.now();
        self.repos.users().update(user.clone()).await?;

        info!(user_id = %user.id, deactivated_by = %caller.user_id, "User deactivated");
        Ok(user)
    }

    pub async fn list_users(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<User>> {
        caller.ensure_admin()?;
        self.repos.users().list(page).await
    }

    /// Account timeline, newest first: registration, reservations, charging
    /// sessions and wallet transactions.
    pub async fn user_history(
        &self,
        caller: &Caller,
        id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ActivityEntry>> {
        caller.ensure_owner(id)?;
        let user = self.load_user(id).await?;

        // the newest `offset + limit` entries overall come from the newest
        // `offset + limit` of each source
        let window = PageRequest {
            page: 1,
            limit: page.page.saturating_mul(page.limit),
        };

        let reservations = self
            .repos
            .reservations()
            .find_for_user(id, &[], window)
            .await?;
        let sessions = self
            .repos
            .charging_sessions()
            .find_for_user(id, &[], window)
            .await?;
        let transactions = self
            .ledger
            .transactions(id, &TransactionFilter::default(), window)
            .await?;
        let total = 1 + reservations.total + sessions.total + transactions.total;

        let mut entries = vec![ActivityEntry {
            kind: ActivityKind::Account,
            reference_id: user.id.clone(),
            status: if user.is_active { "active" } else { "inactive" }.to_string(),
            summary: format!("Registered as {}", user.username),
            amount: None,
            occurred_at: user.created_at,
        }];
        entries.extend(reservations.items.into_iter().map(|r| ActivityEntry {
            kind: ActivityKind::Reservation,
            summary: format!("Booked spot {} from {} to {}", r.spot_id, r.start_time, r.end_time),
            status: r.status.to_string(),
            amount: Some(r.total_cost),
            occurred_at: r.created_at,
            reference_id: r.id,
        }));
        entries.extend(sessions.items.into_iter().map(|s| ActivityEntry {
            kind: ActivityKind::ChargingSession,
            summary: format!("Charged at station {} ({} Wh)", s.station_id, s.energy_wh),
            status: s.status.to_string(),
            amount: s.total_cost,
            occurred_at: s.created_at,
            reference_id: s.id,
        }));
        entries.extend(transactions.items.into_iter().map(|t| ActivityEntry {
            kind: ActivityKind::Transaction,
            status: t.status.as_str().to_string(),
            amount: Some(t.tx_type.signed(t.amount)),
            summary: t.description,
            occurred_at: t.created_at,
            reference_id: t.id,
        }));
        entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let items = entries
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    /// Seed an admin account when the user table is empty.
    /// Returns the created admin, or `None` when users already exist.
    pub async fn ensure_default_admin(&self, seed: &AdminSeed) -> DomainResult<Option<User>> {
        if self.repos.users().count().await? > 0 {
            return Ok(None);
        }
        info!("Creating default admin user...");
        let admin = self
            .create_account(&seed.username, &seed.email, &seed.password, UserRole::Admin)
            .await?;
        info!(email = %admin.email, "Default admin created");
        warn!("Please change the admin password immediately!");
        Ok(Some(admin))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{at, Harness};
    use crate::infrastructure::crypto::verify_token;

    #[tokio::test]
    async fn register_creates_wallet() {
        let h = Harness::new().await;
        let user = h
            .identity
            .register("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::User);

        let profile = h.identity.me(&user.id).await.unwrap();
        assert_eq!(profile.balance, 0);
        assert_eq!(profile.currency, "USD");
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let h = Harness::new().await;
        h.identity
            .register("alice", "alice@example.com", "password123")
            .await
            .unwrap();
        let err = h
            .identity
            .register("alice", "other@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        let err = h
            .identity
            .register("bob", "alice@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn weak_input_is_rejected() {
        let h = Harness::new().await;
        assert!(matches!(
            h.identity.register("al", "a@example.com", "password123").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            h.identity.register("alice", "a@example.com", "short").await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            h.identity.register("alice", "not-an-email", "password123").await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let h = Harness::new().await;
        let user = h
            .identity
            .register("alice", "alice@example.com", "password123")
            .await
            .unwrap();

        let auth = h.identity.login("alice", "password123").await.unwrap();
        let claims = verify_token(&auth.token, h.identity.jwt_config()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert!(!claims.is_admin());
        assert!(auth.user.last_login_at.is_some());

        h.identity
            .login("alice@example.com", "password123")
            .await
            .unwrap();

        let err = h.identity.login("alice", "wrong-pass").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
        let err = h.identity.login("nobody", "password123").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn default_admin_only_on_empty_store() {
        let h = Harness::new().await;
        let seed = AdminSeed {
            username: "admin".into(),
            email: "admin@parkcharge.local".into(),
            password: "admin12345".into(),
        };
        let admin = h.identity.ensure_default_admin(&seed).await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(h.identity.ensure_default_admin(&seed).await.unwrap().is_none());
    }

    async fn alice(h: &Harness) -> User {
        h.identity
            .register("alice", "alice@example.com", "password123")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn users_manage_their_own_profile() {
        let h = Harness::new().await;
        let user = alice(&h).await;
        let caller = Caller::user(user.id.clone());

        let updated = h
            .identity
            .update_user(
                &caller,
                &user.id,
                UserChanges {
                    first_name: Some(" Alice ".into()),
                    last_name: Some("Smith".into()),
                    phone: Some("+1 555-010-2030".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));
        assert_eq!(updated.phone.as_deref(), Some("+1 555-010-2030"));

        // omitted fields stay, empty strings clear
        let cleared = h
            .identity
            .update_user(
                &caller,
                &user.id,
                UserChanges {
                    last_name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.first_name.as_deref(), Some("Alice"));
        assert_eq!(cleared.last_name, None);

        let stored = h.identity.get_user(&caller, &user.id).await.unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Alice"));
        assert_eq!(stored.last_name, None);

        let err = h
            .identity
            .update_user(
                &caller,
                &user.id,
                UserChanges {
                    phone: Some("call me".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn other_users_are_off_limits() {
        let h = Harness::new().await;
        let user = alice(&h).await;
        let stranger = Caller::user("u2");

        assert!(matches!(
            h.identity.get_user(&stranger, &user.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            h.identity.deactivate_user(&stranger, &user.id).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            h.identity
                .user_history(&stranger, &user.id, PageRequest::default())
                .await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            h.identity.list_users(&stranger, PageRequest::default()).await,
            Err(DomainError::Forbidden(_))
        ));

        let admin = Caller::admin("ops");
        assert!(h.identity.get_user(&admin, &user.id).await.is_ok());
        assert!(matches!(
            h.identity.get_user(&admin, "missing").await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let h = Harness::new().await;
        let user = alice(&h).await;
        let caller = Caller::user(user.id.clone());

        let gone = h.identity.deactivate_user(&caller, &user.id).await.unwrap();
        assert!(!gone.is_active);

        let err = h.identity.login("alice", "password123").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
        assert!(matches!(
            h.identity.deactivate_user(&caller, &user.id).await,
            Err(DomainError::InvalidState { .. })
        ));

        // the record and its wallet stay
        let stored = h
            .identity
            .get_user(&Caller::admin("ops"), &user.id)
            .await
            .unwrap();
        assert!(!stored.is_active);
        assert!(h.ledger.wallet_for_user(&user.id).await.is_ok());
    }

    #[tokio::test]
    async fn admins_list_every_user() {
        let h = Harness::new().await;
        alice(&h).await;
        h.identity
            .register("bob", "bob@example.com", "password123")
            .await
            .unwrap();

        let page = h
            .identity
            .list_users(&Caller::admin("ops"), PageRequest::new(1, 1))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].username, "alice");
    }

    #[tokio::test]
    async fn history_merges_account_activity_newest_first() {
        let h = Harness::new().await;
        let user = alice(&h).await;
        let caller = Caller::user(user.id.clone());
        h.add_spot("S1", 500).await;
        h.add_station("C1", 40).await;

        h.clock.set(at(8, 10));
        h.ledger.add_funds(&user.id, 5_000, None).await.unwrap();
        h.clock.set(at(8, 20));
        let booking = h
            .reservations
            .create(
                &caller,
                "S1",
                at(10, 0),
                at(12, 0),
            )
            .await
            .unwrap();
        h.clock.set(at(8, 30));
        let session = h.charging.start(&caller, "C1").await.unwrap();

        let history = h
            .identity
            .user_history(&caller, &user.id, PageRequest::default())
            .await
            .unwrap();
        // registration, deposit, booking, booking payment, session
        assert_eq!(history.total, 5);
        let kinds: Vec<ActivityKind> = history.items.iter().map(|e| e.kind).collect();
        assert_eq!(kinds[0], ActivityKind::ChargingSession);
        assert_eq!(history.items[0].reference_id, session.id);
        assert_eq!(kinds[4], ActivityKind::Account);
        assert!(history
            .items
            .iter()
            .any(|e| e.kind == ActivityKind::Reservation && e.reference_id == booking.id));
        assert!(history
            .items
            .iter()
            .any(|e| e.kind == ActivityKind::Transaction && e.amount == Some(-1_000)));

        let second = h
            .identity
            .user_history(&caller, &user.id, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.total, 5);
        assert_eq!(second.items[0].reference_id, history.items[2].reference_id);
    }
}
