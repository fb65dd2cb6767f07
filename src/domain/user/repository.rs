//! User repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::User;
use crate::domain::DomainResult;
use crate::shared::{PageRequest, PaginatedResult};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; `Conflict` when username or email is taken.
    async fn create(&self, user: User) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;

    /// Look a user up by username or email (login accepts either).
    async fn find_by_login(&self, login: &str) -> DomainResult<Option<User>>;

    async fn exists(&self, username: &str, email: &str) -> DomainResult<bool>;

    /// Overwrite profile fields, `is_active` and `updated_at`.
    async fn update(&self, user: User) -> DomainResult<()>;

    /// Every user, oldest first.
    async fn list(&self, page: PageRequest) -> DomainResult<PaginatedResult<User>>;

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> DomainResult<()>;

    async fn delete(&self, id: &str) -> DomainResult<()>;

    async fn count(&self) -> DomainResult<u64>;
}
