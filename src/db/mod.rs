pub mod memory;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;

pub use memory::MemoryUserStore;

/// Persistence seam for user records and their embedded reset request.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, email: &str, password_hash: &str, name: &str) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// The user, if their reset request expires after `now`.
    async fn find_pending_reset(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Replace the password hash, clear the token and expire the request at
    /// `now`. Applies only while the stored token is `token_hash` and still
    /// open; returns `false` when nothing was changed.
    async fn consume_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, email: &str, password_hash: &str, name: &str) -> Result<User, AppError> {
        Ok(users::create(&self.pool, email, password_hash, name).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(users::find_by_email(&self.pool, email).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(users::find_by_id(&self.pool, id).await?)
    }

    async fn find_pending_reset(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        Ok(users::find_pending_reset(&self.pool, id, now).await?)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        Ok(users::set_reset_token(&self.pool, id, token_hash, expires_at).await?)
    }

    async fn consume_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(users::consume_reset(&self.pool, id, token_hash, password_hash, now).await?)
    }
}
