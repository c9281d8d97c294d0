use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::UserStore;
use crate::error::AppError;
use crate::models::User;

/// Process-local user store. Mirrors the Postgres queries one to one.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, password_hash: &str, name: &str) -> Result<User, AppError> {
        let folded = email.to_lowercase();
        if self
            .users
            .iter()
            .any(|u| u.email.to_lowercase() == folded)
        {
            return Err(AppError::BadRequest(format!("{email} is already registered")));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            reset_password_token: String::new(),
            reset_password_expires: now,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let folded = email.to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == folded)
            .map(|u| u.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_pending_reset(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .get(&id)
            .filter(|u| u.reset_password_expires > now)
            .map(|u| u.value().clone()))
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.reset_password_token = token_hash.to_string();
            user.reset_password_expires = expires_at;
        }
        Ok(())
    }

    async fn consume_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(false);
        };
        if user.reset_password_token != token_hash || user.reset_password_expires <= now {
            return Ok(false);
        }
        user.password_hash = password_hash.to_string();
        user.reset_password_token = String::new();
        user.reset_password_expires = now;
        user.updated_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn consume_only_applies_once() {
        let store = MemoryUserStore::new();
        let user = store.create("ada@test.com", "old", "Ada").await.unwrap();
        let now = Utc::now();
        store
            .set_reset_token(user.id, "digest", now + Duration::minutes(30))
            .await
            .unwrap();

        assert!(store.consume_reset(user.id, "digest", "new", now).await.unwrap());
        assert!(!store.consume_reset(user.id, "digest", "newer", now).await.unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new");
        assert!(stored.reset_password_token.is_empty());
        assert_eq!(stored.reset_password_expires, now);
    }

    #[tokio::test]
    async fn pending_lookup_respects_expiry() {
        let store = MemoryUserStore::new();
        let user = store.create("ada@test.com", "old", "Ada").await.unwrap();
        let now = Utc::now();
        store
            .set_reset_token(user.id, "digest", now - Duration::seconds(1))
            .await
            .unwrap();

        assert!(store.find_pending_reset(user.id, now).await.unwrap().is_none());
        assert!(store.find_pending_reset(Uuid::now_v7(), now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let store = MemoryUserStore::new();
        store.create("Ada@Test.com", "old", "Ada").await.unwrap();
        assert!(store.find_by_email("ada@test.com").await.unwrap().is_some());
        assert!(store.create("ADA@test.com", "x", "").await.is_err());
    }

    #[tokio::test]
    async fn email_lookup_folds_non_ascii() {
        let store = MemoryUserStore::new();
        store.create("ÉLODIE@test.com", "old", "Élodie").await.unwrap();
        assert!(store.find_by_email("élodie@test.com").await.unwrap().is_some());
        assert!(store.create("élodie@TEST.com", "x", "").await.is_err());
    }
}
