//! In-process store backed by dashmap

use super::AuthStore;
use crate::{
    error::AppError,
    models::{
        auth::{NewRefreshToken, RefreshToken},
        user::{NewUser, User},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryAuthStore {
    users: DashMap<Uuid, User>,
    /// email -> user id
    emails: DashMap<String, Uuid>,
    /// user id -> refresh token
    refresh_tokens: DashMap<Uuid, RefreshToken>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .emails
            .get(email)
            .and_then(|id| self.users.get(id.value()).map(|u| u.clone())))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        // The email entry doubles as the uniqueness lock
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict("email already exists".to_string())),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let created = User {
                    id: Uuid::new_v4(),
                    email: user.email,
                    hashed_password: user.hashed_password,
                    created_at: now,
                    updated_at: now,
                };
                self.users.insert(created.id, created.clone());
                slot.insert(created.id);
                Ok(created)
            }
        }
    }

    async fn get_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError> {
        Ok(self.refresh_tokens.get(&user_id).map(|t| t.clone()))
    }

    async fn create_refresh_token(&self, token: NewRefreshToken) -> Result<RefreshToken, AppError> {
        match self.refresh_tokens.entry(token.user_id) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "refresh token already exists".to_string(),
            )),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = RefreshToken {
                    id: Uuid::new_v4(),
                    user_id: token.user_id,
                    token: token.token,
                    expires_at: token.expires_at,
                    revoked_at: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn update_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<Option<RefreshToken>, AppError> {
        Ok(self.refresh_tokens.get_mut(&token.user_id).map(|mut record| {
            record.token = token.token;
            record.expires_at = token.expires_at;
            record.revoked_at = None;
            record.updated_at = Utc::now();
            record.clone()
        }))
    }

    async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError> {
        Ok(self.refresh_tokens.get_mut(&user_id).map(|mut record| {
            let now = Utc::now();
            if record.revoked_at.is_none() {
                record.revoked_at = Some(now);
            }
            record.updated_at = now;
            record.clone()
        }))
    }
}
