//! Persistence layer
//!
//! The auth flows only depend on [`AuthStore`]; `PgAuthStore` backs it with PostgreSQL and
//! `MemoryAuthStore` keeps everything in process for development and tests.

pub mod memory;
pub mod pg;

pub use memory::MemoryAuthStore;
pub use pg::PgAuthStore;

use crate::{
    error::AppError,
    models::{
        auth::{NewRefreshToken, RefreshToken},
        user::{NewUser, User},
    },
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn get_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError>;

    /// Fails with `Conflict` when the user already holds a record.
    async fn create_refresh_token(&self, token: NewRefreshToken) -> Result<RefreshToken, AppError>;

    /// Replace the user's record in place: new token and expiry, revocation cleared.
    async fn update_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<Option<RefreshToken>, AppError>;

    /// Mark the user's record revoked. An already revoked record keeps its timestamp.
    async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError>;

    /// Connectivity probe for readiness checks
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
