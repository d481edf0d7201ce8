//! Account and photo persistence.
//!
//! Handlers only see the [`AccountStore`] and [`PhotoStore`] traits. The
//! PostgreSQL implementation is used in deployments, the in-memory one for
//! local runs and the test-suite. Token consumption is a single conditional
//! update in both, so a token can be spent at most once even under
//! concurrent requests.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use joss_shared::errors::{AppError, ErrorCode};

use crate::models::{Account, AccountChanges, NewAccount, NewPhoto, Photo};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which unique column a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
    ExternalId,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Username => write!(f, "username"),
            UniqueField::Email => write!(f, "email"),
            UniqueField::ExternalId => write!(f, "external identity"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already taken")]
    Conflict(UniqueField),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(UniqueField::Username) => {
                AppError::new(ErrorCode::UsernameTaken, "username already taken")
            }
            StoreError::Conflict(UniqueField::Email) => {
                AppError::new(ErrorCode::AccountAlreadyExists, "email already registered")
            }
            StoreError::Conflict(UniqueField::ExternalId) => {
                AppError::new(ErrorCode::AccountAlreadyExists, "external identity already linked")
            }
            other => AppError::unavailable("service temporarily unavailable", other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account>;

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    async fn find_by_google_id(&self, google_id: &str) -> StoreResult<Option<Account>>;

    /// Any account holding either the username or the email.
    async fn find_by_username_or_email(&self, username: &str, email: &str) -> StoreResult<Option<Account>>;

    async fn find_by_verification_token(&self, token_hash: &str) -> StoreResult<Option<Account>>;

    /// Applies `changes` (last write wins). `None` when the account is gone.
    async fn update_account(&self, id: Uuid, changes: AccountChanges) -> StoreResult<Option<Account>>;

    /// Removes the account and its photos. Returns whether a row was deleted.
    async fn delete_account(&self, id: Uuid) -> StoreResult<bool>;

    /// Sets the external id only if none is linked yet, marks the account
    /// verified and adopts `avatar_url` when the account has no avatar.
    /// `None` when the account is gone or already linked.
    async fn link_external_identity(
        &self,
        id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> StoreResult<Option<Account>>;

    /// Replaces any previous verification token. Returns whether the account exists.
    async fn set_verification_token(&self, id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<bool>;

    /// Replaces any previous reset token. Returns whether the account exists.
    async fn set_reset_token(&self, id: Uuid, token_hash: &str, expires_at: DateTime<Utc>) -> StoreResult<bool>;

    /// Clears the reset token only while it is still `token_hash`.
    async fn clear_reset_token(&self, id: Uuid, token_hash: &str) -> StoreResult<()>;

    /// Marks the holder of an unexpired verification token verified and
    /// clears the token, in one step.
    async fn consume_verification_token(&self, token_hash: &str, now: DateTime<Utc>) -> StoreResult<Option<Account>>;

    /// Sets the new password on the holder of an unexpired reset token and
    /// clears the token, in one step.
    async fn consume_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> StoreResult<Option<Account>>;

    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn insert_photo(&self, photo: NewPhoto) -> StoreResult<Photo>;

    /// Photos owned by `account_id`, newest first.
    async fn list_photos(&self, account_id: Uuid) -> StoreResult<Vec<Photo>>;
}
