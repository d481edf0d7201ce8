//! Single-use e-mail tokens (verification and password reset).
//!
//! A token is 32 random bytes handed out hex encoded inside a link. Only the
//! SHA-256 digest is stored. Issuing overwrites any earlier token of the same
//! kind, so only the most recent one can be consumed.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use joss_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::Account;
use crate::store::{AccountStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Verification,
    PasswordReset,
}

impl TokenKind {
    pub fn ttl(self) -> Duration {
        match self {
            TokenKind::Verification => Duration::hours(24),
            TokenKind::PasswordReset => Duration::hours(1),
        }
    }

    pub fn expires_at(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl()
    }
}

/// A freshly minted token: `raw` goes into the e-mail, `hash` into the store.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub raw: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

pub fn mint(kind: TokenKind, now: DateTime<Utc>) -> MintedToken {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    let raw = hex::encode(bytes);
    let hash = hash_token(&raw);
    MintedToken {
        raw,
        hash,
        expires_at: kind.expires_at(now),
    }
}

pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Why a token could not be consumed.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("invalid token")]
    Invalid,

    #[error("expired token")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConsumeError {
    fn into_app_error(self, code: ErrorCode) -> AppError {
        match self {
            ConsumeError::Invalid | ConsumeError::Expired => {
                AppError::new(code, "invalid or expired token")
            }
            ConsumeError::Store(e) => e.into(),
        }
    }

    pub fn verification(self) -> AppError {
        self.into_app_error(ErrorCode::VerificationTokenInvalid)
    }

    pub fn reset(self) -> AppError {
        self.into_app_error(ErrorCode::ResetTokenInvalid)
    }
}

/// Mints a token of `kind` for `account_id`, replacing the previous one.
pub async fn issue(
    store: &dyn AccountStore,
    kind: TokenKind,
    account_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<MintedToken> {
    let token = mint(kind, now);
    let stored = match kind {
        TokenKind::Verification => {
            store
                .set_verification_token(account_id, &token.hash, token.expires_at)
                .await?
        }
        TokenKind::PasswordReset => {
            store
                .set_reset_token(account_id, &token.hash, token.expires_at)
                .await?
        }
    };

    if !stored {
        return Err(AppError::new(ErrorCode::AccountNotFound, "account not found"));
    }
    tracing::debug!(account_id = %account_id, ?kind, expires_at = %token.expires_at, "token issued");
    Ok(token)
}

pub async fn consume_verification(
    store: &dyn AccountStore,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<Account, ConsumeError> {
    let hash = hash_token(raw);
    if let Some(account) = store.consume_verification_token(&hash, now).await? {
        return Ok(account);
    }

    // Distinguish a stale link from a bogus one for the failure page.
    match store.find_by_verification_token(&hash).await? {
        Some(_) => Err(ConsumeError::Expired),
        None => Err(ConsumeError::Invalid),
    }
}

pub async fn consume_reset(
    store: &dyn AccountStore,
    raw: &str,
    new_password_hash: &str,
    now: DateTime<Utc>,
) -> Result<Account, ConsumeError> {
    store
        .consume_reset_token(&hash_token(raw), now, new_password_hash)
        .await?
        .ok_or(ConsumeError::Invalid)
}

/// Withdraws a reset token that could not be delivered. A newer token
/// issued in the meantime is left alone.
pub async fn revoke_reset(store: &dyn AccountStore, account_id: Uuid, token: &MintedToken) -> AppResult<()> {
    store.clear_reset_token(account_id, &token.hash).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::store::MemoryStore;

    async fn seeded() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let account = store
            .insert_account(NewAccount {
                id: Uuid::now_v7(),
                username: "alice".into(),
                email: "a@x.com".into(),
                password_hash: Some("old-hash".into()),
                is_verified: false,
                google_id: None,
                avatar_url: None,
                verification_token_hash: None,
                verification_token_expires_at: None,
            })
            .await
            .unwrap();
        (store, account.id)
    }

    #[test]
    fn minted_token_shape() {
        let now = Utc::now();
        let token = mint(TokenKind::PasswordReset, now);
        assert_eq!(token.raw.len(), 64);
        assert_eq!(token.hash, hash_token(&token.raw));
        assert_ne!(token.raw, token.hash);
        assert_eq!(token.expires_at, now + Duration::hours(1));
        assert_eq!(mint(TokenKind::Verification, now).expires_at, now + Duration::hours(24));
    }

    #[tokio::test]
    async fn verification_consumed_once() {
        let (store, id) = seeded().await;
        let now = Utc::now();
        let token = issue(&store, TokenKind::Verification, id, now).await.unwrap();

        let account = consume_verification(&store, &token.raw, now).await.unwrap();
        assert!(account.is_verified);
        assert!(account.verification_token_hash.is_none());
        assert!(account.verification_token_expires_at.is_none());

        let replay = consume_verification(&store, &token.raw, now).await.unwrap_err();
        assert!(matches!(replay, ConsumeError::Invalid));
    }

    #[tokio::test]
    async fn expired_verification_reported_as_expired() {
        let (store, id) = seeded().await;
        let issued_at = Utc::now() - Duration::hours(25);
        let token = issue(&store, TokenKind::Verification, id, issued_at).await.unwrap();

        let err = consume_verification(&store, &token.raw, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ConsumeError::Expired));
    }

    #[tokio::test]
    async fn expired_reset_rejected_even_with_correct_value() {
        let (store, id) = seeded().await;
        let issued_at = Utc::now() - Duration::minutes(61);
        let token = issue(&store, TokenKind::PasswordReset, id, issued_at).await.unwrap();

        let err = consume_reset(&store, &token.raw, "new-hash", Utc::now()).await.unwrap_err();
        assert!(matches!(err, ConsumeError::Invalid));
        let account = store.find_account(id).await.unwrap().unwrap();
        assert_eq!(account.password_hash.as_deref(), Some("old-hash"));
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_reset_token() {
        let (store, id) = seeded().await;
        let now = Utc::now();
        let first = issue(&store, TokenKind::PasswordReset, id, now).await.unwrap();
        let second = issue(&store, TokenKind::PasswordReset, id, now).await.unwrap();

        assert!(consume_reset(&store, &first.raw, "h1", now).await.is_err());
        let account = consume_reset(&store, &second.raw, "h2", now).await.unwrap();
        assert_eq!(account.password_hash.as_deref(), Some("h2"));
        assert!(account.reset_token_hash.is_none());
    }

    #[tokio::test]
    async fn issue_for_missing_account_fails() {
        let store = MemoryStore::new();
        let err = issue(&store, TokenKind::PasswordReset, Uuid::now_v7(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AccountNotFound));
    }
}
