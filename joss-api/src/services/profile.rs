use chrono::Utc;
use uuid::Uuid;

use joss_shared::errors::{AppError, AppResult, ErrorCode};

use super::normalize_email;
use super::tokens::{self, TokenKind};
use super::verification;
use crate::models::{Account, AccountChanges};
use crate::store::AccountStore;
use crate::AppState;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 64;

/// Trims `raw` and checks it against the username rule: 3-64 characters
/// (not bytes), no whitespace.
pub fn validate_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    let chars = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&chars) || username.chars().any(char::is_whitespace) {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "username must be 3-64 characters without spaces",
        ));
    }
    Ok(username.to_string())
}

fn not_found() -> AppError {
    AppError::new(ErrorCode::AccountNotFound, "account not found")
}

/// The account behind a session. Sessions outlive deleted accounts, so a
/// valid token can still land here with nothing to return.
pub async fn get_profile(store: &dyn AccountStore, account_id: Uuid) -> AppResult<Account> {
    store.find_account(account_id).await?.ok_or_else(not_found)
}

/// Applies self-service changes. A new email address drops the verified
/// flag and gets its own verification link; a failed e-mail is logged and
/// does not undo the change.
pub async fn update_profile(state: &AppState, account_id: Uuid, mut changes: AccountChanges) -> AppResult<Account> {
    if let Some(username) = changes.username.take() {
        changes.username = Some(validate_username(&username)?);
    }

    let current = get_profile(state.accounts.as_ref(), account_id).await?;
    changes.email = changes
        .email
        .take()
        .map(|email| normalize_email(&email))
        .filter(|email| *email != current.email);
    let email_changed = changes.email.is_some();
    changes.is_verified = email_changed.then_some(false);

    let account = state
        .accounts
        .update_account(account_id, changes)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(user_id = %account.id, email_changed, "profile updated");

    if email_changed {
        let token = tokens::issue(state.accounts.as_ref(), TokenKind::Verification, account.id, Utc::now()).await?;
        if let Err(e) = verification::send(state, &account, &token.raw).await {
            tracing::error!(user_id = %account.id, error = %e, "failed to send verification email");
        }
    }
    Ok(account)
}

/// Points the avatar at `avatar_url`. The previous blob is left in place.
pub async fn update_avatar(store: &dyn AccountStore, account_id: Uuid, avatar_url: String) -> AppResult<Account> {
    let changes = AccountChanges {
        avatar_url: Some(avatar_url),
        ..Default::default()
    };
    let account = store.update_account(account_id, changes).await?.ok_or_else(not_found)?;
    tracing::info!(user_id = %account.id, "avatar updated");
    Ok(account)
}

pub async fn delete_account(store: &dyn AccountStore, account_id: Uuid) -> AppResult<()> {
    if !store.delete_account(account_id).await? {
        return Err(not_found());
    }
    tracing::info!(user_id = %account_id, "account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::store::MemoryStore;
    use crate::test_support::harness;
    use joss_shared::clients::EmailKind;

    async fn seeded(store: &dyn AccountStore, username: &str, email: &str) -> Account {
        store
            .insert_account(NewAccount {
                id: Uuid::now_v7(),
                username: username.into(),
                email: email.into(),
                password_hash: Some("hash".into()),
                is_verified: true,
                google_id: None,
                avatar_url: None,
                verification_token_hash: None,
                verification_token_expires_at: None,
            })
            .await
            .unwrap()
    }

    #[test]
    fn username_rule_applies_to_trimmed_characters() {
        assert_eq!(validate_username("  alice  ").unwrap(), "alice");
        assert!(validate_username("  ab  ").is_err());
        assert!(validate_username("al ice").is_err());
        // Two characters, four bytes.
        assert!(validate_username("éé").is_err());
        assert_eq!(validate_username("ééé").unwrap(), "ééé");
        assert!(validate_username(&"é".repeat(64)).is_ok());
        assert!(validate_username(&"é".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn avatar_overwrites_previous_reference() {
        let store = MemoryStore::new();
        let account = seeded(&store, "alice", "a@x.com").await;

        update_avatar(&store, account.id, "http://blobs/1.png".into()).await.unwrap();
        let updated = update_avatar(&store, account.id, "http://blobs/2.png".into()).await.unwrap();
        assert_eq!(updated.avatar_url.as_deref(), Some("http://blobs/2.png"));
        assert_eq!(updated.password_hash.as_deref(), Some("hash"));
    }

    #[tokio::test]
    async fn rename_to_taken_username_conflicts() {
        let h = harness();
        let alice = seeded(h.state.accounts.as_ref(), "alice", "a@x.com").await;
        seeded(h.state.accounts.as_ref(), "bob", "b@x.com").await;

        let changes = AccountChanges {
            username: Some("bob".into()),
            ..Default::default()
        };
        let err = update_profile(&h.state, alice.id, changes).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UsernameTaken));
    }

    #[tokio::test]
    async fn new_email_requires_fresh_verification() {
        let h = harness();
        let alice = seeded(h.state.accounts.as_ref(), "alice", "a@x.com").await;

        let changes = AccountChanges {
            email: Some("  New@X.com ".into()),
            ..Default::default()
        };
        let updated = update_profile(&h.state, alice.id, changes).await.unwrap();
        assert_eq!(updated.email, "new@x.com");
        assert!(!updated.is_verified);

        let stored = h.state.accounts.find_account(alice.id).await.unwrap().unwrap();
        assert!(stored.verification_token_hash.is_some());
        assert!(h.outbox.last_link(EmailKind::Verification, "new@x.com").is_some());
        assert!(h.outbox.last_link(EmailKind::Verification, "a@x.com").is_none());
    }

    #[tokio::test]
    async fn same_email_and_caller_supplied_flag_change_nothing() {
        let h = harness();
        let alice = seeded(h.state.accounts.as_ref(), "alice", "a@x.com").await;

        let changes = AccountChanges {
            email: Some("A@x.com".into()),
            is_verified: Some(false),
            ..Default::default()
        };
        let updated = update_profile(&h.state, alice.id, changes).await.unwrap();
        assert!(updated.is_verified);
        assert!(h.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn email_taken_by_another_account_conflicts() {
        let h = harness();
        let alice = seeded(h.state.accounts.as_ref(), "alice", "a@x.com").await;
        seeded(h.state.accounts.as_ref(), "bob", "b@x.com").await;

        let changes = AccountChanges {
            email: Some("B@x.com".into()),
            ..Default::default()
        };
        let err = update_profile(&h.state, alice.id, changes).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AccountAlreadyExists));

        let stored = h.state.accounts.find_account(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "a@x.com");
        assert!(stored.is_verified);
        assert!(h.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn deleted_account_profile_is_not_found() {
        let store = MemoryStore::new();
        let account = seeded(&store, "alice", "a@x.com").await;

        delete_account(&store, account.id).await.unwrap();
        let err = get_profile(&store, account.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AccountNotFound));
        assert_eq!(
            delete_account(&store, account.id).await.unwrap_err().code(),
            Some(ErrorCode::AccountNotFound)
        );
    }
}
