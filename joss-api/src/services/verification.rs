use chrono::Utc;
use uuid::Uuid;

use joss_shared::clients::ClientError;
use joss_shared::errors::{AppError, AppResult, ErrorCode};

use super::tokens::{self, ConsumeError, TokenKind};
use super::within;
use crate::models::Account;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    AlreadyVerified,
}

/// Verification links point at the API, which redirects to the app.
pub fn verification_link(state: &AppState, raw: &str) -> String {
    format!(
        "{}/auth/verify-email?token={raw}",
        state.config.public_api_url.trim_end_matches('/')
    )
}

pub(crate) async fn send(state: &AppState, account: &Account, raw: &str) -> Result<(), ClientError> {
    let link = verification_link(state, raw);
    within(
        state.config.downstream_timeout(),
        state.notifier.send_verification(&account.email, &link),
    )
    .await
}

pub async fn verify_email(state: &AppState, raw: &str) -> Result<Account, ConsumeError> {
    let account = tokens::consume_verification(state.accounts.as_ref(), raw, Utc::now()).await?;
    tracing::info!(user_id = %account.id, "email verified");
    Ok(account)
}

/// Mails a new verification link, replacing the outstanding one.
pub async fn resend_verification(state: &AppState, account_id: Uuid) -> AppResult<ResendOutcome> {
    let account = state
        .accounts
        .find_account(account_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound, "account not found"))?;

    if account.is_verified {
        return Ok(ResendOutcome::AlreadyVerified);
    }

    state.throttle.check("verification", &account.email).await?;

    let token = tokens::issue(state.accounts.as_ref(), TokenKind::Verification, account.id, Utc::now()).await?;
    send(state, &account, &token.raw).await.map_err(|e| {
        tracing::error!(user_id = %account.id, error = %e, "failed to resend verification email");
        AppError::new(ErrorCode::NotifierUnavailable, "failed to send verification email")
    })?;

    tracing::info!(user_id = %account.id, "verification email resent");
    Ok(ResendOutcome::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::credentials::{register, Registration};
    use crate::test_support::harness;
    use joss_shared::clients::EmailKind;

    fn token_of(link: &str) -> String {
        link.rsplit("token=").next().unwrap().to_string()
    }

    #[tokio::test]
    async fn resend_replaces_outstanding_token() {
        let h = harness();
        let account = register(
            &h.state,
            Registration {
                username: "alice".into(),
                email: "a@x.com".into(),
                password: "longenough1".into(),
            },
        )
        .await
        .unwrap();
        let first = token_of(&h.outbox.last_link(EmailKind::Verification, "a@x.com").unwrap());

        assert_eq!(resend_verification(&h.state, account.id).await.unwrap(), ResendOutcome::Sent);
        let second = token_of(&h.outbox.last_link(EmailKind::Verification, "a@x.com").unwrap());
        assert_ne!(first, second);

        assert!(matches!(verify_email(&h.state, &first).await, Err(ConsumeError::Invalid)));
        assert!(verify_email(&h.state, &second).await.unwrap().is_verified);

        assert_eq!(
            resend_verification(&h.state, account.id).await.unwrap(),
            ResendOutcome::AlreadyVerified
        );
    }

    #[tokio::test]
    async fn resend_for_deleted_account_is_not_found() {
        let h = harness();
        let err = resend_verification(&h.state, Uuid::now_v7()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::AccountNotFound));
    }
}
