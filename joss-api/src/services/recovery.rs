//! Forgotten password flow: request a reset link, then trade it for a new
//! password.

use chrono::Utc;

use joss_shared::errors::{AppError, AppResult, ErrorCode};

use super::normalize_email;
use super::passwords::validate_password;
use super::tokens::{self, TokenKind};
use super::within;
use crate::AppState;

/// Shown whether or not the address belongs to an account.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

pub fn reset_link(state: &AppState, raw: &str) -> String {
    format!(
        "{}/reset-password?token={raw}",
        state.config.public_app_url.trim_end_matches('/')
    )
}

/// Issues and mails a reset token when `email` belongs to an account.
///
/// Unknown addresses succeed silently. If the e-mail cannot be sent the
/// token is withdrawn again and the caller gets `NotifierUnavailable`.
pub async fn forgot_password(state: &AppState, email: &str) -> AppResult<()> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "email is required"));
    }

    state.throttle.check("reset", &email).await?;

    let Some(account) = state.accounts.find_by_email(&email).await? else {
        tracing::debug!("password reset requested for unknown address");
        return Ok(());
    };

    let token = tokens::issue(state.accounts.as_ref(), TokenKind::PasswordReset, account.id, Utc::now()).await?;
    let link = reset_link(state, &token.raw);

    let sent = within(
        state.config.downstream_timeout(),
        state.notifier.send_password_reset(&account.email, &link),
    )
    .await;

    if let Err(e) = sent {
        tracing::error!(user_id = %account.id, error = %e, "failed to send password reset email");
        if let Err(revoke) = tokens::revoke_reset(state.accounts.as_ref(), account.id, &token).await {
            tracing::error!(user_id = %account.id, error = %revoke, "failed to withdraw undelivered reset token");
        }
        return Err(AppError::new(ErrorCode::NotifierUnavailable, "failed to send reset email"));
    }

    tracing::info!(user_id = %account.id, "password reset email sent");
    Ok(())
}

/// Sets a new password for the holder of `raw`. The token is spent in the
/// same store update that writes the password.
pub async fn reset_password(state: &AppState, raw: &str, new_password: &str) -> AppResult<()> {
    if raw.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "token is required"));
    }
    validate_password(new_password)?;

    let password_hash = state.passwords.hash(new_password).await?;
    let account = tokens::consume_reset(state.accounts.as_ref(), raw.trim(), &password_hash, Utc::now())
        .await
        .map_err(|e| e.reset())?;

    tracing::info!(user_id = %account.id, "password reset");
    Ok(())
}
