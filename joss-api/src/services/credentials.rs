use chrono::Utc;
use uuid::Uuid;

use joss_shared::errors::{AppError, AppResult, ErrorCode};
use joss_shared::types::auth::SessionToken;

use super::normalize_email;
use super::passwords::validate_password;
use super::profile::validate_username;
use super::tokens::{self, TokenKind};
use super::verification;
use crate::models::{Account, NewAccount};
use crate::AppState;

pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct SignedIn {
    pub account: Account,
    pub session: SessionToken,
}

fn invalid_credentials() -> AppError {
    AppError::new(ErrorCode::InvalidCredentials, "invalid email or password")
}

/// Checks an email/password pair. Unknown addresses, password-less accounts
/// and wrong passwords all fail the same way and take the same time.
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<SignedIn> {
    let email = normalize_email(email);
    let account = state.accounts.find_by_email(&email).await?;

    let stored_hash = account.as_ref().and_then(|a| a.password_hash.as_deref());
    let valid = state.passwords.verify(password, stored_hash).await?;

    let account = match account {
        Some(account) if valid => account,
        _ => return Err(invalid_credentials()),
    };

    let session = state.sessions.issue(account.id)?;
    tracing::info!(user_id = %account.id, "user logged in");

    Ok(SignedIn { account, session })
}

/// Creates an unverified account carrying a fresh verification token, then
/// mails the token. A failed e-mail is logged and does not undo the signup.
pub async fn register(state: &AppState, registration: Registration) -> AppResult<Account> {
    let username = validate_username(&registration.username)?;
    let email = normalize_email(&registration.email);
    validate_password(&registration.password)?;

    if let Some(existing) = state.accounts.find_by_username_or_email(&username, &email).await? {
        return Err(if existing.email == email {
            AppError::new(ErrorCode::AccountAlreadyExists, "email already registered")
        } else {
            AppError::new(ErrorCode::UsernameTaken, "username already taken")
        });
    }

    let password_hash = state.passwords.hash(&registration.password).await?;
    let token = tokens::mint(TokenKind::Verification, Utc::now());

    let account = state
        .accounts
        .insert_account(NewAccount {
            id: Uuid::now_v7(),
            username,
            email,
            password_hash: Some(password_hash),
            is_verified: false,
            google_id: None,
            avatar_url: None,
            verification_token_hash: Some(token.hash.clone()),
            verification_token_expires_at: Some(token.expires_at),
        })
        .await?;

    tracing::info!(user_id = %account.id, email = %account.email, "account registered");

    if let Err(e) = verification::send(state, &account, &token.raw).await {
        tracing::error!(user_id = %account.id, error = %e, "failed to send verification email");
    }

    Ok(account)
}
