use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use joss_shared::errors::{AppError, AppResult, ErrorCode};
use joss_shared::types::auth::OAuthProvider;

use super::normalize_email;
use super::profile::USERNAME_MIN_CHARS;
use crate::models::{Account, NewAccount};
use crate::store::{AccountStore, StoreError, UniqueField};

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const USERNAME_ATTEMPTS: usize = 5;
const USERNAME_BASE_MAX: usize = 48;

/// An identity asserted by an external provider.
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub provider: OAuthProvider,
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug)]
pub struct ExternalSignIn {
    pub account: Account,
    pub is_new_user: bool,
}

/// Resolves an external identity to a local account: by external id, then
/// by e-mail (linking the identity), else by creating a verified account.
pub async fn on_external_sign_in(store: &dyn AccountStore, identity: ExternalIdentity) -> AppResult<ExternalSignIn> {
    let email = identity
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::MissingEmail, "identity provider did not supply an email"))?;

    if let Some(account) = store.find_by_google_id(&identity.subject).await? {
        return Ok(ExternalSignIn { account, is_new_user: false });
    }

    if let Some(account) = store.find_by_email(&email).await? {
        let account = link_if_unlinked(store, account, &identity).await?;
        return Ok(ExternalSignIn { account, is_new_user: false });
    }

    let mut suffix = || rand::thread_rng().gen_range(0..10_000u32);
    match create_account(store, &email, &identity, &mut suffix).await {
        Ok(account) => {
            tracing::info!(user_id = %account.id, provider = %identity.provider, "account created from external identity");
            Ok(ExternalSignIn { account, is_new_user: true })
        }
        // Lost a race with a concurrent sign-in for the same person.
        Err(StoreError::Conflict(UniqueField::Email | UniqueField::ExternalId)) => {
            let account = match store.find_by_google_id(&identity.subject).await? {
                Some(account) => account,
                None => store
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| AppError::internal("account vanished during external sign-in"))?,
            };
            Ok(ExternalSignIn { account, is_new_user: false })
        }
        Err(e) => Err(e.into()),
    }
}

async fn link_if_unlinked(store: &dyn AccountStore, account: Account, identity: &ExternalIdentity) -> AppResult<Account> {
    if account.google_id.is_some() {
        return Ok(account);
    }

    match store
        .link_external_identity(account.id, &identity.subject, identity.avatar_url.as_deref())
        .await?
    {
        Some(linked) => {
            tracing::info!(user_id = %linked.id, provider = %identity.provider, "external identity linked");
            Ok(linked)
        }
        None => store
            .find_account(account.id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound, "account not found")),
    }
}

/// Inserts the account under `{base}{suffix}`, drawing a fresh suffix on
/// every username collision.
async fn create_account(
    store: &dyn AccountStore,
    email: &str,
    identity: &ExternalIdentity,
    next_suffix: &mut (dyn FnMut() -> u32 + Send),
) -> Result<Account, StoreError> {
    let base = username_base(identity.display_name.as_deref(), email);
    let mut last_err = StoreError::Conflict(UniqueField::Username);

    for _ in 0..USERNAME_ATTEMPTS {
        let username = format!("{base}{}", next_suffix());
        let result = store
            .insert_account(NewAccount {
                id: Uuid::now_v7(),
                username,
                email: email.to_string(),
                password_hash: None,
                is_verified: true,
                google_id: Some(identity.subject.clone()),
                avatar_url: identity.avatar_url.clone(),
                verification_token_hash: None,
                verification_token_expires_at: None,
            })
            .await;

        match result {
            Err(StoreError::Conflict(UniqueField::Username)) => {
                tracing::debug!(base = %base, "generated username taken, retrying");
                last_err = StoreError::Conflict(UniqueField::Username);
            }
            other => return other,
        }
    }

    Err(last_err)
}

/// Display name without whitespace, lowercased; the e-mail local part when
/// there is no usable name. Short bases are padded so that base plus suffix
/// always meets the username minimum.
pub fn username_base(display_name: Option<&str>, email: &str) -> String {
    let from_name: String = display_name
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let base = if from_name.is_empty() {
        email.split('@').next().unwrap_or_default().to_lowercase()
    } else {
        from_name
    };

    let mut base: String = base.chars().take(USERNAME_BASE_MAX).collect();
    if base.chars().count() < USERNAME_MIN_CHARS {
        base.push_str("user");
    }
    base
}

// --- Google ---

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Authorization-code exchange against Google.
#[derive(Clone)]
pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub async fn exchange_code(&self, code: &str) -> AppResult<ExternalIdentity> {
        if !self.is_configured() {
            return Err(AppError::new(ErrorCode::OAuthError, "google sign-in is not configured"));
        }

        let token_response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::unavailable("google sign-in failed", format!("google token exchange failed: {e}")))?;

        if !token_response.status().is_success() {
            let body = token_response.text().await.unwrap_or_default();
            tracing::warn!(body = %body, "google rejected authorization code");
            return Err(AppError::new(ErrorCode::OAuthError, "invalid authorization code"));
        }

        let google_token: GoogleTokenResponse = token_response
            .json()
            .await
            .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("invalid token response: {e}")))?;

        let user_info: GoogleUserInfo = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&google_token.access_token)
            .send()
            .await
            .map_err(|e| AppError::unavailable("google sign-in failed", format!("google userinfo failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("google userinfo rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("invalid userinfo response: {e}")))?;

        Ok(ExternalIdentity {
            provider: OAuthProvider::Google,
            subject: user_info.sub,
            email: user_info.email,
            display_name: user_info.name,
            avatar_url: user_info.picture,
        })
    }
}
