use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use joss_shared::errors::{AppError, AppResult, ErrorCode};
use joss_shared::types::auth::SessionToken;
use joss_shared::types::ApiResponse;

use crate::models::AccountView;
use crate::services::oauth;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GoogleOAuthRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct OAuthResponse {
    #[serde(flatten)]
    pub session: SessionToken,
    pub user: AccountView,
    pub is_new_user: bool,
}

/// `POST /auth/google`: exchanges an authorization code and signs the
/// resolved account in.
pub async fn google_oauth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleOAuthRequest>,
) -> AppResult<Json<ApiResponse<OAuthResponse>>> {
    if req.code.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "authorization code is required"));
    }

    let identity = state.google.exchange_code(req.code.trim()).await?;
    let signed_in = oauth::on_external_sign_in(state.accounts.as_ref(), identity).await?;
    let session = state.sessions.issue(signed_in.account.id)?;

    tracing::info!(user_id = %signed_in.account.id, is_new = signed_in.is_new_user, "google oauth login");

    Ok(Json(ApiResponse::ok(OAuthResponse {
        session,
        user: signed_in.account.view(),
        is_new_user: signed_in.is_new_user,
    })))
}
