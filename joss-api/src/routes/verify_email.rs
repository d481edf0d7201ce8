use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use joss_shared::errors::AppResult;
use joss_shared::types::auth::AuthUser;
use joss_shared::types::ApiResponse;

use crate::services::tokens::ConsumeError;
use crate::services::verification::{self, ResendOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

/// `GET /auth/verify-email?token=`: spends the token and redirects to the
/// app's login page, or to its failure page with the reason.
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Redirect {
    let app = state.config.public_app_url.trim_end_matches('/');

    let Some(token) = query.token.filter(|t| !t.trim().is_empty()) else {
        return Redirect::to(&format!("{app}/verification-failed?error=invalid-token"));
    };

    match verification::verify_email(&state, token.trim()).await {
        Ok(_) => Redirect::to(&format!("{app}/login?verified=true")),
        Err(e) => {
            let reason = match e {
                ConsumeError::Invalid => "invalid-token",
                ConsumeError::Expired => "expired-token",
                ConsumeError::Store(err) => {
                    tracing::error!(error = %err, "email verification failed");
                    "server-error"
                }
            };
            Redirect::to(&format!("{app}/verification-failed?error={reason}"))
        }
    }
}

/// `POST /auth/resend-verification`
pub async fn resend_verification(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    let message = match verification::resend_verification(&state, user.id).await? {
        ResendOutcome::Sent => "verification email sent",
        ResendOutcome::AlreadyVerified => "email already verified",
    };
    Ok(Json(ApiResponse::message(message)))
}
