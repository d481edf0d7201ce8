use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use joss_shared::errors::AppResult;
use joss_shared::types::auth::AuthUser;
use joss_shared::types::ApiResponse;

use crate::services::profile;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

// --- GET /profile ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let account = profile::get_profile(state.accounts.as_ref(), user.id).await?;

    Ok(Json(ApiResponse::ok(ProfileResponse {
        id: account.id,
        username: account.username,
        email: account.email,
        avatar_url: account.avatar_url,
        is_verified: account.is_verified,
    })))
}
