use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use joss_shared::errors::AppResult;
use joss_shared::types::ApiResponse;

use crate::services::recovery;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    recovery::reset_password(&state, &req.token, &req.password).await?;
    Ok(Json(ApiResponse::message("password reset successful")))
}
