use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use joss_shared::errors::AppResult;
use joss_shared::types::ApiResponse;

use crate::services::recovery::{self, RESET_REQUESTED_MESSAGE};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Same response whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    recovery::forgot_password(&state, &req.email).await?;
    Ok(Json(ApiResponse::message(RESET_REQUESTED_MESSAGE)))
}
