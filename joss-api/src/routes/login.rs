use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use joss_shared::errors::AppResult;
use joss_shared::types::ApiResponse;

use crate::models::AccountSummary;
use crate::services::credentials;
use super::invalid_request;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: AccountSummary,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    req.validate().map_err(invalid_request)?;

    let signed_in = credentials::login(&state, &req.email, &req.password).await?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token: signed_in.session.token,
        token_type: signed_in.session.token_type,
        expires_in: signed_in.session.expires_in,
        user: signed_in.account.summary(),
    })))
}
