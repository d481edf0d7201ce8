use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use joss_shared::errors::AppResult;
use joss_shared::types::ApiResponse;

use crate::models::AccountView;
use crate::services::credentials::{self, Registration};
use super::invalid_request;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /users`: credential signup. The account starts unverified and a
/// verification link is mailed.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AccountView>>)> {
    req.validate().map_err(invalid_request)?;

    let account = credentials::register(
        &state,
        Registration {
            username: req.username,
            email: req.email,
            password: req.password,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            account.view(),
            "account created, check your email to verify your address",
        )),
    ))
}
