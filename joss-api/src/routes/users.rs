use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use joss_shared::errors::{AppError, AppResult, ErrorCode};
use joss_shared::types::auth::AuthUser;
use joss_shared::types::ApiResponse;

use super::invalid_request;
use crate::models::{AccountChanges, AccountView};
use crate::services::profile;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub id: Option<String>,
}

/// Generic update body. Anything else sent (password, tokens, verified
/// flag) is ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UpdateUserRequest> for AccountChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            avatar_url: req.avatar_url,
            ..Default::default()
        }
    }
}

fn query_id(query: UserIdQuery) -> AppResult<Uuid> {
    let raw = query
        .id
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "user id is required"))?;
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::new(ErrorCode::ValidationError, "invalid user id"))
}

/// Accounts are self-service only.
fn ensure_self(user: &AuthUser, id: Uuid) -> AppResult<()> {
    if user.id != id {
        return Err(AppError::forbidden("cannot access another user's account"));
    }
    Ok(())
}

async fn read(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Json<ApiResponse<AccountView>>> {
    ensure_self(user, id)?;
    let account = profile::get_profile(state.accounts.as_ref(), id).await?;
    Ok(Json(ApiResponse::ok(account.view())))
}

async fn update(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    req: UpdateUserRequest,
) -> AppResult<Json<ApiResponse<AccountView>>> {
    ensure_self(user, id)?;
    req.validate().map_err(invalid_request)?;
    let account = profile::update_profile(state, id, req.into()).await?;
    Ok(Json(ApiResponse::ok(account.view())))
}

async fn delete(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Json<ApiResponse<Option<()>>>> {
    ensure_self(user, id)?;
    profile::delete_account(state.accounts.as_ref(), id).await?;
    Ok(Json(ApiResponse::message("user deleted")))
}

// --- /users/:id ---

pub async fn get_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AccountView>>> {
    read(&state, &user, id).await
}

pub async fn update_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<AccountView>>> {
    update(&state, &user, id, req).await
}

pub async fn delete_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    delete(&state, &user, id).await
}

// --- /users?id= ---

pub async fn get_user_by_query(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserIdQuery>,
) -> AppResult<Json<ApiResponse<AccountView>>> {
    read(&state, &user, query_id(query)?).await
}

pub async fn update_user_by_query(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserIdQuery>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<AccountView>>> {
    update(&state, &user, query_id(query)?, req).await
}

pub async fn delete_user_by_query(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserIdQuery>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    delete(&state, &user, query_id(query)?).await
}
