use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use joss_shared::errors::{AppError, AppResult, ErrorCode};
use joss_shared::types::auth::AuthUser;
use joss_shared::types::ApiResponse;

use crate::models::Photo;
use crate::services::media::{self, ImageUpload};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfilePictureResponse {
    pub avatar_url: String,
}

struct UploadForm {
    file: Option<ImageUpload>,
    title: Option<String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(ErrorCode::PayloadTooLarge, "uploaded file is too large")
    } else {
        AppError::new(ErrorCode::BadRequest, format!("failed to read multipart: {e}"))
    }
}

/// Reads the `file` part and an optional `title` part; other parts are skipped.
async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm { file: None, title: None };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(ImageUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("title") => {
                form.title = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn require_file(form: &mut UploadForm) -> AppResult<ImageUpload> {
    form.file
        .take()
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "no file provided"))
}

// --- POST /photos ---

pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Photo>>)> {
    let mut form = read_form(multipart).await?;
    let file = require_file(&mut form)?;

    let photo = media::upload_photo(&state, user.id, file, form.title).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(photo))))
}

// --- GET /photos ---

pub async fn list_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Photo>>>> {
    let photos = media::list_photos(&state, user.id).await?;
    Ok(Json(ApiResponse::ok(photos)))
}

// --- POST /upload/profile-picture ---

pub async fn upload_profile_picture(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProfilePictureResponse>>> {
    let mut form = read_form(multipart).await?;
    let file = require_file(&mut form)?;

    let account = media::upload_avatar(&state, user.id, file).await?;
    let avatar_url = account
        .avatar_url
        .ok_or_else(|| AppError::internal("avatar missing after upload"))?;

    Ok(Json(ApiResponse::ok_with_message(
        ProfilePictureResponse { avatar_url },
        "profile picture updated",
    )))
}
