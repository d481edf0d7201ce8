use chrono::Utc;
use uuid::Uuid;

use joss_shared::errors::{AppError, AppResult, ErrorCode};

use super::{profile, within};
use crate::models::{Account, NewPhoto, Photo};
use crate::AppState;

pub const DEFAULT_PHOTO_TITLE: &str = "Uploaded Photo";

/// An image read from a multipart request.
#[derive(Debug)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// File extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

async fn store_image(state: &AppState, folder: &str, account_id: Uuid, upload: ImageUpload) -> AppResult<String> {
    let ext = image_extension(&upload.content_type).ok_or_else(|| {
        AppError::new(
            ErrorCode::UnsupportedMediaType,
            "unsupported image format, accepted: jpeg, png, webp, gif",
        )
    })?;
    if upload.bytes.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "uploaded file is empty"));
    }

    let key = format!("{folder}/{account_id}/{}.{ext}", Uuid::now_v7());
    within(
        state.config.downstream_timeout(),
        state.blobs.upload(&key, upload.bytes, &upload.content_type),
    )
    .await
    .map_err(|e| {
        tracing::error!(user_id = %account_id, key = %key, error = %e, "blob upload failed");
        AppError::new(ErrorCode::UploadFailed, "failed to upload image")
    })
}

pub async fn upload_photo(
    state: &AppState,
    account_id: Uuid,
    upload: ImageUpload,
    title: Option<String>,
) -> AppResult<Photo> {
    // Uploading for a deleted account would only leave an orphan blob.
    profile::get_profile(state.accounts.as_ref(), account_id).await?;

    let url = store_image(state, "photos", account_id, upload).await?;
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_PHOTO_TITLE.to_string());

    let photo = state
        .photos
        .insert_photo(NewPhoto {
            id: Uuid::now_v7(),
            account_id,
            url,
            title,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!(user_id = %account_id, photo_id = %photo.id, "photo uploaded");
    Ok(photo)
}

pub async fn list_photos(state: &AppState, account_id: Uuid) -> AppResult<Vec<Photo>> {
    Ok(state.photos.list_photos(account_id).await?)
}

pub async fn upload_avatar(state: &AppState, account_id: Uuid, upload: ImageUpload) -> AppResult<Account> {
    profile::get_profile(state.accounts.as_ref(), account_id).await?;

    let url = store_image(state, "avatars", account_id, upload).await?;
    profile::update_avatar(state.accounts.as_ref(), account_id, url).await
}
