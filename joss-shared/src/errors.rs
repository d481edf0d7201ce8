use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Account and media errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    AccountAlreadyExists,
    SessionExpired,
    SessionInvalid,
    OAuthError,
    MissingEmail,
    PasswordTooWeak,
    VerificationTokenInvalid,
    ResetTokenInvalid,
    EmailRateLimited,
    NotifierUnavailable,

    // Accounts and media (E2xxx)
    AccountNotFound,
    UsernameTaken,
    UploadFailed,
    UnsupportedMediaType,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::AccountAlreadyExists => "E1002",
            Self::SessionExpired => "E1003",
            Self::SessionInvalid => "E1004",
            Self::OAuthError => "E1005",
            Self::MissingEmail => "E1006",
            Self::PasswordTooWeak => "E1007",
            Self::VerificationTokenInvalid => "E1008",
            Self::ResetTokenInvalid => "E1009",
            Self::EmailRateLimited => "E1010",
            Self::NotifierUnavailable => "E1011",

            // Accounts and media
            Self::AccountNotFound => "E2001",
            Self::UsernameTaken => "E2002",
            Self::UploadFailed => "E2003",
            Self::UnsupportedMediaType => "E2004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable | Self::NotifierUnavailable
            | Self::UploadFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::MissingEmail | Self::OAuthError | Self::UnsupportedMediaType
            | Self::VerificationTokenInvalid | Self::ResetTokenInvalid => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::AccountNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::SessionExpired
            | Self::SessionInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::EmailRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::AccountAlreadyExists | Self::UsernameTaken => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Downstream dependency failed. The detail is logged, the client gets
    /// the generic `public_message`.
    pub fn unavailable(public_message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "downstream unavailable");
        Self::new(ErrorCode::ServiceUnavailable, public_message)
    }

    /// Returns the error code for known errors, `None` for the catch-all.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Internal(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() {
                    tracing::error!(code = code.code(), "{message}");
                } else {
                    tracing::debug!(code = code.code(), "{message}");
                }
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn known_error_renders_envelope() {
        let (status, value) =
            body_json(AppError::new(ErrorCode::AccountAlreadyExists, "username or email already exists")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E1002");
        assert_eq!(value["error"]["message"], "username or email already exists");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_included_when_present() {
        let err = AppError::with_details(
            ErrorCode::ValidationError,
            "invalid request",
            serde_json::json!({ "field": "email" }),
        );
        let (status, value) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"]["details"]["field"], "email");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused by 10.0.0.3"));
        let (status, value) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn unavailable_uses_public_message() {
        let err = AppError::unavailable("failed to fetch profile", "pool timed out");
        let (status, value) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"]["code"], "E0007");
        assert_eq!(value["error"]["message"], "failed to fetch profile");
    }

    #[test]
    fn taxonomy_statuses() {
        assert_eq!(ErrorCode::ValidationError.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::SessionInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::AccountAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::AccountNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ResetTokenInvalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_error_has_no_code() {
        assert_eq!(AppError::Internal(anyhow::anyhow!("x")).code(), None);
    }
}
