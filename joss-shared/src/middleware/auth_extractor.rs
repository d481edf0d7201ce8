use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use crate::errors::{AppError, ErrorCode};
use crate::session::SessionSecret;
use crate::types::auth::AuthUser;

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: SessionSecret + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = state.session_keys().verify(token)?;
        Ok(AuthUser::from(claims))
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authentication required"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))?
        .trim();

    if token.is_empty() {
        return Err(AppError::new(ErrorCode::Unauthorized, "authentication required"));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionKeys;
    use crate::types::auth::Claims;
    use axum::http::Request;
    use uuid::Uuid;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/profile");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn valid_bearer_yields_account() {
        let keys = SessionKeys::new("test-secret", 600);
        let account_id = Uuid::now_v7();
        let session = keys.issue(account_id).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", session.token)));
        let user = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap();
        assert_eq!(user.id, account_id);
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let keys = SessionKeys::new("test-secret", 600);
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    }

    #[tokio::test]
    async fn wrong_scheme_is_unauthenticated() {
        let keys = SessionKeys::new("test-secret", 600);
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let keys = SessionKeys::new("test-secret", 600);
        let expired = keys.sign(&Claims::new(Uuid::now_v7(), -5)).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", expired.token)));
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::SessionExpired));
    }

    #[tokio::test]
    async fn forged_token_is_invalid() {
        let keys = SessionKeys::new("test-secret", 600);
        let forged = SessionKeys::new("other-secret", 600).issue(Uuid::now_v7()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", forged.token)));
        let err = AuthUser::from_request_parts(&mut parts, &keys).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::SessionInvalid));
    }
}
