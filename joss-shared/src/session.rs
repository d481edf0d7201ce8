use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::auth::{Claims, SessionToken};

/// Signs and verifies stateless HS256 session tokens.
///
/// Validity is purely a function of signature and expiry: nothing is stored
/// server side, so a token stays usable until `exp` even if the account is
/// removed in the meantime.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, account_id: Uuid) -> AppResult<SessionToken> {
        self.sign(&Claims::new(account_id, self.ttl_secs))
    }

    pub fn sign(&self, claims: &Claims) -> AppResult<SessionToken> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))?;
        Ok(SessionToken::bearer(token, self.ttl_secs))
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::new(ErrorCode::SessionExpired, "session has expired")
                }
                _ => {
                    tracing::debug!(error = %e, "rejected session token");
                    AppError::new(ErrorCode::SessionInvalid, "invalid session token")
                }
            }
        })?;

        Ok(token_data.claims)
    }
}

/// Application states that can hand out the session keys, so the bearer
/// extractor works with any router state.
pub trait SessionSecret {
    fn session_keys(&self) -> &SessionKeys;
}

impl SessionSecret for SessionKeys {
    fn session_keys(&self) -> &SessionKeys {
        self
    }
}

impl<T: SessionSecret> SessionSecret for Arc<T> {
    fn session_keys(&self) -> &SessionKeys {
        (**self).session_keys()
    }
}
