use redis::RedisError;

use joss_shared::clients::redis::RedisClient;
use joss_shared::errors::{AppError, AppResult, ErrorCode};

/// Limits outbound account e-mails to one per address per window.
///
/// Keyed by the submitted address, not by account, so a throttled response
/// says nothing about whether the address is registered. Without Redis, or
/// when Redis fails, every request passes.
#[derive(Clone)]
pub struct EmailThrottle {
    redis: Option<RedisClient>,
    window_secs: u64,
}

impl EmailThrottle {
    pub fn new(redis: Option<RedisClient>, window_secs: u64) -> Self {
        Self { redis, window_secs }
    }

    pub fn disabled() -> Self {
        Self::new(None, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some() && self.window_secs > 0
    }

    pub async fn check(&self, purpose: &str, email: &str) -> AppResult<()> {
        let Some(redis) = self.redis.as_ref().filter(|_| self.window_secs > 0) else {
            return Ok(());
        };

        let key = format!("joss:email:{purpose}:{email}");
        verdict(redis.rate_limit_check(&key, 1, self.window_secs).await)
    }

    pub async fn ping(&self) -> Option<Result<(), String>> {
        let redis = self.redis.as_ref()?;
        Some(redis.ping().await.map_err(|e| e.to_string()))
    }
}

/// Maps a window check to the response: over the limit is 429, a Redis
/// failure lets the request through.
fn verdict(within_limit: Result<bool, RedisError>) -> AppResult<()> {
    match within_limit {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::new(
            ErrorCode::EmailRateLimited,
            "please wait before requesting another email",
        )),
        Err(e) => {
            tracing::warn!(error = %e, "email throttle unavailable, allowing request");
            Ok(())
        }
    }
}
