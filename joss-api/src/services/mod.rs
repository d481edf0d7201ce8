pub mod credentials;
pub mod media;
pub mod oauth;
pub mod passwords;
pub mod profile;
pub mod recovery;
pub mod throttle;
pub mod tokens;
pub mod verification;

use std::future::Future;
use std::time::Duration;

use joss_shared::clients::ClientError;

/// Bounds a downstream call; overruns surface as [`ClientError::Timeout`].
pub(crate) async fn within<T, F>(timeout: Duration, call: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ClientError::Timeout(timeout))?
}

/// Addresses are compared case-insensitively and without surrounding blanks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
