//! Outbound collaborators: the database pool, e-mail delivery, blob storage
//! and the Redis-backed throttle.
//!
//! E-mail and blob storage sit behind the [`Notifier`] and [`BlobStore`]
//! traits so request handlers can be exercised without third-party calls.

pub mod db;
pub mod email;
pub mod memory_blob;
pub mod minio;
pub mod redis;

use async_trait::async_trait;

pub use email::{EmailClient, EmailKind, OutboundEmail, OutboxNotifier};
pub use memory_blob::MemoryBlobStore;
pub use minio::MinioClient;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream rejected request: {0}")]
    Rejected(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Delivers account e-mails. `link` is the complete URL embedding the raw token.
/// Templates carry no user-supplied text, only links this service generated.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification(&self, to: &str, link: &str) -> Result<(), ClientError>;

    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), ClientError>;
}

/// Object storage holding uploaded images, addressed by public URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `body` under `key` and returns the public URL of the object.
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, ClientError>;

    async fn ping(&self) -> Result<(), ClientError> {
        Ok(())
    }
}
