use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;

use super::{BlobStore, ClientError};

/// S3-compatible object storage (MinIO in development).
#[derive(Clone)]
pub struct MinioClient {
    client: S3Client,
    bucket: String,
    public_url: String,
    timeout: Duration,
}

impl MinioClient {
    pub async fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
        timeout: Duration,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "joss");

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = S3Client::from_conf(config);

        // Bucket may already exist; any other failure shows up on first upload.
        if let Err(e) = client.create_bucket().bucket(bucket).send().await {
            tracing::debug!(error = %e, bucket = %bucket, "create_bucket skipped");
        }

        tracing::info!(endpoint = %endpoint, bucket = %bucket, "blob store client initialized");

        Self {
            client,
            bucket: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl BlobStore for MinioClient {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, ClientError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send();

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
            .map_err(|e| ClientError::Transport(format!("upload failed: {e}")))?;

        Ok(format!("{}/{}/{}", self.public_url, self.bucket, key))
    }

    async fn ping(&self) -> Result<(), ClientError> {
        let request = self.client.head_bucket().bucket(&self.bucket).send();

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
            .map_err(|e| ClientError::Transport(format!("head_bucket failed: {e}")))?;

        Ok(())
    }
}
