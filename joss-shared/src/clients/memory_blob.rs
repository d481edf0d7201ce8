use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BlobStore, ClientError};

/// Process-local blob store for development and tests.
pub struct MemoryBlobStore {
    public_url: String,
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new(public_url: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type and bytes stored under `key`.
    pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
        self.objects.lock().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, ClientError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| ClientError::Transport("blob store lock poisoned".into()))?;
        objects.insert(key.to_string(), (content_type.to_string(), body));
        Ok(format!("{}/{}", self.public_url, key))
    }
}
