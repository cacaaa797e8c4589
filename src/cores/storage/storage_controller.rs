use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("upload of {path} failed: {message}")]
    Upload { path: String, message: String },
    #[error("signing {path} failed: {message}")]
    Sign { path: String, message: String },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bytes: Bytes, path: &str, content_type: &str) -> Result<(), StorageError>;
    async fn sign_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError>;
}
