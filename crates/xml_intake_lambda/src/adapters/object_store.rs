use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use xml_intake_core::IntakeError;

pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,

    #[error("object already exists")]
    AlreadyExists,

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn into_access_error(self, bucket: &str, key: &str) -> IntakeError {
        IntakeError::ObjectAccess {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: self.to_string(),
        }
    }
}

/// Object storage addressed by (bucket, key).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Opens a streaming read of the object. Fails with [`StoreError::NotFound`]
    /// when the key does not exist.
    async fn open_read(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError>;

    /// Returns the object size, or `None` when the key does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StoreError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Writes the object only if the key is free; the check and the write are
    /// one operation. Fails with [`StoreError::AlreadyExists`] otherwise.
    async fn put_object_if_absent(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    async fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut reader = self.open_read(bucket, key).await?;
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        Ok(body)
    }
}
