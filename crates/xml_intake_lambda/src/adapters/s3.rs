use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;

use crate::adapters::object_store::{ObjectReader, ObjectStore, StoreError};

/// [`ObjectStore`] backed by the AWS SDK S3 client. The client is constructed
/// once per process and shared across invocations.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn open_read(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| {
                let service_error = error.into_service_error();
                if service_error.is_no_such_key() {
                    StoreError::NotFound
                } else {
                    StoreError::backend("get_object", service_error.to_string())
                }
            })?;

        Ok(Box::new(Box::pin(output.body.into_async_read())))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StoreError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(
                output
                    .content_length()
                    .and_then(|length| u64::try_from(length).ok())
                    .unwrap_or_default(),
            )),
            Err(error) => {
                let service_error = error.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::backend("head_object", service_error.to_string()))
                }
            }
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| StoreError::backend("put_object", error.into_service_error().to_string()))
    }

    async fn put_object_if_absent(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StoreError> {
        match self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .if_none_match("*")
            .body(ByteStream::from(body))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(error) => {
                let status = error.raw_response().map(|response| response.status().as_u16());
                let service_error = error.into_service_error();
                if status == Some(412) || service_error.code() == Some("PreconditionFailed") {
                    Err(StoreError::AlreadyExists)
                } else {
                    Err(StoreError::backend(
                        "put_object_if_absent",
                        service_error.to_string(),
                    ))
                }
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| {
                StoreError::backend("delete_object", error.into_service_error().to_string())
            })
    }
}
