//! In-process [`ObjectStore`] used by tests and local dry runs.
//!
//! Every call is appended to an operation log so callers can assert ordering
//! (for example that a delete never precedes its write). Individual keys can be
//! made to fail per operation.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapters::object_store::{ObjectReader, ObjectStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Read { bucket: String, key: String },
    Head { bucket: String, key: String },
    Put { bucket: String, key: String },
    PutIfAbsent { bucket: String, key: String },
    Delete { bucket: String, key: String },
}

impl StoreOperation {
    pub fn key(&self) -> &str {
        match self {
            Self::Read { key, .. }
            | Self::Head { key, .. }
            | Self::Put { key, .. }
            | Self::PutIfAbsent { key, .. }
            | Self::Delete { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailOn {
    Read,
    Put,
    Delete,
}

type ObjectId = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<ObjectId, Vec<u8>>>,
    failures: Mutex<BTreeSet<(FailOn, String)>>,
    operations: Mutex<Vec<StoreOperation>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        lock(&self.objects).insert(object_id(bucket, key), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects).get(&object_id(bucket, key)).cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.objects)
            .keys()
            .filter(|(owner, _)| owner == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Makes every `operation` against `key` fail until the store is dropped.
    pub fn fail(&self, operation: FailOn, key: &str) {
        lock(&self.failures).insert((operation, key.to_string()));
    }

    pub fn operations(&self) -> Vec<StoreOperation> {
        lock(&self.operations).clone()
    }

    fn log(&self, operation: StoreOperation) {
        lock(&self.operations).push(operation);
    }

    fn check(&self, operation: FailOn, key: &str) -> Result<(), StoreError> {
        if lock(&self.failures).contains(&(operation, key.to_string())) {
            let name = match operation {
                FailOn::Read => "get_object",
                FailOn::Put => "put_object",
                FailOn::Delete => "delete_object",
            };
            return Err(StoreError::backend(
                name,
                format!("simulated failure for key: {key}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn open_read(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        self.log(StoreOperation::Read {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.check(FailOn::Read, key)?;
        let body = self.object(bucket, key).ok_or(StoreError::NotFound)?;
        Ok(Box::new(Cursor::new(body)))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, StoreError> {
        self.log(StoreOperation::Head {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        Ok(self.object(bucket, key).map(|body| body.len() as u64))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.log(StoreOperation::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.check(FailOn::Put, key)?;
        lock(&self.objects).insert(object_id(bucket, key), body);
        Ok(())
    }

    async fn put_object_if_absent(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.log(StoreOperation::PutIfAbsent {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.check(FailOn::Put, key)?;
        let mut objects = lock(&self.objects);
        let id = object_id(bucket, key);
        if objects.contains_key(&id) {
            return Err(StoreError::AlreadyExists);
        }
        objects.insert(id, body);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.log(StoreOperation::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.check(FailOn::Delete, key)?;
        lock(&self.objects).remove(&object_id(bucket, key));
        Ok(())
    }
}

fn object_id(bucket: &str, key: &str) -> ObjectId {
    (bucket.to_string(), key.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_back_seeded_objects_and_logs_calls() {
        let store = InMemoryObjectStore::new();
        store.seed_object("b", "a.xml", b"hello".to_vec());

        let body = store.read_object("b", "a.xml").await.expect("object exists");
        assert_eq!(body, b"hello");
        assert_eq!(store.head_object("b", "a.xml").await.expect("head"), Some(5));
        assert_eq!(store.head_object("b", "none.xml").await.expect("head"), None);

        assert_eq!(
            store.operations(),
            vec![
                StoreOperation::Read {
                    bucket: "b".to_string(),
                    key: "a.xml".to_string()
                },
                StoreOperation::Head {
                    bucket: "b".to_string(),
                    key: "a.xml".to_string()
                },
                StoreOperation::Head {
                    bucket: "b".to_string(),
                    key: "none.xml".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn missing_objects_and_injected_failures_are_errors() {
        let store = InMemoryObjectStore::new();
        assert!(matches!(
            store.open_read("b", "missing.xml").await,
            Err(StoreError::NotFound)
        ));

        store.fail(FailOn::Put, "x.xml");
        let error = store
            .put_object("b", "x.xml", b"data".to_vec())
            .await
            .expect_err("put should fail");
        assert!(error.to_string().contains("simulated failure"));
        assert_eq!(store.object("b", "x.xml"), None);
    }

    #[tokio::test]
    async fn conditional_put_never_replaces_existing_objects() {
        let store = InMemoryObjectStore::new();
        store
            .put_object_if_absent("b", "new.xml", b"first".to_vec())
            .await
            .expect("key is free");

        assert!(matches!(
            store
                .put_object_if_absent("b", "new.xml", b"second".to_vec())
                .await,
            Err(StoreError::AlreadyExists)
        ));
        assert_eq!(store.object("b", "new.xml"), Some(b"first".to_vec()));
    }
}
