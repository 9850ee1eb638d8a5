use std::sync::Arc;

use async_trait::async_trait;
use xml_intake_core::contract::{RelocationEntry, RelocationOutcome};
use xml_intake_core::storage_keys::ledger_object_key;

use crate::adapters::object_store::{ObjectStore, StoreError};

/// Durable record of rename outcomes, so a swallowed failure still leaves a
/// trace that can be replayed or audited.
#[async_trait]
pub trait RelocationLedger: Send + Sync {
    async fn record(&self, entry: &RelocationEntry) -> Result<(), StoreError>;
}

/// Used when no ledger bucket is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLedger;

#[async_trait]
impl RelocationLedger for DisabledLedger {
    async fn record(&self, _entry: &RelocationEntry) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Writes one JSON object per source location. A later attempt for the same
/// source overwrites the earlier entry, except that a failure never replaces
/// a recorded move.
pub struct StoreLedger {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
}

impl StoreLedger {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn entry_key(&self, bucket: &str, original_key: &str) -> String {
        ledger_object_key(&self.prefix, bucket, original_key)
    }

    /// Reads the current entry for a source. Unparseable entries are treated
    /// as absent so they can be replaced.
    pub async fn current_entry(
        &self,
        bucket: &str,
        original_key: &str,
    ) -> Result<Option<RelocationEntry>, StoreError> {
        let key = self.entry_key(bucket, original_key);
        match self.store.read_object(&self.bucket, &key).await {
            Ok(body) => Ok(serde_json::from_slice(&body).ok()),
            Err(StoreError::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl RelocationLedger for StoreLedger {
    async fn record(&self, entry: &RelocationEntry) -> Result<(), StoreError> {
        let body = serde_json::to_vec(entry)
            .map_err(|error| StoreError::backend("serialize_ledger_entry", error.to_string()))?;
        let key = self.entry_key(&entry.bucket, &entry.original_key);

        if entry.outcome == RelocationOutcome::Failed {
            let existing = self
                .current_entry(&entry.bucket, &entry.original_key)
                .await?;
            if let Some(existing) = existing.filter(|current| current.outcome.is_move()) {
                tracing::warn!(
                    component = "relocation_ledger",
                    event = "failure_not_recorded",
                    bucket = %entry.bucket,
                    key = %entry.original_key,
                    canonical_key = existing.canonical_key.as_deref().unwrap_or_default(),
                    error = entry.error.as_deref().unwrap_or_default(),
                    "keeping the recorded move for this source"
                );
                return Ok(());
            }
        }

        self.store.put_object(&self.bucket, &key, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{FailOn, InMemoryObjectStore};

    fn entry(outcome: RelocationOutcome) -> RelocationEntry {
        RelocationEntry {
            bucket: "intake".to_string(),
            original_key: "migrate/a.xml".to_string(),
            canonical_key: Some("A.xml".to_string()),
            content_sha256: None,
            content_bytes: 10,
            outcome,
            error: None,
            recorded_at: "2026-10-19T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn writes_entry_as_json_under_prefix() {
        let store = Arc::new(InMemoryObjectStore::new());
        let ledger = StoreLedger::new(store.clone(), "audit", "relocation-ledger");

        ledger
            .record(&entry(RelocationOutcome::Moved))
            .await
            .expect("ledger write succeeds");

        let key = ledger.entry_key("intake", "migrate/a.xml");
        assert!(key.starts_with("relocation-ledger/"));
        let body = store.object("audit", &key).expect("entry written");
        let stored: RelocationEntry = serde_json::from_slice(&body).expect("entry parses");
        assert_eq!(stored.outcome, RelocationOutcome::Moved);
        assert_eq!(stored.canonical_key.as_deref(), Some("A.xml"));
    }

    #[tokio::test]
    async fn later_entry_replaces_earlier_one() {
        let store = Arc::new(InMemoryObjectStore::new());
        let ledger = StoreLedger::new(store.clone(), "audit", "ledger");

        ledger.record(&entry(RelocationOutcome::Failed)).await.expect("first");
        ledger.record(&entry(RelocationOutcome::Moved)).await.expect("second");

        assert_eq!(store.keys("audit").len(), 1);
    }

    #[tokio::test]
    async fn failure_after_move_keeps_move_entry() {
        let store = Arc::new(InMemoryObjectStore::new());
        let ledger = StoreLedger::new(store.clone(), "audit", "ledger");

        ledger.record(&entry(RelocationOutcome::Moved)).await.expect("move");
        let mut failure = entry(RelocationOutcome::Failed);
        failure.canonical_key = None;
        failure.error = Some("object not found".to_string());
        ledger.record(&failure).await.expect("failure is accepted");

        let current = ledger
            .current_entry("intake", "migrate/a.xml")
            .await
            .expect("entry readable")
            .expect("entry present");
        assert_eq!(current.outcome, RelocationOutcome::Moved);
        assert_eq!(current.canonical_key.as_deref(), Some("A.xml"));
    }

    #[tokio::test]
    async fn failure_replaces_entries_that_are_not_moves() {
        let store = Arc::new(InMemoryObjectStore::new());
        let ledger = StoreLedger::new(store.clone(), "audit", "ledger");

        ledger.record(&entry(RelocationOutcome::NotFound)).await.expect("not found");
        ledger.record(&entry(RelocationOutcome::Failed)).await.expect("failure");

        let current = ledger
            .current_entry("intake", "migrate/a.xml")
            .await
            .expect("entry readable")
            .expect("entry present");
        assert_eq!(current.outcome, RelocationOutcome::Failed);
    }

    #[tokio::test]
    async fn surfaces_store_failures() {
        let store = Arc::new(InMemoryObjectStore::new());
        let ledger = StoreLedger::new(store.clone(), "audit", "ledger");
        store.fail(FailOn::Put, &ledger.entry_key("intake", "migrate/a.xml"));

        assert!(ledger.record(&entry(RelocationOutcome::Moved)).await.is_err());
    }
}
