//! Rename stage: relocates uploaded XML objects under `<docId>.xml`.
//!
//! Per record: gate on the `.xml` suffix, stream the object through the
//! identifier scanner, then write the canonical copy and delete the original
//! only once that write has succeeded. Every failure is contained to its record
//! and the batch is always acknowledged.

use std::time::Instant;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use xml_intake_core::contract::{
    decode_storage_event, delivery_payloads, HandlerResponse, ObjectRecord, RelocationEntry,
    RelocationOutcome,
};
use xml_intake_core::gate::is_eligible;
use xml_intake_core::scanner::{IdentifierScanner, ScanOptions, ScanResult, ScanStep};
use xml_intake_core::storage_keys::{canonical_key, content_sha256};
use xml_intake_core::IntakeError;

use crate::adapters::chunked_reader::ChunkedObjectReader;
use crate::adapters::ledger::RelocationLedger;
use crate::adapters::object_store::{ObjectStore, StoreError};

const COMPARE_CHUNK_SIZE: usize = 64 * 1024;

pub struct RenameDependencies<'a> {
    pub store: &'a dyn ObjectStore,
    pub ledger: &'a dyn RelocationLedger,
    pub options: ScanOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Ineligible,
    IdentifierNotFound,
    AlreadyCanonical { canonical_key: String },
    Moved { canonical_key: String },
    /// The canonical copy exists but the original could not be deleted.
    MovedWithDuplicate { canonical_key: String, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub envelope_failures: usize,
}

impl BatchSummary {
    fn count(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Moved { .. } | RecordOutcome::MovedWithDuplicate { .. } => {
                self.moved += 1
            }
            RecordOutcome::Ineligible
            | RecordOutcome::IdentifierNotFound
            | RecordOutcome::AlreadyCanonical { .. } => self.skipped += 1,
        }
    }
}

/// Processes one invocation and always returns the fixed acknowledgment.
pub async fn handle_rename_event(
    event: &Value,
    deps: &RenameDependencies<'_>,
    cancel: &CancellationToken,
) -> HandlerResponse {
    let summary = process_rename_event(event, deps, cancel).await;
    tracing::info!(
        component = "rename_handler",
        event = "batch_completed",
        records = summary.records,
        moved = summary.moved,
        skipped = summary.skipped,
        failed = summary.failed,
        envelope_failures = summary.envelope_failures,
        "rename batch completed"
    );
    HandlerResponse::acknowledged()
}

pub async fn process_rename_event(
    event: &Value,
    deps: &RenameDependencies<'_>,
    cancel: &CancellationToken,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    let payloads = match delivery_payloads(event) {
        Ok(value) => value,
        Err(error) => {
            log_envelope_failure(&error, None);
            summary.envelope_failures += 1;
            return summary;
        }
    };

    for (message_index, payload) in payloads.into_iter().enumerate() {
        let records = match payload.and_then(|body| decode_storage_event(&body)) {
            Ok(value) => value,
            Err(error) => {
                log_envelope_failure(&error, Some(message_index));
                summary.envelope_failures += 1;
                continue;
            }
        };

        for record in records {
            summary.records += 1;
            let record = match record {
                Ok(value) => value,
                Err(error) => {
                    log_envelope_failure(&error, Some(message_index));
                    summary.failed += 1;
                    continue;
                }
            };

            if cancel.is_cancelled() {
                tracing::warn!(
                    component = "rename_handler",
                    event = "record_skipped",
                    bucket = %record.bucket,
                    key = %record.key,
                    reason = "deadline reached before record started"
                );
                summary.skipped += 1;
                continue;
            }

            match process_record(&record, deps, cancel).await {
                Ok(outcome) => summary.count(&outcome),
                Err(error) => {
                    tracing::error!(
                        component = "rename_handler",
                        event = "record_failed",
                        bucket = %record.bucket,
                        key = %record.key,
                        error_kind = error.kind(),
                        error = %error
                    );
                    record_ledger_entry(deps.ledger, failed_entry(&record, &error)).await;
                    summary.failed += 1;
                }
            }
        }
    }

    summary
}

/// Runs gate, scan and relocation for one record.
pub async fn process_record(
    record: &ObjectRecord,
    deps: &RenameDependencies<'_>,
    cancel: &CancellationToken,
) -> Result<RecordOutcome, IntakeError> {
    if !is_eligible(&record.key) {
        tracing::info!(
            component = "rename_handler",
            event = "record_skipped",
            bucket = %record.bucket,
            key = %record.key,
            reason = "not an .xml object"
        );
        return Ok(RecordOutcome::Ineligible);
    }

    let started_at = Instant::now();
    let reader = deps
        .store
        .open_read(&record.bucket, &record.key)
        .await
        .map_err(|error| error.into_access_error(&record.bucket, &record.key))?;
    let mut chunks = ChunkedObjectReader::new(reader, deps.options.chunk_size);

    let scan = scan_stream(&mut chunks, deps.options, cancel)
        .await
        .map_err(|error| with_location(error, record))?;

    let (identifier, mut content) = match scan {
        ScanResult::Found {
            identifier,
            content,
        } => (identifier, content),
        ScanResult::NotFound { content } => {
            let error = IntakeError::IdentifierNotFound {
                bucket: record.bucket.clone(),
                key: record.key.clone(),
            };
            tracing::warn!(
                component = "rename_handler",
                event = "record_skipped",
                bucket = %record.bucket,
                key = %record.key,
                bytes_scanned = content.len(),
                error_kind = error.kind(),
                error = %error
            );
            record_ledger_entry(
                deps.ledger,
                RelocationEntry {
                    bucket: record.bucket.clone(),
                    original_key: record.key.clone(),
                    canonical_key: None,
                    content_sha256: None,
                    content_bytes: content.len(),
                    outcome: RelocationOutcome::NotFound,
                    error: Some(error.to_string()),
                    recorded_at: now_rfc3339(),
                },
            )
            .await;
            return Ok(RecordOutcome::IdentifierNotFound);
        }
    };

    let bytes_scanned = content.len();
    drain_remaining(&mut chunks, &mut content, cancel)
        .await
        .map_err(|error| with_location(error, record))?;

    tracing::info!(
        component = "rename_handler",
        event = "identifier_found",
        bucket = %record.bucket,
        key = %record.key,
        identifier = %identifier,
        bytes_scanned,
        object_bytes = content.len(),
        scan_ms = started_at.elapsed().as_millis() as u64
    );

    let digest = content_sha256(&content);
    let content_bytes = content.len();
    let outcome = relocate(deps.store, record, &identifier, content).await?;

    let (ledger_outcome, canonical, error) = match &outcome {
        RecordOutcome::Moved { canonical_key } => {
            (RelocationOutcome::Moved, canonical_key.clone(), None)
        }
        RecordOutcome::MovedWithDuplicate {
            canonical_key,
            error,
        } => (
            RelocationOutcome::MovedWithDuplicate,
            canonical_key.clone(),
            Some(error.clone()),
        ),
        RecordOutcome::AlreadyCanonical { canonical_key } => {
            (RelocationOutcome::AlreadyCanonical, canonical_key.clone(), None)
        }
        RecordOutcome::Ineligible | RecordOutcome::IdentifierNotFound => return Ok(outcome),
    };
    record_ledger_entry(
        deps.ledger,
        RelocationEntry {
            bucket: record.bucket.clone(),
            original_key: record.key.clone(),
            canonical_key: Some(canonical),
            content_sha256: Some(digest),
            content_bytes,
            outcome: ledger_outcome,
            error,
            recorded_at: now_rfc3339(),
        },
    )
    .await;

    Ok(outcome)
}

/// Feeds chunks to the scanner until the identifier is found or the stream
/// ends. The token is checked before every chunk read.
pub async fn scan_stream<R: AsyncRead + Unpin>(
    chunks: &mut ChunkedObjectReader<R>,
    options: ScanOptions,
    cancel: &CancellationToken,
) -> Result<ScanResult, IntakeError> {
    let mut scanner = IdentifierScanner::new(options);
    loop {
        if cancel.is_cancelled() {
            return Err(IntakeError::Cancelled);
        }
        let Some(chunk) = chunks.next_chunk().await.map_err(stream_error)? else {
            break;
        };
        if scanner.push_chunk(&chunk) == ScanStep::Found {
            break;
        }
    }
    Ok(scanner.finish())
}

/// The scan stops at the matching chunk; the relocated copy must still carry
/// the whole object, so the rest of the stream is appended without searching.
async fn drain_remaining<R: AsyncRead + Unpin>(
    chunks: &mut ChunkedObjectReader<R>,
    content: &mut Vec<u8>,
    cancel: &CancellationToken,
) -> Result<(), IntakeError> {
    loop {
        if cancel.is_cancelled() {
            return Err(IntakeError::Cancelled);
        }
        match chunks.next_chunk().await.map_err(stream_error)? {
            Some(chunk) => content.extend_from_slice(&chunk),
            None => return Ok(()),
        }
    }
}

/// Writes `content` under the canonical key and only then deletes the
/// original. A failed write leaves the original untouched; a failed delete
/// leaves both copies and still counts as moved.
pub async fn relocate(
    store: &dyn ObjectStore,
    record: &ObjectRecord,
    identifier: &str,
    content: Vec<u8>,
) -> Result<RecordOutcome, IntakeError> {
    let Some(target) = canonical_key(identifier) else {
        return Err(IntakeError::Relocation {
            bucket: record.bucket.clone(),
            key: record.key.clone(),
            message: format!(
                "identifier {identifier:?} contains '/' and cannot name a root-level key"
            ),
        });
    };
    if target == record.key {
        tracing::info!(
            component = "rename_handler",
            event = "record_skipped",
            bucket = %record.bucket,
            key = %record.key,
            reason = "object already has its canonical key"
        );
        return Ok(RecordOutcome::AlreadyCanonical {
            canonical_key: target,
        });
    }

    write_canonical(store, &record.bucket, &target, content)
        .await
        .map_err(|message| IntakeError::Relocation {
            bucket: record.bucket.clone(),
            key: record.key.clone(),
            message,
        })?;

    match store.delete_object(&record.bucket, &record.key).await {
        Ok(()) => {
            tracing::info!(
                component = "rename_handler",
                event = "object_moved",
                bucket = %record.bucket,
                key = %record.key,
                canonical_key = %target
            );
            Ok(RecordOutcome::Moved {
                canonical_key: target,
            })
        }
        Err(error) => {
            let error = error.into_access_error(&record.bucket, &record.key);
            tracing::error!(
                component = "rename_handler",
                event = "delete_failed",
                bucket = %record.bucket,
                key = %record.key,
                canonical_key = %target,
                error_kind = error.kind(),
                error = %error
            );
            Ok(RecordOutcome::MovedWithDuplicate {
                canonical_key: target,
                error: error.to_string(),
            })
        }
    }
}

/// Conditional write: the key is only written while free. An existing
/// canonical object with identical content is accepted as is, one with
/// different content is never overwritten. Sizes are compared before any
/// stored bytes are read.
async fn write_canonical(
    store: &dyn ObjectStore,
    bucket: &str,
    target: &str,
    content: Vec<u8>,
) -> Result<(), String> {
    let content_len = content.len() as u64;
    let digest = content_sha256(&content);

    match store.put_object_if_absent(bucket, target, content).await {
        Ok(()) => return Ok(()),
        Err(StoreError::AlreadyExists) => {}
        Err(error) => return Err(format!("writing canonical key {target}: {error}")),
    }

    let existing_len = store
        .head_object(bucket, target)
        .await
        .map_err(|error| format!("checking canonical key {target}: {error}"))?;
    if existing_len == Some(content_len) {
        let existing_digest = stored_sha256(store, bucket, target)
            .await
            .map_err(|error| format!("reading canonical key {target}: {error}"))?;
        if existing_digest == digest {
            tracing::info!(
                component = "rename_handler",
                event = "canonical_exists",
                bucket,
                canonical_key = target,
                "canonical copy already present with identical content"
            );
            return Ok(());
        }
    }

    Err(format!("canonical key {target} already holds different content"))
}

async fn stored_sha256(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<String, StoreError> {
    let reader = store.open_read(bucket, key).await?;
    let mut chunks = ChunkedObjectReader::new(reader, COMPARE_CHUNK_SIZE);
    let mut hasher = Sha256::new();
    while let Some(chunk) = chunks.next_chunk().await? {
        hasher.update(&chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn stream_error(error: std::io::Error) -> IntakeError {
    IntakeError::ObjectAccess {
        bucket: String::new(),
        key: String::new(),
        message: format!("stream read failed: {error}"),
    }
}

fn with_location(error: IntakeError, record: &ObjectRecord) -> IntakeError {
    match error {
        IntakeError::ObjectAccess { message, .. } => IntakeError::ObjectAccess {
            bucket: record.bucket.clone(),
            key: record.key.clone(),
            message,
        },
        other => other,
    }
}

fn failed_entry(record: &ObjectRecord, error: &IntakeError) -> RelocationEntry {
    RelocationEntry {
        bucket: record.bucket.clone(),
        original_key: record.key.clone(),
        canonical_key: None,
        content_sha256: None,
        content_bytes: 0,
        outcome: RelocationOutcome::Failed,
        error: Some(error.to_string()),
        recorded_at: now_rfc3339(),
    }
}

async fn record_ledger_entry(ledger: &dyn RelocationLedger, entry: RelocationEntry) {
    if let Err(error) = ledger.record(&entry).await {
        tracing::error!(
            component = "rename_handler",
            event = "ledger_write_failed",
            bucket = %entry.bucket,
            key = %entry.original_key,
            outcome = entry.outcome.as_str(),
            error = %error
        );
    }
}

fn log_envelope_failure(error: &IntakeError, message_index: Option<usize>) {
    tracing::error!(
        component = "rename_handler",
        event = "envelope_rejected",
        message_index,
        error_kind = error.kind(),
        error = %error
    );
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
