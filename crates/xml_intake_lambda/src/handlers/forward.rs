use serde_json::Value;
use xml_intake_core::contract::{
    decode_storage_event, delivery_payloads, HandlerResponse, ObjectRecord,
    FORWARD_SUCCESS_MESSAGE,
};
use xml_intake_core::extract::extract_from_bytes;
use xml_intake_core::IntakeError;

use crate::adapters::forwarder::DocumentSink;
use crate::adapters::object_store::ObjectStore;

pub struct ForwardDependencies<'a> {
    pub store: &'a dyn ObjectStore,
    pub sink: &'a dyn DocumentSink,
    pub namespace: &'a str,
}

/// Extracts document identifications from every object named by the event and
/// posts them to the sink. Objects are isolated from each other; the response
/// carries the status of the first failure, or 200 when all were forwarded.
pub async fn handle_forward_event(event: &Value, deps: &ForwardDependencies<'_>) -> HandlerResponse {
    let mut first_failure: Option<IntakeError> = None;
    let mut forwarded = 0usize;

    for record in decode_records(event) {
        let result = match record {
            Ok(record) => forward_object(&record, deps).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(count) => forwarded += count,
            Err(error) => {
                tracing::error!(
                    component = "forward_handler",
                    event = "object_failed",
                    error_kind = error.kind(),
                    error = %error
                );
                if first_failure.is_none() {
                    first_failure = Some(error);
                }
            }
        }
    }

    tracing::info!(
        component = "forward_handler",
        event = "batch_completed",
        forwarded,
        failed = first_failure.is_some(),
        "forward batch completed"
    );

    match first_failure {
        None => HandlerResponse::with_status(200, FORWARD_SUCCESS_MESSAGE),
        Some(error) => HandlerResponse::with_status(error.status_code(), &error.to_string()),
    }
}

fn decode_records(event: &Value) -> Vec<Result<ObjectRecord, IntakeError>> {
    let payloads = match delivery_payloads(event) {
        Ok(value) => value,
        Err(error) => return vec![Err(error)],
    };

    let mut records = Vec::new();
    for payload in payloads {
        match payload.and_then(|body| decode_storage_event(&body)) {
            Ok(decoded) => records.extend(decoded),
            Err(error) => records.push(Err(error)),
        }
    }
    records
}

/// Reads one object in full, extracts its identifications and posts each one.
/// Stops at the first rejected post; returns how many were accepted.
pub async fn forward_object(
    record: &ObjectRecord,
    deps: &ForwardDependencies<'_>,
) -> Result<usize, IntakeError> {
    let content = deps
        .store
        .read_object(&record.bucket, &record.key)
        .await
        .map_err(|error| error.into_access_error(&record.bucket, &record.key))?;

    let payloads = extract_from_bytes(&content, deps.namespace)?;

    for payload in &payloads {
        let response = deps
            .sink
            .post(payload)
            .await
            .map_err(|message| IntakeError::Forward {
                document_id: payload.document_id.clone(),
                status: 500,
                message,
            })?;

        if response.status != 200 {
            return Err(IntakeError::Forward {
                document_id: payload.document_id.clone(),
                status: response.status,
                message: response.body,
            });
        }

        tracing::info!(
            component = "forward_handler",
            event = "document_posted",
            bucket = %record.bucket,
            key = %record.key,
            document_id = %payload.document_id
        );
    }

    Ok(payloads.len())
}
