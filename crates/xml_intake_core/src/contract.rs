use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::IntakeError;

pub const ACK_MESSAGE: &str = "Function executed successfully";
pub const FORWARD_SUCCESS_MESSAGE: &str = "Document IDs posted successfully";

/// One storage object named by a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct EventRecordShape {
    #[serde(default)]
    s3: Option<S3EntityShape>,
}

#[derive(Debug, Default, Deserialize)]
struct S3EntityShape {
    #[serde(default)]
    bucket: S3BucketShape,
    #[serde(default)]
    object: S3ObjectShape,
}

#[derive(Debug, Default, Deserialize)]
struct S3BucketShape {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct S3ObjectShape {
    #[serde(default)]
    key: String,
}

impl ObjectRecord {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Decodes one storage-event record. Both bucket and key must be present
    /// and non-empty for the record to be actionable.
    pub fn from_event_record(record: &Value) -> Result<Self, IntakeError> {
        let shape: EventRecordShape = serde_json::from_value(record.clone())
            .map_err(|error| IntakeError::EnvelopeDecode(format!("invalid event record: {error}")))?;
        let Some(entity) = shape.s3 else {
            return Err(IntakeError::IncompleteRecord(
                "record has no s3 entity".to_string(),
            ));
        };

        let bucket = entity.bucket.name.trim().to_string();
        if bucket.is_empty() {
            return Err(IntakeError::IncompleteRecord(
                "record is missing the bucket name".to_string(),
            ));
        }

        let key = decode_object_key(&entity.object.key);
        if key.is_empty() {
            return Err(IntakeError::IncompleteRecord(format!(
                "record in bucket {bucket} is missing the object key"
            )));
        }

        Ok(Self { bucket, key })
    }
}

/// Storage notifications carry form-encoded keys (`+` for space, `%XX` escapes).
/// Keys that fail to decode are used as delivered.
pub fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

pub fn encode_object_key(key: &str) -> String {
    urlencoding::encode(key).replace("%2F", "/")
}

/// Splits an invocation event into the payload strings it delivers.
///
/// Accepts a single queue message (`{"body": ...}`), a queue batch
/// (`{"Records": [{"body": ...}]}`) or a topic batch
/// (`{"Records": [{"Sns": {"Message": ...}}]}`). A malformed delivery only
/// fails its own slot.
pub fn delivery_payloads(event: &Value) -> Result<Vec<Result<String, IntakeError>>, IntakeError> {
    let Some(object) = event.as_object() else {
        return Err(IntakeError::EnvelopeDecode(
            "event payload must be a JSON object".to_string(),
        ));
    };

    if object.contains_key("body") {
        return Ok(vec![payload_from_delivery(event)]);
    }

    let records = object
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            IntakeError::EnvelopeDecode("event must include a body or a Records array".to_string())
        })?;

    Ok(records.iter().map(payload_from_delivery).collect())
}

fn payload_from_delivery(delivery: &Value) -> Result<String, IntakeError> {
    match delivery.get("body") {
        Some(Value::String(text)) => return Ok(text.clone()),
        Some(Value::Object(_)) => return Ok(delivery["body"].to_string()),
        Some(_) => {
            return Err(IntakeError::EnvelopeDecode(
                "message body must be a JSON string or object".to_string(),
            ))
        }
        None => {}
    }

    delivery
        .get("Sns")
        .and_then(|sns| sns.get("Message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            IntakeError::EnvelopeDecode(
                "delivery record must carry a body or an Sns.Message string".to_string(),
            )
        })
}

/// Parses a serialized storage event and decodes each of its records.
pub fn decode_storage_event(
    payload: &str,
) -> Result<Vec<Result<ObjectRecord, IntakeError>>, IntakeError> {
    let event: Value = serde_json::from_str(payload)
        .map_err(|error| IntakeError::EnvelopeDecode(format!("invalid storage event JSON: {error}")))?;
    storage_event_records(&event)
}

pub fn storage_event_records(
    event: &Value,
) -> Result<Vec<Result<ObjectRecord, IntakeError>>, IntakeError> {
    if !event.is_object() {
        return Err(IntakeError::EnvelopeDecode(
            "storage event must be a JSON object".to_string(),
        ));
    }

    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            IntakeError::EnvelopeDecode("storage event must include a Records array".to_string())
        })?;

    Ok(records.iter().map(ObjectRecord::from_event_record).collect())
}

/// Serializes a record back into the storage-event shape consumed by
/// [`decode_storage_event`].
pub fn republish_body(record: &ObjectRecord) -> String {
    json!({
        "Records": [
            {
                "s3": {
                    "bucket": { "name": record.bucket },
                    "object": { "key": encode_object_key(&record.key) },
                }
            }
        ]
    })
    .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    /// Fixed batch acknowledgment; item-level failures never change it.
    pub fn acknowledged() -> Self {
        Self::with_status(200, ACK_MESSAGE)
    }

    pub fn with_status(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: Value::String(message.to_string()).to_string(),
        }
    }
}

/// One extracted document identification, as posted to the external endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardPayload {
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(rename = "xmlData")]
    pub xml_data: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelocationOutcome {
    Moved,
    MovedWithDuplicate,
    AlreadyCanonical,
    NotFound,
    Failed,
}

impl RelocationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Moved => "moved",
            Self::MovedWithDuplicate => "moved_with_duplicate",
            Self::AlreadyCanonical => "already_canonical",
            Self::NotFound => "not_found",
            Self::Failed => "failed",
        }
    }

    /// The object now lives under its canonical key.
    pub fn is_move(self) -> bool {
        matches!(self, Self::Moved | Self::MovedWithDuplicate)
    }
}

/// Durable record of one rename attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelocationEntry {
    pub bucket: String,
    pub original_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_sha256: Option<String>,
    pub content_bytes: usize,
    pub outcome: RelocationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: String,
}
