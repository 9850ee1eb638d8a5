use thiserror::Error;

/// Failure kinds surfaced by the intake stages.
///
/// Every variant is caught at the per-record boundary of a handler; none of
/// them abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error("malformed envelope: {0}")]
    EnvelopeDecode(String),

    #[error("incomplete object record: {0}")]
    IncompleteRecord(String),

    #[error("object access failed for s3://{bucket}/{key}: {message}")]
    ObjectAccess {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("no <docId> tag found in s3://{bucket}/{key}")]
    IdentifierNotFound { bucket: String, key: String },

    #[error("relocation of s3://{bucket}/{key} failed: {message}")]
    Relocation {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("document extraction failed: {0}")]
    Extraction(String),

    #[error("forwarding document {document_id} failed with status {status}: {message}")]
    Forward {
        document_id: String,
        status: u16,
        message: String,
    },

    #[error("publish failed for s3://{bucket}/{key}: {message}")]
    Publish {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("processing cancelled before completion")]
    Cancelled,
}

impl IntakeError {
    /// Stable label used as the `error_kind` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EnvelopeDecode(_) => "envelope_decode",
            Self::IncompleteRecord(_) => "incomplete_record",
            Self::ObjectAccess { .. } => "object_access",
            Self::IdentifierNotFound { .. } => "identifier_not_found",
            Self::Relocation { .. } => "relocation",
            Self::Extraction(_) => "extraction",
            Self::Forward { .. } => "forward",
            Self::Publish { .. } => "publish",
            Self::Cancelled => "cancelled",
        }
    }

    /// Status code reported by handlers that surface per-object failures.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forward { status, .. } => *status,
            Self::EnvelopeDecode(_) | Self::IncompleteRecord(_) => 400,
            _ => 500,
        }
    }
}
