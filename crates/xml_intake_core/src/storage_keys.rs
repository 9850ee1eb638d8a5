use sha2::{Digest, Sha256};

pub const CANONICAL_SUFFIX: &str = ".xml";
pub const DEFAULT_LEDGER_PREFIX: &str = "relocation-ledger";

/// Destination key for an identifier, always in the root namespace of the
/// source bucket. `None` when the identifier contains a `/` and would name a
/// subfolder instead.
pub fn canonical_key(identifier: &str) -> Option<String> {
    if identifier.contains('/') {
        return None;
    }
    Some(format!("{identifier}{CANONICAL_SUFFIX}"))
}

pub fn content_sha256(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// Ledger entries are addressed by a digest of the source location so any
/// key, including ones with separators, maps to a flat `.json` object.
pub fn ledger_object_key(base_prefix: &str, bucket: &str, original_key: &str) -> String {
    let trimmed = base_prefix.trim_matches('/');
    let mut hasher = Sha256::new();
    hasher.update(bucket.as_bytes());
    hasher.update(b"/");
    hasher.update(original_key.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    if trimmed.is_empty() {
        format!("{digest}.json")
    } else {
        format!("{trimmed}/{digest}.json")
    }
}
