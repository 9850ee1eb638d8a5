use thiserror::Error;
use xml_intake_core::extract::DEFAULT_DOCUMENT_NAMESPACE;
use xml_intake_core::filter::DEFAULT_INTAKE_PREFIX;
use xml_intake_core::scanner::{ScanOptions, DEFAULT_CHUNK_SIZE};
use xml_intake_core::storage_keys::DEFAULT_LEDGER_PREFIX;

pub const DEFAULT_DEADLINE_MARGIN_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub bucket: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameConfig {
    pub scan: ScanOptions,
    pub ledger: Option<LedgerConfig>,
    pub deadline_margin_ms: u64,
}

impl RenameConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let chunk_size = parse_or(&lookup, "SCAN_CHUNK_SIZE_BYTES", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            return Err(ConfigError::Invalid {
                name: "SCAN_CHUNK_SIZE_BYTES",
                expected: "greater than zero",
                value: chunk_size.to_string(),
            });
        }

        let ledger = non_empty(&lookup, "RELOCATION_LEDGER_BUCKET").map(|bucket| LedgerConfig {
            bucket,
            prefix: non_empty(&lookup, "RELOCATION_LEDGER_PREFIX")
                .unwrap_or_else(|| DEFAULT_LEDGER_PREFIX.to_string()),
        });

        Ok(Self {
            scan: ScanOptions {
                chunk_size,
                lookback_bytes: parse_or(&lookup, "SCAN_LOOKBACK_BYTES", 0)?,
            },
            ledger,
            deadline_margin_ms: parse_or(&lookup, "DEADLINE_MARGIN_MS", DEFAULT_DEADLINE_MARGIN_MS)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub intake_prefix: String,
    pub publish_queue_url: String,
}

impl FilterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            intake_prefix: non_empty(&lookup, "INTAKE_PREFIX")
                .unwrap_or_else(|| DEFAULT_INTAKE_PREFIX.to_string()),
            publish_queue_url: required(&lookup, "PUBLISH_QUEUE_URL")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardConfig {
    pub forward_url: String,
    pub document_namespace: String,
}

impl ForwardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            forward_url: required(&lookup, "FORWARD_URL")?,
            document_namespace: non_empty(&lookup, "DOCUMENT_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_DOCUMENT_NAMESPACE.to_string()),
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    non_empty(lookup, name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match non_empty(lookup, name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            expected: "a non-negative integer",
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name: &str| values.get(name).cloned()
    }

    #[test]
    fn rename_defaults_search_each_chunk_alone() {
        let config = RenameConfig::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(config.scan, ScanOptions::default());
        assert_eq!(config.scan.lookback_bytes, 0);
        assert_eq!(config.ledger, None);
        assert_eq!(config.deadline_margin_ms, DEFAULT_DEADLINE_MARGIN_MS);
    }

    #[test]
    fn rename_reads_overrides_and_ledger() {
        let config = RenameConfig::from_lookup(lookup(&[
            ("SCAN_CHUNK_SIZE_BYTES", "4096"),
            ("SCAN_LOOKBACK_BYTES", "64"),
            ("RELOCATION_LEDGER_BUCKET", "audit"),
        ]))
        .expect("valid overrides");

        assert_eq!(config.scan.chunk_size, 4096);
        assert_eq!(config.scan.lookback_bytes, 64);
        assert_eq!(
            config.ledger,
            Some(LedgerConfig {
                bucket: "audit".to_string(),
                prefix: DEFAULT_LEDGER_PREFIX.to_string(),
            })
        );
    }

    #[test]
    fn rejects_invalid_numbers() {
        let error = RenameConfig::from_lookup(lookup(&[("SCAN_CHUNK_SIZE_BYTES", "lots")]))
            .expect_err("non-numeric chunk size");
        assert!(error.to_string().contains("SCAN_CHUNK_SIZE_BYTES"));

        let error = RenameConfig::from_lookup(lookup(&[("SCAN_CHUNK_SIZE_BYTES", "0")]))
            .expect_err("zero chunk size");
        assert!(error.to_string().contains("greater than zero"));
    }

    #[test]
    fn filter_requires_queue_url() {
        let error = FilterConfig::from_lookup(lookup(&[])).expect_err("queue url required");
        assert_eq!(error, ConfigError::Missing("PUBLISH_QUEUE_URL"));

        let config = FilterConfig::from_lookup(lookup(&[("PUBLISH_QUEUE_URL", "https://q")]))
            .expect("valid");
        assert_eq!(config.intake_prefix, "migrate/");
    }

    #[test]
    fn forward_requires_url_and_defaults_namespace() {
        assert!(ForwardConfig::from_lookup(lookup(&[("FORWARD_URL", "  ")])).is_err());

        let config = ForwardConfig::from_lookup(lookup(&[("FORWARD_URL", "https://example.com/external/xml")]))
            .expect("valid");
        assert_eq!(config.document_namespace, DEFAULT_DOCUMENT_NAMESPACE);
    }
}
