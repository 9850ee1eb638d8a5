use serde_json::Value;
use xml_intake_core::contract::{republish_body, storage_event_records, HandlerResponse};
use xml_intake_core::filter::partition_intake_records;
use xml_intake_core::IntakeError;

use crate::adapters::publisher::MessagePublisher;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Republishes storage notifications whose keys sit under `intake_prefix`.
/// Always acknowledges the batch.
pub async fn handle_filter_event(
    event: &Value,
    intake_prefix: &str,
    publisher: &dyn MessagePublisher,
) -> HandlerResponse {
    let summary = process_filter_event(event, intake_prefix, publisher).await;
    tracing::info!(
        component = "filter_handler",
        event = "batch_completed",
        published = summary.published,
        skipped = summary.skipped,
        failed = summary.failed,
        "filter batch completed"
    );
    HandlerResponse::acknowledged()
}

pub async fn process_filter_event(
    event: &Value,
    intake_prefix: &str,
    publisher: &dyn MessagePublisher,
) -> FilterSummary {
    let mut summary = FilterSummary::default();

    let records = match storage_event_records(event) {
        Ok(value) => value,
        Err(error) => {
            log_failure(&error);
            summary.failed += 1;
            return summary;
        }
    };

    let mut decoded = Vec::new();
    for record in records {
        match record {
            Ok(value) => decoded.push(value),
            Err(error) => {
                log_failure(&error);
                summary.failed += 1;
            }
        }
    }

    let (kept, skipped) = partition_intake_records(decoded, intake_prefix);
    for record in &skipped {
        tracing::info!(
            component = "filter_handler",
            event = "record_skipped",
            bucket = %record.bucket,
            key = %record.key,
            intake_prefix,
            "object is outside the intake prefix"
        );
    }
    summary.skipped = skipped.len();

    for record in kept {
        match publisher.publish(republish_body(&record)).await {
            Ok(message_id) => {
                tracing::info!(
                    component = "filter_handler",
                    event = "record_published",
                    bucket = %record.bucket,
                    key = %record.key,
                    message_id = %message_id
                );
                summary.published += 1;
            }
            Err(message) => {
                log_failure(&IntakeError::Publish {
                    bucket: record.bucket.clone(),
                    key: record.key.clone(),
                    message,
                });
                summary.failed += 1;
            }
        }
    }

    summary
}

fn log_failure(error: &IntakeError) {
    tracing::error!(
        component = "filter_handler",
        event = "record_failed",
        error_kind = error.kind(),
        error = %error
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use xml_intake_core::contract::{decode_storage_event, ObjectRecord};

    use super::*;

    struct CapturingPublisher {
        bodies: Mutex<Vec<String>>,
        fail_containing: Option<&'static str>,
    }

    impl CapturingPublisher {
        fn new(fail_containing: Option<&'static str>) -> Self {
            Self {
                bodies: Mutex::new(Vec::new()),
                fail_containing,
            }
        }

        fn bodies(&self) -> Vec<String> {
            self.bodies.lock().expect("poisoned mutex").clone()
        }
    }

    #[async_trait]
    impl MessagePublisher for CapturingPublisher {
        async fn publish(&self, body: String) -> Result<String, String> {
            if let Some(marker) = self.fail_containing {
                if body.contains(marker) {
                    return Err("simulated publish failure".to_string());
                }
            }
            let mut bodies = self.bodies.lock().expect("poisoned mutex");
            bodies.push(body);
            Ok(format!("msg-{}", bodies.len()))
        }
    }

    fn s3_event(keys: &[&str]) -> Value {
        let records: Vec<Value> = keys
            .iter()
            .map(|key| json!({"s3": {"bucket": {"name": "intake"}, "object": {"key": key}}}))
            .collect();
        json!({ "Records": records })
    }

    #[tokio::test]
    async fn republishes_only_intake_keys() {
        let publisher = CapturingPublisher::new(None);
        let summary = process_filter_event(
            &s3_event(&["migrate/a.xml", "elsewhere/b.xml", "migrate/c.txt"]),
            "migrate/",
            &publisher,
        )
        .await;

        assert_eq!(summary.published, 2);
        assert_eq!(summary.skipped, 1);

        let republished: Vec<ObjectRecord> = publisher
            .bodies()
            .iter()
            .flat_map(|body| decode_storage_event(body).expect("republished body decodes"))
            .map(|record| record.expect("record complete"))
            .collect();
        assert_eq!(
            republished,
            vec![
                ObjectRecord::new("intake", "migrate/a.xml"),
                ObjectRecord::new("intake", "migrate/c.txt"),
            ]
        );
    }

    #[tokio::test]
    async fn publish_failure_does_not_stop_remaining_records() {
        let publisher = CapturingPublisher::new(Some("first"));
        let summary = process_filter_event(
            &s3_event(&["migrate/first.xml", "migrate/second.xml"]),
            "migrate/",
            &publisher,
        )
        .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.published, 1);
        assert!(publisher.bodies()[0].contains("second"));
    }

    #[tokio::test]
    async fn malformed_event_is_acknowledged() {
        let publisher = CapturingPublisher::new(None);
        let response = handle_filter_event(&json!({"NotRecords": []}), "migrate/", &publisher).await;
        assert_eq!(response, HandlerResponse::acknowledged());
        assert!(publisher.bodies().is_empty());
    }
}
