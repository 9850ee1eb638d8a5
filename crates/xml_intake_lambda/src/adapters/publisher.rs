use async_trait::async_trait;

/// Republishes filtered notifications for the rename stage.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Sends one message body and returns the broker-assigned message id.
    async fn publish(&self, body: String) -> Result<String, String>;
}

pub struct SqsPublisher {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsPublisher {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl MessagePublisher for SqsPublisher {
    async fn publish(&self, body: String) -> Result<String, String> {
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map(|output| output.message_id().unwrap_or_default().to_string())
            .map_err(|error| format!("failed to enqueue intake message: {error}"))
    }
}
