use async_trait::async_trait;
use xml_intake_core::contract::ForwardPayload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    pub status: u16,
    pub body: String,
}

/// External endpoint receiving extracted document identifications.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Transport failures are `Err`; any HTTP status, including errors, is
    /// returned as a [`SinkResponse`] for the caller to judge.
    async fn post(&self, payload: &ForwardPayload) -> Result<SinkResponse, String>;
}

pub struct HttpDocumentSink {
    client: reqwest::Client,
    url: String,
}

impl HttpDocumentSink {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DocumentSink for HttpDocumentSink {
    async fn post(&self, payload: &ForwardPayload) -> Result<SinkResponse, String> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|error| format!("failed to post document {}: {error}", payload.document_id))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(SinkResponse { status, body })
    }
}
