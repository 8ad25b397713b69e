//! Transport seam between the protocol client and the backend

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use super::types::ChatRequest;
use crate::{Error, Result};

/// Raw response body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Opens a streaming chat exchange
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the request and return the response body as a chunk stream
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the backend cannot be reached or rejects the request
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// HTTP transport posting JSON to the chat backend
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Create a transport for the given chat endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the URL is empty
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(Error::Config("chat backend URL required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }

    /// Endpoint this transport posts to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        tracing::debug!(
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );

        let response = self
            .client
            .post(&self.url)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                Error::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat backend error");
            return Err(Error::Transport(format!("backend error {status}: {body}")));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|e| Error::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }
}
