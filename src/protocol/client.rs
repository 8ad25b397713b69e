//! Exchange submission and stream consumption

use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::frame::Frame;
use super::options::ChatOptions;
use super::transport::{ByteStream, ChatTransport};
use super::types::{ChatRequest, ChatTurn, Role, ToolEvent, WireMessage};
use crate::{Error, Result};

/// Default overall deadline for interactive exchanges (10 minutes)
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(600);

/// Receives exchange callbacks in frame-arrival order
pub trait ExchangeSink {
    /// Additive answer text
    fn on_text_delta(&mut self, delta: &str);

    /// Tool, final or thinking event
    fn on_tool_event(&mut self, event: ToolEvent);
}

/// Sink built from a pair of closures
pub struct FnSink<D, T> {
    on_text_delta: D,
    on_tool_event: T,
}

impl<D, T> FnSink<D, T>
where
    D: FnMut(&str),
    T: FnMut(ToolEvent),
{
    pub const fn new(on_text_delta: D, on_tool_event: T) -> Self {
        Self {
            on_text_delta,
            on_tool_event,
        }
    }
}

impl<D, T> ExchangeSink for FnSink<D, T>
where
    D: FnMut(&str),
    T: FnMut(ToolEvent),
{
    fn on_text_delta(&mut self, delta: &str) {
        (self.on_text_delta)(delta);
    }

    fn on_tool_event(&mut self, event: ToolEvent) {
        (self.on_tool_event)(event);
    }
}

/// Everything needed to submit one exchange
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// Model identifier
    pub model: String,
    /// Earlier turns of the conversation, oldest first
    pub prior_turns: Vec<ChatTurn>,
    /// Text of the new user turn
    pub user_text: String,
    /// Per-exchange options
    pub options: ChatOptions,
}

/// Streaming tool-call protocol client
#[derive(Clone)]
pub struct ProtocolClient {
    transport: Arc<dyn ChatTransport>,
    provider: String,
    deadline: Duration,
}

impl ProtocolClient {
    /// Create a client over the given transport
    pub fn new(transport: Arc<dyn ChatTransport>, provider: impl Into<String>) -> Self {
        Self {
            transport,
            provider: provider.into(),
            deadline: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }

    /// Override the overall exchange deadline
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Overall exchange deadline
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Build the wire request for an exchange
    #[must_use]
    pub fn build_request(&self, request: &ExchangeRequest) -> ChatRequest {
        let mut messages: Vec<WireMessage> = request
            .prior_turns
            .iter()
            .filter(|turn| !turn.is_provisional)
            .map(|turn| WireMessage {
                role: turn.role,
                content: turn.content.clone(),
            })
            .collect();
        messages.push(WireMessage {
            role: Role::User,
            content: request.user_text.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            provider: self.provider.clone(),
            enable_tools: true,
            thinking: request.options.thinking_enabled,
            temperature: request.options.temperature,
            caching: request.options.caching_enabled,
            tokens_limit: request.options.max_tokens,
            verbose_level: request.options.quality_level,
        }
    }

    /// Submit one exchange and stream its content into `sink`
    ///
    /// Resolves with the concatenated answer text once the termination
    /// sentinel arrives. Nothing reaches `sink` after this returns.
    ///
    /// # Errors
    ///
    /// - `InvalidOptions` if the options fail validation
    /// - `Timeout` if the deadline passes first
    /// - `Cancelled` if `cancel` fires first
    /// - `Transport` on network failure or a stream that ends without the sentinel
    pub async fn send<S>(
        &self,
        request: &ExchangeRequest,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<String>
    where
        S: ExchangeSink + ?Sized,
    {
        request.options.validate()?;
        let body = self.build_request(request);

        let exchange = async {
            let stream = self.transport.open(&body).await?;
            consume_stream(stream, sink).await
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("exchange cancelled");
                Err(Error::Cancelled)
            }
            outcome = tokio::time::timeout(self.deadline, exchange) => {
                outcome.unwrap_or_else(|_| {
                    tracing::warn!(deadline_secs = self.deadline.as_secs(), "exchange timed out");
                    Err(Error::Timeout)
                })
            }
        }
    }
}

/// Read frames until the sentinel, dispatching each one before reading the next
async fn consume_stream<S>(stream: ByteStream, sink: &mut S) -> Result<String>
where
    S: ExchangeSink + ?Sized,
{
    let mut events = stream.eventsource();
    let mut text = String::new();
    // after `final`, the rest of the stream is answer text
    let mut final_seen = false;

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| {
            tracing::error!(error = %e, "chat stream error");
            Error::Transport(e.to_string())
        })?;

        if event.data.is_empty() {
            continue;
        }
        tracing::trace!(payload = %event.data, "frame");

        match Frame::parse(&event.data) {
            Some(Frame::Done) => {
                tracing::debug!(chars = text.len(), "exchange complete");
                return Ok(text);
            }
            Some(Frame::Tool(tool_event)) => {
                let is_thinking = matches!(tool_event, ToolEvent::Thinking { .. });
                if final_seen && !is_thinking {
                    tracing::warn!(kind = tool_event.kind(), "tool frame after final response, skipping");
                    continue;
                }
                tracing::debug!(kind = tool_event.kind(), "tool event");
                final_seen |= matches!(tool_event, ToolEvent::Final);
                sink.on_tool_event(tool_event);
            }
            Some(Frame::Content(delta)) => {
                text.push_str(&delta);
                sink.on_text_delta(&delta);
            }
            Some(Frame::Ignored) => {}
            None => {
                tracing::warn!(payload = %event.data, "skipping malformed frame");
            }
        }
    }

    Err(Error::Transport(
        "stream closed before termination sentinel".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ExchangeRequest {
        ExchangeRequest {
            model: "llama3".to_string(),
            prior_turns: vec![
                ChatTurn::user("hi"),
                ChatTurn::assistant("hello"),
                ChatTurn::provisional("thinking..."),
            ],
            user_text: "what's the weather".to_string(),
            options: ChatOptions::default(),
        }
    }

    struct NoTransport;

    #[async_trait::async_trait]
    impl ChatTransport for NoTransport {
        async fn open(&self, _request: &ChatRequest) -> Result<ByteStream> {
            Err(Error::Transport("offline".to_string()))
        }
    }

    #[test]
    fn build_request_drops_provisional_turns() {
        let client = ProtocolClient::new(Arc::new(NoTransport), "ollama");
        let body = client.build_request(&request());

        assert_eq!(body.messages.len(), 3);
        assert_eq!(body.messages[2].content, "what's the weather");
        assert_eq!(body.messages[2].role, Role::User);
        assert!(body.enable_tools);
        assert_eq!(body.provider, "ollama");
        assert_eq!(body.tokens_limit, 1536);
    }

    #[tokio::test]
    async fn invalid_options_fail_before_transport() {
        let client = ProtocolClient::new(Arc::new(NoTransport), "ollama");
        let mut req = request();
        req.options.temperature = 3.0;
        let mut sink = FnSink::new(|_: &str| {}, |_: ToolEvent| {});

        let err = client
            .send(&req, &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn transport_failure_surfaces() {
        let client = ProtocolClient::new(Arc::new(NoTransport), "ollama");
        let mut sink = FnSink::new(|_: &str| {}, |_: ToolEvent| {});

        let err = client
            .send(&request(), &mut sink, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
