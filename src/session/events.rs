//! Events flowing into and out of the coordinator loop

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{ExchangeSink, ToolEvent};

/// Identifies one exchange; events from superseded exchanges are dropped
pub type ExchangeId = Uuid;

/// Exchange callback forwarded to the coordinator loop
#[derive(Debug)]
pub enum ExchangeEvent {
    TextDelta(String),
    Tool(ToolEvent),
    Finished(crate::Result<String>),
}

/// Internal coordinator input
#[derive(Debug)]
pub enum SessionEvent {
    /// Silence window elapsed; `epoch` is the capture epoch it was armed in
    Silence { epoch: u64 },
    /// Callback from an in-flight exchange
    Exchange { id: ExchangeId, event: ExchangeEvent },
}

/// Notification for the surrounding application
///
/// `ReplyCompleted` is the hook for fire-and-forget speech output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Transcript submitted as a new exchange
    Submitted { id: ExchangeId, text: String },
    /// Exchange finished and its assistant turn was recorded
    ReplyCompleted { id: ExchangeId, text: String },
    /// Exchange failed or was cancelled; its provisional turn was dropped
    ExchangeFailed { id: ExchangeId, error: String },
    /// Voice capture stopped after exhausting engine restarts
    VoiceFault { error: String },
    /// Stuck tool indicators were force-cleared
    ActivityReset,
}

/// Forwards exchange callbacks over the coordinator's channel
///
/// Callbacks run on the exchange task; the coordinator applies them in order
/// on its own loop.
#[derive(Debug, Clone)]
pub struct ExchangeForwarder {
    id: ExchangeId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ExchangeForwarder {
    #[must_use]
    pub const fn new(id: ExchangeId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { id, tx }
    }

    /// Report the exchange outcome
    pub fn finish(&self, outcome: crate::Result<String>) {
        self.forward(ExchangeEvent::Finished(outcome));
    }

    fn forward(&self, event: ExchangeEvent) {
        let _ = self.tx.send(SessionEvent::Exchange { id: self.id, event });
    }
}

impl ExchangeSink for ExchangeForwarder {
    fn on_text_delta(&mut self, delta: &str) {
        self.forward(ExchangeEvent::TextDelta(delta.to_string()));
    }

    fn on_tool_event(&mut self, event: ToolEvent) {
        self.forward(ExchangeEvent::Tool(event));
    }
}
