//! Silence-to-exchange glue

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::{ExchangeEvent, ExchangeForwarder, ExchangeId, SessionEvent, SessionUpdate};
use super::handle::SessionCommand;
use crate::activity::{ActivityView, ToolActivity};
use crate::config::Config;
use crate::protocol::{ChatOptions, ChatTurn, ExchangeRequest, ExchangeSink, ProtocolClient};
use crate::voice::{
    CaptureEvent, EngineEvents, RecognitionEngine, VoiceCapture, VoiceSession, capture_channel,
    prepare_submission,
};
use crate::{Error, Result};

/// How often the loop checks for stuck exchanges
const LIVENESS_INTERVAL: Duration = Duration::from_secs(30);

/// Exchange currently running for the conversation
struct InFlight {
    id: ExchangeId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Point-in-time view of the whole session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub conversation: Option<String>,
    pub voice: VoiceSession,
    pub activity: ActivityView,
    pub turns: Vec<ChatTurn>,
}

/// Couples one voice capture session with one conversation's exchanges
///
/// At most one exchange is in flight per conversation.
pub struct SessionCoordinator<E: RecognitionEngine> {
    client: ProtocolClient,
    model: String,
    options: ChatOptions,
    capture: VoiceCapture<E>,
    capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    activity: ToolActivity,
    conversation: Option<String>,
    in_flight: Option<InFlight>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    updates: Option<mpsc::UnboundedSender<SessionUpdate>>,
}

impl<E: RecognitionEngine> SessionCoordinator<E> {
    /// Build a coordinator; `make_engine` receives the sender the engine reports through
    pub fn new<F>(config: &Config, client: ProtocolClient, make_engine: F) -> Self
    where
        F: FnOnce(EngineEvents) -> E,
    {
        let (engine_events, capture_rx) = capture_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let engine = make_engine(engine_events.clone());
        let silence_tx = events_tx.clone();
        let capture = VoiceCapture::new(engine, engine_events, &config.voice, move |epoch| {
            let _ = silence_tx.send(SessionEvent::Silence { epoch });
        });

        Self {
            client,
            model: config.chat.model.clone(),
            options: config.chat.options,
            capture,
            capture_rx,
            activity: ToolActivity::new(
                config.activity.tool_categories.clone(),
                config.activity.stuck_after,
            ),
            conversation: None,
            in_flight: None,
            events_tx,
            events_rx,
            updates: None,
        }
    }

    /// Send application notifications to `updates`
    #[must_use]
    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<SessionUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    /// Switch to a conversation, seeding it with its stored turns
    ///
    /// Switching away tears down capture and any in-flight exchange.
    pub fn open_conversation(&mut self, id: impl Into<String>, turns: Vec<ChatTurn>) {
        let id = id.into();
        if self.conversation.as_deref() == Some(id.as_str()) {
            return;
        }
        self.close_conversation();

        tracing::info!(conversation = %id, turns = turns.len(), "conversation opened");
        self.activity.load_turns(turns);
        self.conversation = Some(id);
    }

    /// Drop the conversation context; capture stops and timers clear
    pub fn close_conversation(&mut self) {
        self.cancel_exchange();
        self.capture.disable();
        self.capture.reset_transcript();
        self.activity.clear();
        if let Some(id) = self.conversation.take() {
            tracing::info!(conversation = %id, "conversation closed");
        }
    }

    /// Start listening for the open conversation
    ///
    /// # Errors
    ///
    /// Returns `NoConversation` without an open conversation, or the capture
    /// session's enable error
    pub fn enable_voice(&mut self) -> Result<()> {
        if self.conversation.is_none() {
            return Err(Error::NoConversation);
        }
        self.capture.enable()
    }

    pub fn disable_voice(&mut self) {
        self.capture.disable();
    }

    /// Submit text as a new exchange
    ///
    /// Returns `None` if the text is blank after cleanup.
    ///
    /// # Errors
    ///
    /// - `NoConversation` without an open conversation
    /// - `Busy` while an exchange is in flight
    pub fn submit(&mut self, text: &str) -> Result<Option<ExchangeId>> {
        if self.conversation.is_none() {
            return Err(Error::NoConversation);
        }
        if self.in_flight.is_some() {
            return Err(Error::Busy);
        }

        let text = prepare_submission(text);
        if text.is_empty() {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        let prior_turns = self.activity.begin(&text);
        let request = ExchangeRequest {
            model: self.model.clone(),
            prior_turns,
            user_text: text.clone(),
            options: self.options,
        };

        let cancel = CancellationToken::new();
        let client = self.client.clone();
        let mut forwarder = ExchangeForwarder::new(id, self.events_tx.clone());
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = client.send(&request, &mut forwarder, &task_cancel).await;
            forwarder.finish(outcome);
        });

        tracing::info!(exchange_id = %id, chars = text.len(), "exchange submitted");
        self.in_flight = Some(InFlight { id, cancel, task });
        self.notify(SessionUpdate::Submitted { id, text });
        Ok(Some(id))
    }

    /// Cancel the in-flight exchange, if any
    ///
    /// Its provisional turn is discarded and none of its later callbacks apply.
    pub fn cancel_exchange(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        in_flight.cancel.cancel();
        drop(in_flight.task);
        self.activity.fail();
        tracing::info!(exchange_id = %in_flight.id, "exchange cancelled");
        self.notify(SessionUpdate::ExchangeFailed {
            id: in_flight.id,
            error: Error::Cancelled.to_string(),
        });
        self.capture.rearm_silence();
    }

    /// Submit the current transcript once the speaker goes quiet
    fn on_silence(&mut self, epoch: u64) {
        if !self.capture.is_listening() {
            return;
        }
        if epoch != self.capture.epoch() {
            tracing::debug!(epoch, current = self.capture.epoch(), "stale silence firing");
            return;
        }
        if self.in_flight.is_some() {
            tracing::debug!("silence while an exchange is in flight, holding transcript until it settles");
            return;
        }

        let transcript = self.capture.transcript();
        match self.submit(&transcript) {
            Ok(Some(_)) => self.capture.reset_transcript(),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "silence submission skipped"),
        }
    }

    fn on_exchange_event(&mut self, id: ExchangeId, event: ExchangeEvent) {
        if self.in_flight.as_ref().is_none_or(|f| f.id != id) {
            tracing::trace!(exchange_id = %id, "dropping event from superseded exchange");
            return;
        }

        match event {
            ExchangeEvent::TextDelta(delta) => self.activity.on_text_delta(&delta),
            ExchangeEvent::Tool(tool_event) => self.activity.on_tool_event(tool_event),
            ExchangeEvent::Finished(outcome) => {
                self.in_flight = None;
                match outcome {
                    Ok(text) => {
                        self.activity.complete(&text);
                        tracing::info!(exchange_id = %id, chars = text.len(), "reply complete");
                        self.notify(SessionUpdate::ReplyCompleted { id, text });
                    }
                    Err(e) => {
                        self.activity.fail();
                        tracing::warn!(exchange_id = %id, error = %e, "exchange failed");
                        self.notify(SessionUpdate::ExchangeFailed {
                            id,
                            error: e.to_string(),
                        });
                    }
                }
                // speech held back while the reply streamed goes out next
                self.capture.rearm_silence();
            }
        }
    }

    /// Apply one internal event
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Silence { epoch } => self.on_silence(epoch),
            SessionEvent::Exchange { id, event } => self.on_exchange_event(id, event),
        }
    }

    /// Apply one capture event
    pub fn handle_capture_event(&mut self, event: CaptureEvent) {
        if let Err(e) = self.capture.handle(event) {
            tracing::error!(error = %e, "voice capture stopped");
            self.notify(SessionUpdate::VoiceFault {
                error: e.to_string(),
            });
        }
    }

    /// Force-clear tool indicators of an exchange stuck past the threshold
    pub fn check_liveness(&mut self, now: Instant) {
        if self.activity.enforce_liveness(now) {
            self.notify(SessionUpdate::ActivityReset);
        }
    }

    /// Wait for and apply the next capture or internal event
    pub async fn step(&mut self) {
        tokio::select! {
            Some(event) = self.capture_rx.recv() => self.handle_capture_event(event),
            Some(event) = self.events_rx.recv() => self.handle_event(event),
            else => {}
        }
    }

    /// Apply every event already queued, without waiting
    pub fn drain(&mut self) {
        loop {
            if let Ok(event) = self.capture_rx.try_recv() {
                self.handle_capture_event(event);
            } else if let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event);
            } else {
                break;
            }
        }
    }

    /// Run the event loop until the command channel closes
    ///
    /// # Errors
    ///
    /// Currently infallible; reserved for loop-level failures
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> Result<()> {
        let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::info!("session command channel closed");
                        break;
                    };
                    self.handle_command(command);
                }
                Some(event) = self.capture_rx.recv() => self.handle_capture_event(event),
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                now = liveness.tick() => self.check_liveness(now),
            }
        }

        self.close_conversation();
        Ok(())
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::OpenConversation { id, turns } => self.open_conversation(id, turns),
            SessionCommand::CloseConversation => self.close_conversation(),
            SessionCommand::EnableVoice { reply } => {
                let _ = reply.send(self.enable_voice());
            }
            SessionCommand::DisableVoice => self.disable_voice(),
            SessionCommand::ResetTranscript => self.capture.reset_transcript(),
            SessionCommand::Submit { text, reply } => {
                let _ = reply.send(self.submit(&text));
            }
            SessionCommand::Cancel => self.cancel_exchange(),
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn notify(&self, update: SessionUpdate) {
        if let Some(updates) = &self.updates {
            let _ = updates.send(update);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionView {
        SessionView {
            conversation: self.conversation.clone(),
            voice: self.capture.snapshot(),
            activity: self.activity.snapshot(),
            turns: self.activity.rendered_turns(),
        }
    }

    #[must_use]
    pub const fn capture(&self) -> &VoiceCapture<E> {
        &self.capture
    }

    #[must_use]
    pub const fn activity(&self) -> &ToolActivity {
        &self.activity
    }

    #[must_use]
    pub fn is_exchange_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}
