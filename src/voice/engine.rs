//! Recognition engine adapter contract
//!
//! An engine runs continuous recognition with interim results. It reports
//! through [`EngineEvents`]; the capture state machine consumes those reports
//! on its owner's event loop as [`CaptureEvent`]s.
//!
//! Contract: calling `stop()` on a running engine yields exactly one `End`,
//! and a fatal error is followed by exactly one `End`.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::Result;

/// Error code meaning the engine heard nothing; not fatal
pub const NO_SPEECH: &str = "no-speech";

/// Error code reported after a caller-initiated stop; not fatal
pub const ABORTED: &str = "aborted";

/// One recognized segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub is_final: bool,
}

impl Segment {
    #[must_use]
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    #[must_use]
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Event emitted by a recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Recognized segments, in order
    Results(Vec<Segment>),
    /// Recognition session ended
    End,
    /// Engine error with its code
    Error(String),
}

/// Input to the capture state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Engine(EngineEvent),
    /// Delayed second attempt at starting the engine
    RetryStart { epoch: u64 },
}

/// Sender handed to engines for reporting events
#[derive(Debug, Clone)]
pub struct EngineEvents {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

/// Create the event channel shared by an engine and its capture state machine
#[must_use]
pub fn capture_channel() -> (EngineEvents, mpsc::UnboundedReceiver<CaptureEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineEvents { tx }, rx)
}

impl EngineEvents {
    pub fn results(&self, segments: Vec<Segment>) {
        self.send(CaptureEvent::Engine(EngineEvent::Results(segments)));
    }

    pub fn end(&self) {
        self.send(CaptureEvent::Engine(EngineEvent::End));
    }

    pub fn error(&self, code: impl Into<String>) {
        self.send(CaptureEvent::Engine(EngineEvent::Error(code.into())));
    }

    /// Deliver `RetryStart` after `delay`
    pub(crate) fn schedule_retry(&self, epoch: u64, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(CaptureEvent::RetryStart { epoch });
        });
    }

    fn send(&self, event: CaptureEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("capture event dropped, receiver closed");
        }
    }
}

/// Continuous, interim-capable speech recognition engine
pub trait RecognitionEngine: Send {
    /// Whether recognition works on this platform
    fn is_supported(&self) -> bool {
        true
    }

    /// Current working locale (BCP 47)
    fn locale(&self) -> &str;

    /// Set the working locale; applies on the next `start`
    fn set_locale(&mut self, locale: &str);

    /// Begin recognition
    ///
    /// # Errors
    ///
    /// Returns error if the engine could not start
    fn start(&mut self) -> Result<()>;

    /// Stop recognition; an `End` event follows
    fn stop(&mut self);
}
