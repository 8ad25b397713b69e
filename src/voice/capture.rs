//! Continuous voice capture state machine
//!
//! Owns one recognition engine and one silence timer for a listening
//! session. The engine may end or fail at any time; while the caller still
//! wants to listen, the session restarts it behind the scenes and keeps
//! accumulating the same transcript.
//!
//! ```text
//!   Idle ──enable──▶ Listening ◀──start ok── Restarting
//!    ▲                  │  end / fault / locale   ▲
//!    │                  └─────────────────────────┘
//!    └──── disable / restart retries exhausted
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::engine::{
    ABORTED, CaptureEvent, EngineEvent, EngineEvents, NO_SPEECH, RecognitionEngine, Segment,
};
use super::language::LanguageHeuristic;
use super::timer::SilenceTimer;
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Silence handler; receives the capture epoch the window was armed in
pub type SilenceHandler = Arc<dyn Fn(u64) + Send + Sync>;

/// Externally meaningful capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Not listening; engine stopped, timers cleared
    Idle,
    /// Engine running
    Listening,
    /// Engine being restarted; reported as listening to observers
    Restarting,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSession {
    pub is_listening: bool,
    pub final_transcript: String,
    pub interim_transcript: String,
    pub locale: String,
}

/// Voice capture session over a recognition engine
pub struct VoiceCapture<E: RecognitionEngine> {
    engine: E,
    events: EngineEvents,
    heuristic: LanguageHeuristic,
    timer: SilenceTimer,
    on_silence: SilenceHandler,
    silence: Duration,
    retry_delay: Duration,
    state: CaptureState,
    engine_running: bool,
    /// `End` events still owed by stops we issued or faults we saw
    ends_expected: u32,
    retry_pending: bool,
    /// Bumped on enable/disable/fatal so stale retries are ignored
    epoch: u64,
    final_transcript: String,
    interim_transcript: String,
    locale: String,
}

impl<E: RecognitionEngine> VoiceCapture<E> {
    /// Create an idle session
    ///
    /// `events` must be the sender the engine reports through; `on_silence`
    /// runs once per quiet interval with the epoch it was armed in, and should
    /// read the transcript itself.
    pub fn new<F>(engine: E, events: EngineEvents, config: &VoiceConfig, on_silence: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self {
            engine,
            events,
            heuristic: LanguageHeuristic::new(config.confidence_floor),
            timer: SilenceTimer::new(config.silence),
            on_silence: Arc::new(on_silence),
            silence: config.silence,
            retry_delay: config.restart_retry_delay,
            state: CaptureState::Idle,
            engine_running: false,
            ends_expected: 0,
            retry_pending: false,
            epoch: 0,
            final_transcript: String::new(),
            interim_transcript: String::new(),
            locale: config.default_locale.clone(),
        }
    }

    /// Start listening; a no-op while already listening
    ///
    /// The silence window is not armed until the first fragment arrives.
    ///
    /// # Errors
    ///
    /// - `EngineUnavailable` if the engine is unsupported on this platform
    /// - the engine's start error if it fails to start
    pub fn enable(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            tracing::debug!("capture already enabled");
            return Ok(());
        }
        if !self.engine.is_supported() {
            return Err(Error::EngineUnavailable(
                "speech recognition not supported on this platform".to_string(),
            ));
        }

        self.epoch += 1;
        self.retry_pending = false;
        self.engine.set_locale(&self.locale);
        self.engine.start()?;
        self.engine_running = true;
        self.state = CaptureState::Listening;

        tracing::info!(locale = %self.locale, epoch = self.epoch, "voice capture enabled");
        Ok(())
    }

    /// Stop listening and release the engine and silence timer
    ///
    /// Idempotent. No restart happens after this returns.
    pub fn disable(&mut self) {
        if self.state == CaptureState::Idle {
            return;
        }

        self.state = CaptureState::Idle;
        self.epoch += 1;
        self.retry_pending = false;
        self.timer.cancel();
        self.stop_engine();

        tracing::info!(epoch = self.epoch, "voice capture disabled");
    }

    /// Clear the transcript and disarm the silence window
    pub fn reset_transcript(&mut self) {
        self.final_transcript.clear();
        self.interim_transcript.clear();
        self.timer.cancel();
    }

    /// React to an engine report or scheduled retry
    ///
    /// # Errors
    ///
    /// Returns `EngineFault` once the restart policy is exhausted; the session
    /// is `Idle` afterwards.
    pub fn handle(&mut self, event: CaptureEvent) -> Result<()> {
        match event {
            CaptureEvent::Engine(EngineEvent::Results(segments)) => {
                self.on_results(segments);
                Ok(())
            }
            CaptureEvent::Engine(EngineEvent::Error(code)) => {
                self.on_error(&code);
                Ok(())
            }
            CaptureEvent::Engine(EngineEvent::End) => self.on_end(),
            CaptureEvent::RetryStart { epoch } => {
                if epoch != self.epoch || self.state == CaptureState::Idle || !self.retry_pending {
                    tracing::debug!(epoch, current = self.epoch, "stale restart retry");
                    return Ok(());
                }
                self.start_engine()
            }
        }
    }

    fn on_results(&mut self, segments: Vec<Segment>) {
        if self.state == CaptureState::Idle {
            return;
        }

        let mut observed = false;
        let mut saw_final = false;
        let mut interim = Vec::new();

        for segment in segments {
            let text = segment.text.trim();
            if text.is_empty() {
                continue;
            }
            observed = true;
            if segment.is_final {
                self.final_transcript.push_str(text);
                self.final_transcript.push(' ');
                saw_final = true;
            } else {
                interim.push(text.to_string());
            }
        }

        if !observed {
            return;
        }

        self.interim_transcript = interim.join(" ");
        self.arm_silence();

        if saw_final {
            self.maybe_switch_locale();
        }
    }

    fn arm_silence(&mut self) {
        let on_silence = Arc::clone(&self.on_silence);
        let epoch = self.epoch;
        self.timer.arm(self.silence, Arc::new(move || on_silence(epoch)));
    }

    /// Re-open the silence window for a transcript still waiting to be sent
    ///
    /// Does nothing while idle or when the transcript is empty.
    pub fn rearm_silence(&mut self) {
        if self.state == CaptureState::Idle || self.transcript().is_empty() {
            return;
        }
        self.arm_silence();
    }

    fn on_error(&mut self, code: &str) {
        if code == NO_SPEECH || code == ABORTED {
            tracing::debug!(code, "non-fatal recognition error");
            return;
        }
        if self.state == CaptureState::Idle {
            return;
        }

        tracing::warn!(code, "recognition engine fault, restarting");
        if self.engine_running {
            // a fatal error terminates the run; its End drives the restart
            self.engine_running = false;
            self.ends_expected += 1;
        }
        self.state = CaptureState::Restarting;
    }

    fn on_end(&mut self) -> Result<()> {
        if self.ends_expected > 0 {
            self.ends_expected -= 1;
            if self.ends_expected > 0 || self.state != CaptureState::Restarting {
                return Ok(());
            }
        } else {
            if self.state == CaptureState::Idle {
                return Ok(());
            }
            tracing::info!(locale = %self.locale, "recognition ended unexpectedly, restarting");
            self.engine_running = false;
            self.state = CaptureState::Restarting;
        }

        if self.retry_pending {
            return Ok(());
        }
        self.start_engine()
    }

    fn start_engine(&mut self) -> Result<()> {
        self.engine.set_locale(&self.locale);
        match self.engine.start() {
            Ok(()) => {
                self.engine_running = true;
                self.retry_pending = false;
                self.state = CaptureState::Listening;
                tracing::debug!(locale = %self.locale, "recognition engine restarted");
                Ok(())
            }
            Err(e) if !self.retry_pending => {
                tracing::warn!(
                    error = %e,
                    delay_ms = self.retry_delay.as_millis(),
                    "engine restart failed, retrying"
                );
                self.retry_pending = true;
                self.state = CaptureState::Restarting;
                self.events.schedule_retry(self.epoch, self.retry_delay);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "engine restart failed again, giving up");
                self.state = CaptureState::Idle;
                self.epoch += 1;
                self.retry_pending = false;
                self.timer.cancel();
                Err(Error::EngineFault(e.to_string()))
            }
        }
    }

    // Restarting on a locale change may drop audio that is mid-utterance;
    // kept for parity with the recognizer's observed behavior.
    fn maybe_switch_locale(&mut self) {
        let Some(detected) = self.heuristic.detect(&self.final_transcript) else {
            return;
        };
        if detected.locale == self.locale {
            return;
        }

        tracing::info!(
            from = %self.locale,
            to = detected.locale,
            hits = detected.hits,
            "switching recognition locale"
        );
        self.locale = detected.locale.to_string();
        self.engine.set_locale(&self.locale);

        if self.state == CaptureState::Listening && self.engine_running {
            self.state = CaptureState::Restarting;
            self.stop_engine();
        }
    }

    fn stop_engine(&mut self) {
        if self.engine_running {
            self.engine.stop();
            self.engine_running = false;
            self.ends_expected += 1;
        }
    }

    /// Whether the caller sees the session as listening
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state != CaptureState::Idle
    }

    /// Changes on every enable, disable and fatal stop
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn state(&self) -> CaptureState {
        self.state
    }

    #[must_use]
    pub fn final_transcript(&self) -> &str {
        &self.final_transcript
    }

    #[must_use]
    pub fn interim_transcript(&self) -> &str {
        &self.interim_transcript
    }

    /// Final text followed by the current interim text, trimmed
    #[must_use]
    pub fn transcript(&self) -> String {
        format!("{} {}", self.final_transcript, self.interim_transcript)
            .trim()
            .to_string()
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Whether a silence firing is scheduled
    #[must_use]
    pub fn silence_pending(&self) -> bool {
        self.timer.is_pending()
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub fn snapshot(&self) -> VoiceSession {
        VoiceSession {
            is_listening: self.is_listening(),
            final_transcript: self.final_transcript.clone(),
            interim_transcript: self.interim_transcript.clone(),
            locale: self.locale.clone(),
        }
    }
}

impl<E: RecognitionEngine> Drop for VoiceCapture<E> {
    fn drop(&mut self) {
        self.disable();
    }
}
