//! Voice capture module
//!
//! Continuous recognition session with silence detection and locale
//! adaptation. The recognition engine itself is an external collaborator
//! behind [`RecognitionEngine`].

mod capture;
mod engine;
mod language;
mod stdin_engine;
mod timer;
mod transcript;

pub use capture::{CaptureState, SilenceHandler, VoiceCapture, VoiceSession};
pub use engine::{
    ABORTED, CaptureEvent, EngineEvent, EngineEvents, NO_SPEECH, RecognitionEngine, Segment,
    capture_channel,
};
pub use language::{
    DEFAULT_CONFIDENCE_FLOOR, LIGHT_CONFIDENCE_FLOOR, LanguageHeuristic, LocaleScore,
};
pub use stdin_engine::StdinEngine;
pub use timer::{SilenceCallback, SilenceTimer};
pub use transcript::{MAX_REPEATS, dedupe_repetitions, prepare_submission};
