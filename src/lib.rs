//! Parley - Streaming tool-call chat client and continuous voice capture
//!
//! This library provides the client half of a voice-enabled assistant:
//! - Streaming chat exchanges with tool-call events over SSE
//! - Tool activity tracking for the in-flight reply
//! - Continuous voice capture with engine restarts and silence detection
//! - A session coordinator that submits speech once the speaker goes quiet
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Recognition Engine                  │
//! │        results  │  end  │  error  (CaptureEvent)    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Session Coordinator                  │
//! │  VoiceCapture │ SilenceTimer │ ToolActivity         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │        Protocol Client (chat backend, SSE)          │
//! │   text deltas  │  tool call/result  │  [DONE]       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod activity;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod voice;

pub use activity::{ActivityView, ToolActivity, ToolCategories};
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{ChatOptions, ChatTurn, ExchangeRequest, ProtocolClient, Role, ToolEvent};
pub use session::{SessionCoordinator, SessionHandle, SessionUpdate, SessionView};
pub use voice::{LanguageHeuristic, RecognitionEngine, SilenceTimer, VoiceCapture};
