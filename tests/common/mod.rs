//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use parley::protocol::{ByteStream, ChatRequest, ChatTransport};
use parley::voice::{EngineEvents, RecognitionEngine, Segment};
use parley::{Error, Result};

/// Wrap a payload as one SSE event
#[must_use]
pub fn sse(data: &str) -> String {
    format!("data: {data}\n\n")
}

/// SSE event carrying answer text
#[must_use]
pub fn content(text: &str) -> String {
    sse(&serde_json::json!({ "content": text }).to_string())
}

/// Canned response for one exchange
pub enum Script {
    /// Chunks delivered immediately, then end of stream
    Chunks(Vec<String>),
    /// Chunks delivered immediately, then the stream never ends
    Hang(Vec<String>),
    /// Chunks fed by the test through a channel; dropping the sender ends the stream
    Live(mpsc::UnboundedReceiver<String>),
    /// The backend cannot be reached
    Refuse(String),
}

/// Transport replaying scripts in order and recording requests
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Script whose chunks the test feeds by hand
#[must_use]
pub fn live() -> (mpsc::UnboundedSender<String>, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Script::Live(rx))
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::Refuse("no script left".to_string()));

        let chunks = |chunks: Vec<String>| {
            futures::stream::iter(chunks.into_iter().map(|c| Ok(c.into_bytes())))
        };

        match script {
            Script::Chunks(c) => Ok(chunks(c).boxed()),
            Script::Hang(c) => Ok(chunks(c).chain(futures::stream::pending()).boxed()),
            Script::Live(rx) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (Ok(chunk.into_bytes()), rx))
            })
            .boxed()),
            Script::Refuse(reason) => Err(Error::Transport(reason)),
        }
    }
}

/// Observable state of a [`FakeEngine`]
#[derive(Debug, Default)]
pub struct EngineState {
    pub starts: usize,
    pub stops: usize,
    pub running: bool,
    /// Locale passed to each successful start
    pub started_locales: Vec<String>,
    /// Number of upcoming starts that fail
    pub fail_starts: usize,
    pub unsupported: bool,
}

/// Recognition engine driven by the test through an [`EngineDriver`]
///
/// `stop()` on a running engine emits exactly one `End`, like a real engine.
pub struct FakeEngine {
    events: EngineEvents,
    locale: String,
    state: Arc<Mutex<EngineState>>,
}

/// Test side of a [`FakeEngine`]
#[derive(Clone)]
pub struct EngineDriver {
    events: EngineEvents,
    pub state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    #[must_use]
    pub fn new(events: EngineEvents) -> (Self, EngineDriver) {
        let state = Arc::new(Mutex::new(EngineState::default()));
        let driver = EngineDriver {
            events: events.clone(),
            state: Arc::clone(&state),
        };
        (
            Self {
                events,
                locale: String::new(),
                state,
            },
            driver,
        )
    }
}

impl RecognitionEngine for FakeEngine {
    fn is_supported(&self) -> bool {
        !self.state.lock().unwrap().unsupported
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_starts > 0 {
            state.fail_starts -= 1;
            return Err(Error::EngineFault("microphone busy".to_string()));
        }
        state.starts += 1;
        state.running = true;
        state.started_locales.push(self.locale.clone());
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        if state.running {
            state.running = false;
            self.events.end();
        }
    }
}

impl EngineDriver {
    pub fn final_text(&self, text: &str) {
        self.events.results(vec![Segment::final_text(text)]);
    }

    pub fn interim(&self, text: &str) {
        self.events.results(vec![Segment::interim(text)]);
    }

    pub fn results(&self, segments: Vec<Segment>) {
        self.events.results(segments);
    }

    /// The engine stops on its own
    pub fn end(&self) {
        self.state.lock().unwrap().running = false;
        self.events.end();
    }

    /// A non-fatal error; the engine keeps running
    pub fn soft_error(&self, code: &str) {
        self.events.error(code);
    }

    /// A fatal error followed by the engine's single `End`
    pub fn fault(&self, code: &str) {
        self.state.lock().unwrap().running = false;
        self.events.error(code);
        self.events.end();
    }

    pub fn fail_next_starts(&self, count: usize) {
        self.state.lock().unwrap().fail_starts = count;
    }

    #[must_use]
    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    #[must_use]
    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    #[must_use]
    pub fn running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    #[must_use]
    pub fn started_locales(&self) -> Vec<String> {
        self.state.lock().unwrap().started_locales.clone()
    }
}
