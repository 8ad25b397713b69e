//! Line-driven recognition engine for terminals
//!
//! Each stdin line stands in for a recognized segment: `~text` is an interim
//! fragment, `!code` reports an engine error, an empty line is ignored and any
//! other line is a final fragment. Lines typed while the engine is stopped are
//! dropped, like audio spoken into a closed microphone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, BufReader};

use super::engine::{EngineEvents, RecognitionEngine, Segment};
use crate::{Error, Result};

/// Engine reading "recognized" lines from stdin
pub struct StdinEngine {
    events: EngineEvents,
    locale: String,
    running: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl StdinEngine {
    /// Spawn the stdin reader and return the engine
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(events: EngineEvents) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_events = events.clone();
        let reader_running = Arc::clone(&running);
        let reader_closed = Arc::clone(&closed);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if reader_running.load(Ordering::SeqCst) {
                            emit_line(&reader_events, &line);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            if reader_running.swap(false, Ordering::SeqCst) {
                reader_events.end();
            }
        });

        Self {
            events,
            locale: String::new(),
            running,
            closed,
        }
    }
}

fn emit_line(events: &EngineEvents, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if let Some(interim) = line.strip_prefix('~') {
        events.results(vec![Segment::interim(interim)]);
    } else if let Some(code) = line.strip_prefix('!') {
        events.error(code.trim());
        events.end();
    } else {
        events.results(vec![Segment::final_text(line)]);
    }
}

impl RecognitionEngine for StdinEngine {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn set_locale(&mut self, locale: &str) {
        locale.clone_into(&mut self.locale);
    }

    fn start(&mut self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::EngineFault("stdin closed".to_string()));
        }
        self.running.store(true, Ordering::SeqCst);
        tracing::debug!(locale = %self.locale, "stdin engine started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.events.end();
        }
    }
}
