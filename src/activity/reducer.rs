//! Provisional message and active tool set reducer

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tokio::time::Instant;

use super::categories::ToolCategories;
use crate::protocol::{ChatTurn, ExchangeSink, ToolEvent};

/// Exchange age after which tool indicators are force-cleared (15 minutes)
pub const DEFAULT_STUCK_AFTER: Duration = Duration::from_secs(15 * 60);

/// Longest parameter rendering shown in the provisional message
const MAX_PARAMS_CHARS: usize = 120;

/// Renderable state of the current exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityView {
    pub loading: bool,
    pub provisional: Option<String>,
    /// Backend tool names with a call still awaiting its result
    pub active_tools: Vec<String>,
    /// Display categories of `active_tools`, deduplicated
    pub active_categories: Vec<String>,
}

/// Reduces exchange callbacks into UI state
///
/// Holds the in-memory conversation turns; persistence belongs to the caller.
#[derive(Debug)]
pub struct ToolActivity {
    categories: ToolCategories,
    stuck_after: Duration,
    loading: bool,
    provisional: Option<String>,
    /// Outstanding calls per backend tool name
    active: BTreeMap<String, usize>,
    /// `final` seen; later call/result frames are ignored
    final_seen: bool,
    started_at: Option<Instant>,
    turns: Vec<ChatTurn>,
}

impl ToolActivity {
    #[must_use]
    pub fn new(categories: ToolCategories, stuck_after: Duration) -> Self {
        Self {
            categories,
            stuck_after,
            loading: false,
            provisional: None,
            active: BTreeMap::new(),
            final_seen: false,
            started_at: None,
            turns: Vec::new(),
        }
    }

    /// Start an exchange for `user_text`
    ///
    /// Records the user turn and returns the turns that preceded it.
    pub fn begin(&mut self, user_text: &str) -> Vec<ChatTurn> {
        let prior = self.turns.clone();
        self.turns.push(ChatTurn::user(user_text));
        self.loading = true;
        self.provisional = Some(String::new());
        self.active.clear();
        self.final_seen = false;
        self.started_at = Some(Instant::now());
        prior
    }

    /// Replace the provisional turn with the persisted assistant turn
    pub fn complete(&mut self, final_text: &str) -> ChatTurn {
        let turn = ChatTurn::assistant(final_text);
        self.turns.push(turn.clone());
        self.settle();
        turn
    }

    /// Discard the provisional turn entirely
    pub fn fail(&mut self) {
        self.settle();
    }

    /// Force-clear indicators for an exchange older than the stuck threshold
    ///
    /// Returns `true` if anything was cleared. The provisional text is kept so
    /// a late completion can still land.
    pub fn enforce_liveness(&mut self, now: Instant) -> bool {
        let Some(started_at) = self.started_at else {
            return false;
        };
        if !self.loading || now.saturating_duration_since(started_at) < self.stuck_after {
            return false;
        }

        tracing::warn!(
            elapsed_secs = now.saturating_duration_since(started_at).as_secs(),
            active = self.active.len(),
            "exchange stuck, clearing tool indicators"
        );
        self.active.clear();
        self.loading = false;
        true
    }

    /// Seed the conversation with existing turns
    pub fn load_turns(&mut self, turns: Vec<ChatTurn>) {
        self.settle();
        self.turns = turns;
    }

    /// Drop all turns and exchange state
    pub fn clear(&mut self) {
        self.settle();
        self.turns.clear();
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn provisional(&self) -> Option<&str> {
        self.provisional.as_deref()
    }

    /// Whether `tool` has a call awaiting its result
    #[must_use]
    pub fn is_active(&self, tool: &str) -> bool {
        self.active.contains_key(tool)
    }

    #[must_use]
    pub fn active_tools(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    /// Display categories of the active tools
    #[must_use]
    pub fn active_categories(&self) -> Vec<String> {
        self.active
            .keys()
            .map(|tool| self.categories.category(tool).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Persisted turns plus the provisional one, if any
    #[must_use]
    pub fn rendered_turns(&self) -> Vec<ChatTurn> {
        let mut turns = self.turns.clone();
        if let Some(text) = &self.provisional {
            turns.push(ChatTurn::provisional(text.clone()));
        }
        turns
    }

    #[must_use]
    pub fn snapshot(&self) -> ActivityView {
        ActivityView {
            loading: self.loading,
            provisional: self.provisional.clone(),
            active_tools: self.active_tools(),
            active_categories: self.active_categories(),
        }
    }

    fn settle(&mut self) {
        self.loading = false;
        self.provisional = None;
        self.active.clear();
        self.final_seen = false;
        self.started_at = None;
    }
}

impl ExchangeSink for ToolActivity {
    fn on_text_delta(&mut self, delta: &str) {
        if let Some(text) = self.provisional.as_mut() {
            text.push_str(delta);
        }
    }

    fn on_tool_event(&mut self, event: ToolEvent) {
        if self.provisional.is_none() {
            tracing::debug!(kind = event.kind(), "tool event outside an exchange, ignoring");
            return;
        }

        match event {
            ToolEvent::Call { .. } | ToolEvent::Result { .. } | ToolEvent::Final
                if self.final_seen =>
            {
                tracing::warn!(kind = event.kind(), "tool event after final response, ignoring");
            }
            ToolEvent::Call { tool, params } => {
                let category = self.categories.category(&tool);
                self.provisional = Some(format!(
                    "Using {category} with {}",
                    render_params(&params)
                ));
                *self.active.entry(tool).or_insert(0) += 1;
            }
            ToolEvent::Result { tool, .. } => {
                let category = self.categories.category(&tool);
                self.provisional = Some(format!("Received result from {category}"));
                if let Some(outstanding) = self.active.get_mut(&tool) {
                    *outstanding -= 1;
                    if *outstanding == 0 {
                        self.active.remove(&tool);
                    }
                }
            }
            ToolEvent::Final => {
                self.final_seen = true;
                self.provisional = Some(String::new());
                self.active.clear();
            }
            ToolEvent::Thinking { text } => {
                tracing::trace!(chars = text.len(), "thinking");
            }
        }
    }
}

fn render_params(params: &serde_json::Value) -> String {
    let rendered = params.to_string();
    if rendered.chars().count() <= MAX_PARAMS_CHARS {
        return rendered;
    }
    let truncated: String = rendered.chars().take(MAX_PARAMS_CHARS).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn activity() -> ToolActivity {
        ToolActivity::new(ToolCategories::builtin(), DEFAULT_STUCK_AFTER)
    }

    #[test]
    fn call_then_result_tracks_membership() {
        let mut activity = activity();
        activity.begin("weather in Paris?");

        activity.on_tool_event(ToolEvent::Call {
            tool: "get_weather".to_string(),
            params: json!({ "city": "Paris" }),
        });
        assert!(activity.is_active("get_weather"));
        assert_eq!(activity.active_categories(), vec!["weather"]);
        assert_eq!(
            activity.provisional(),
            Some(r#"Using weather with {"city":"Paris"}"#)
        );

        activity.on_tool_event(ToolEvent::Result {
            tool: "get_weather".to_string(),
            result: json!({ "temp": 20 }),
        });
        assert!(!activity.is_active("get_weather"));
        assert_eq!(activity.provisional(), Some("Received result from weather"));
    }

    #[test]
    fn final_resets_accumulation() {
        let mut activity = activity();
        activity.begin("q");
        activity.on_tool_event(ToolEvent::Call {
            tool: "web_search".to_string(),
            params: json!({ "query": "rust" }),
        });
        activity.on_tool_event(ToolEvent::Final);
        assert!(activity.active_tools().is_empty());
        assert_eq!(activity.provisional(), Some(""));

        activity.on_text_delta("Rust is ");
        activity.on_text_delta("a language.");
        assert_eq!(activity.provisional(), Some("Rust is a language."));
    }

    #[test]
    fn overlapping_calls_in_one_category() {
        let mut activity = activity();
        activity.begin("compare sources");

        for tool in ["web_search", "fetch_url"] {
            activity.on_tool_event(ToolEvent::Call {
                tool: tool.to_string(),
                params: json!({}),
            });
        }
        assert_eq!(activity.active_tools(), vec!["fetch_url", "web_search"]);
        assert_eq!(activity.active_categories(), vec!["web"]);

        activity.on_tool_event(ToolEvent::Result {
            tool: "web_search".to_string(),
            result: json!([]),
        });
        assert!(!activity.is_active("web_search"));
        assert!(activity.is_active("fetch_url"));
        assert_eq!(activity.snapshot().active_categories, vec!["web"]);

        activity.on_tool_event(ToolEvent::Result {
            tool: "fetch_url".to_string(),
            result: json!("<html>"),
        });
        assert!(activity.active_tools().is_empty());
        assert!(activity.active_categories().is_empty());
    }

    #[test]
    fn repeated_calls_to_one_tool_need_every_result() {
        let mut activity = activity();
        activity.begin("two cities");
        for city in ["Paris", "Oslo"] {
            activity.on_tool_event(ToolEvent::Call {
                tool: "get_weather".to_string(),
                params: json!({ "city": city }),
            });
        }

        activity.on_tool_event(ToolEvent::Result {
            tool: "get_weather".to_string(),
            result: json!({ "temp": 20 }),
        });
        assert!(activity.is_active("get_weather"));

        activity.on_tool_event(ToolEvent::Result {
            tool: "get_weather".to_string(),
            result: json!({ "temp": -3 }),
        });
        assert!(!activity.is_active("get_weather"));
    }

    #[test]
    fn tool_events_after_final_are_ignored() {
        let mut activity = activity();
        activity.begin("q");
        activity.on_tool_event(ToolEvent::Final);
        activity.on_text_delta("Answer.");

        activity.on_tool_event(ToolEvent::Call {
            tool: "get_weather".to_string(),
            params: json!({}),
        });
        activity.on_tool_event(ToolEvent::Final);

        assert_eq!(activity.provisional(), Some("Answer."));
        assert!(activity.active_tools().is_empty());

        // the next exchange starts clean
        activity.complete("Answer.");
        activity.begin("again");
        activity.on_tool_event(ToolEvent::Call {
            tool: "get_weather".to_string(),
            params: json!({}),
        });
        assert!(activity.is_active("get_weather"));
    }

    #[test]
    fn complete_replaces_provisional() {
        let mut activity = activity();
        activity.begin("hi");
        activity.on_text_delta("hello");
        assert_eq!(activity.rendered_turns().len(), 2);

        let turn = activity.complete("hello");
        assert!(!turn.is_provisional);
        assert!(!activity.is_loading());
        assert_eq!(activity.provisional(), None);
        assert_eq!(activity.turns().len(), 2);
        assert_eq!(activity.rendered_turns().len(), 2);
    }

    #[test]
    fn fail_discards_provisional_and_tools() {
        let mut activity = activity();
        activity.begin("hi");
        activity.on_tool_event(ToolEvent::Call {
            tool: "run_shell".to_string(),
            params: json!({ "command": "ls" }),
        });
        activity.fail();

        assert!(activity.active_tools().is_empty());
        assert_eq!(activity.provisional(), None);
        assert_eq!(activity.turns().len(), 1);
    }

    #[test]
    fn events_outside_exchange_are_ignored() {
        let mut activity = activity();
        activity.on_tool_event(ToolEvent::Call {
            tool: "get_weather".to_string(),
            params: json!({}),
        });
        activity.on_text_delta("stray");
        assert!(activity.active_tools().is_empty());
        assert_eq!(activity.provisional(), None);
    }

    #[test]
    fn begin_returns_prior_turns() {
        let mut activity = activity();
        activity.load_turns(vec![ChatTurn::user("a"), ChatTurn::assistant("b")]);
        let prior = activity.begin("c");
        assert_eq!(prior.len(), 2);
        assert_eq!(activity.turns().len(), 3);
    }

    #[test]
    fn liveness_clears_stuck_exchange() {
        let mut activity = ToolActivity::new(ToolCategories::identity(), Duration::from_secs(60));
        activity.begin("q");
        activity.on_tool_event(ToolEvent::Call {
            tool: "slow_tool".to_string(),
            params: json!({}),
        });

        let now = Instant::now();
        assert!(!activity.enforce_liveness(now));
        assert!(activity.is_active("slow_tool"));

        assert!(activity.enforce_liveness(now + Duration::from_secs(61)));
        assert!(!activity.is_loading());
        assert!(activity.active_tools().is_empty());

        // late completion still lands
        activity.complete("done eventually");
        assert_eq!(activity.turns().last().map(|t| t.content.as_str()), Some("done eventually"));
    }

    #[test]
    fn long_params_are_truncated() {
        let long = "x".repeat(500);
        let rendered = render_params(&json!({ "blob": long }));
        assert!(rendered.ends_with('…'));
        assert_eq!(rendered.chars().count(), MAX_PARAMS_CHARS + 1);
    }
}
