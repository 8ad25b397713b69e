//! Backend tool name to display category table

use std::collections::HashMap;

/// Built-in mapping from backend tool names to display categories
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("web_search", "web"),
    ("fetch_url", "web"),
    ("get_weather", "weather"),
    ("calendar_list_events", "calendar"),
    ("calendar_create_event", "calendar"),
    ("read_file", "files"),
    ("write_file", "files"),
    ("run_python", "code"),
    ("run_shell", "code"),
];

/// Maps backend tool names to display categories
///
/// Unmapped names map to themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCategories {
    map: HashMap<String, String>,
}

impl ToolCategories {
    /// Empty table: every tool is its own category
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// The built-in table
    #[must_use]
    pub fn builtin() -> Self {
        DEFAULT_CATEGORIES
            .iter()
            .map(|(tool, category)| ((*tool).to_string(), (*category).to_string()))
            .collect()
    }

    /// Add or replace entries from another table
    #[must_use]
    pub fn merged(mut self, overrides: impl IntoIterator<Item = (String, String)>) -> Self {
        self.map.extend(overrides);
        self
    }

    /// Display category for a backend tool name
    #[must_use]
    pub fn category<'a>(&'a self, tool: &'a str) -> &'a str {
        self.map.get(tool).map_or(tool, String::as_str)
    }

    /// Number of explicit entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table has no explicit entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, String)> for ToolCategories {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
