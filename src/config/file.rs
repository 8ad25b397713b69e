//! TOML configuration file loading
//!
//! Supports `~/.config/parley/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::protocol::ChatOptions;
use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParleyConfigFile {
    /// Chat backend connection
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Model and per-exchange options
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Voice capture tuning
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Tool activity display
    #[serde(default)]
    pub activity: ActivityFileConfig,
}

/// Chat backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Streaming chat endpoint URL
    pub url: Option<String>,

    /// Provider name forwarded to the backend (e.g. "ollama")
    pub provider: Option<String>,

    /// Overall exchange deadline in seconds
    pub exchange_timeout_secs: Option<u64>,
}

/// Chat configuration
#[derive(Debug, Default, Deserialize)]
pub struct ChatFileConfig {
    /// Model identifier
    pub model: Option<String>,

    /// Exchange options; unknown keys are rejected
    pub options: Option<ChatOptions>,
}

/// Voice capture configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Initial recognition locale (e.g. "en-US")
    pub default_locale: Option<String>,

    /// Quiet interval before submission, in milliseconds
    pub silence_ms: Option<u64>,

    /// Minimum lexicon hits before the locale switches
    pub confidence_floor: Option<usize>,

    /// Delay before the second engine start attempt, in milliseconds
    pub restart_retry_delay_ms: Option<u64>,
}

/// Tool activity configuration
#[derive(Debug, Default, Deserialize)]
pub struct ActivityFileConfig {
    /// Exchange age after which tool indicators are force-cleared, in seconds
    pub stuck_after_secs: Option<u64>,

    /// Extra or overriding tool name → display category entries
    #[serde(default)]
    pub tool_categories: HashMap<String, String>,
}

/// Parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or does not match the schema
pub fn read_config_file(path: &Path) -> Result<ParleyConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content).map_err(|e| {
        Error::Config(format!("{}: {e}", path.display()))
    })?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the TOML config file from the standard path
///
/// Returns `ParleyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ParleyConfigFile {
    let Some(path) = config_file_path() else {
        return ParleyConfigFile::default();
    };

    if !path.exists() {
        return ParleyConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ParleyConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/parley/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("parley").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
url = "http://example.test/api/chat"

[chat.options]
maxTokens = 2048

[activity.tool_categories]
search_flights = "travel"
"#
        )
        .unwrap();

        let config = read_config_file(file.path()).unwrap();
        assert_eq!(config.backend.url.as_deref(), Some("http://example.test/api/chat"));
        assert_eq!(config.chat.options.map(|o| o.max_tokens), Some(2048));
        assert_eq!(
            config.activity.tool_categories.get("search_flights").map(String::as_str),
            Some("travel")
        );
        assert!(config.voice.silence_ms.is_none());
    }

    #[test]
    fn unknown_chat_option_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chat.options]\ntopK = 40").unwrap();

        let err = read_config_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_config_file(Path::new("/nonexistent/parley.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
