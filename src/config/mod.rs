//! Configuration management for parley
//!
//! Values resolve as env > TOML file > default.

pub mod file;

use std::path::Path;
use std::time::Duration;

use crate::activity::{DEFAULT_STUCK_AFTER, ToolCategories};
use crate::protocol::ChatOptions;
use crate::voice::DEFAULT_CONFIDENCE_FLOOR;
use crate::{Error, Result};

use self::file::ParleyConfigFile;

/// Default chat endpoint
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001/api/chat";

/// Default provider forwarded to the backend
pub const DEFAULT_PROVIDER: &str = "ollama";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Default recognition locale
pub const DEFAULT_LOCALE: &str = "en-US";

/// Default quiet interval before submission
pub const DEFAULT_SILENCE: Duration = Duration::from_millis(2000);

/// Default delay before the second engine start attempt
pub const DEFAULT_RESTART_RETRY_DELAY: Duration = Duration::from_millis(300);

/// parley configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Chat backend connection
    pub backend: BackendConfig,

    /// Model and exchange options
    pub chat: ChatConfig,

    /// Voice capture tuning
    pub voice: VoiceConfig,

    /// Tool activity display
    pub activity: ActivityConfig,
}

/// Chat backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Streaming chat endpoint (from `PARLEY_BACKEND_URL`)
    pub url: String,

    /// Provider name (from `PARLEY_PROVIDER`)
    pub provider: String,

    /// Overall exchange deadline (from `PARLEY_EXCHANGE_TIMEOUT_SECS`)
    pub exchange_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            exchange_timeout: crate::protocol::DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier (from `PARLEY_MODEL`)
    pub model: String,

    /// Per-exchange options
    pub options: ChatOptions,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            options: ChatOptions::default(),
        }
    }
}

/// Voice capture configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Initial recognition locale (from `PARLEY_LOCALE`)
    pub default_locale: String,

    /// Quiet interval before submission (from `PARLEY_SILENCE_MS`)
    pub silence: Duration,

    /// Minimum lexicon hits before the locale switches
    pub confidence_floor: usize,

    /// Delay before the second engine start attempt
    pub restart_retry_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
            silence: DEFAULT_SILENCE,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            restart_retry_delay: DEFAULT_RESTART_RETRY_DELAY,
        }
    }
}

/// Tool activity configuration
#[derive(Debug, Clone)]
pub struct ActivityConfig {
    /// Exchange age after which tool indicators are force-cleared
    pub stuck_after: Duration,

    /// Tool name → display category table
    pub tool_categories: ToolCategories,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            stuck_after: DEFAULT_STUCK_AFTER,
            tool_categories: ToolCategories::builtin(),
        }
    }
}

impl Config {
    /// Load configuration from the environment and the standard config file
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value fails validation
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Load configuration using an explicit config file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or a value fails validation
    pub fn load_from(path: &Path) -> Result<Self> {
        let fc = file::read_config_file(path)?;
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup over the defaults
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value fails validation
    pub fn resolve<F>(fc: ParleyConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend = BackendConfig {
            url: env("PARLEY_BACKEND_URL")
                .or(fc.backend.url)
                .unwrap_or(defaults.backend.url),
            provider: env("PARLEY_PROVIDER")
                .or(fc.backend.provider)
                .unwrap_or(defaults.backend.provider),
            exchange_timeout: parse_env(&env, "PARLEY_EXCHANGE_TIMEOUT_SECS")?
                .or(fc.backend.exchange_timeout_secs)
                .map_or(defaults.backend.exchange_timeout, Duration::from_secs),
        };

        let options = fc.chat.options.unwrap_or(defaults.chat.options);
        options.validate()?;
        let chat = ChatConfig {
            model: env("PARLEY_MODEL")
                .or(fc.chat.model)
                .unwrap_or(defaults.chat.model),
            options,
        };

        let voice = VoiceConfig {
            default_locale: env("PARLEY_LOCALE")
                .or(fc.voice.default_locale)
                .unwrap_or(defaults.voice.default_locale),
            silence: parse_env(&env, "PARLEY_SILENCE_MS")?
                .or(fc.voice.silence_ms)
                .map_or(defaults.voice.silence, Duration::from_millis),
            confidence_floor: fc
                .voice
                .confidence_floor
                .unwrap_or(defaults.voice.confidence_floor),
            restart_retry_delay: fc
                .voice
                .restart_retry_delay_ms
                .map_or(defaults.voice.restart_retry_delay, Duration::from_millis),
        };

        let activity = ActivityConfig {
            stuck_after: fc
                .activity
                .stuck_after_secs
                .map_or(defaults.activity.stuck_after, Duration::from_secs),
            tool_categories: defaults
                .activity
                .tool_categories
                .merged(fc.activity.tool_categories),
        };

        let config = Self {
            backend,
            chat,
            voice,
            activity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the offending value
    pub fn validate(&self) -> Result<()> {
        if self.backend.url.is_empty() {
            return Err(Error::Config("backend URL must not be empty".to_string()));
        }
        if self.voice.silence.is_zero() {
            return Err(Error::Config("silence interval must be positive".to_string()));
        }
        if self.backend.exchange_timeout.is_zero() {
            return Err(Error::Config("exchange timeout must be positive".to_string()));
        }
        if self.activity.stuck_after < self.backend.exchange_timeout {
            tracing::warn!(
                stuck_after_secs = self.activity.stuck_after.as_secs(),
                exchange_timeout_secs = self.backend.exchange_timeout.as_secs(),
                "stuck threshold is shorter than the exchange deadline"
            );
        }
        Ok(())
    }
}

fn parse_env<F>(env: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{key} must be an integer, got {raw:?}")))
        })
        .transpose()
}
