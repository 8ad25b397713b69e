//! Per-exchange chat options

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_MAX_TOKENS: u32 = 1536;
const DEFAULT_QUALITY_LEVEL: u8 = 1;

/// Options recognized for one exchange
///
/// Unknown keys are rejected at parse time; omitted keys take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ChatOptions {
    /// Ask the backend to stream intermediate reasoning
    #[serde(alias = "thinking_enabled")]
    pub thinking_enabled: bool,

    /// Sampling temperature in `[0, 2]`
    pub temperature: f32,

    /// Allow backend-side prompt caching
    #[serde(alias = "caching_enabled")]
    pub caching_enabled: bool,

    /// Completion token limit
    #[serde(alias = "max_tokens")]
    pub max_tokens: u32,

    /// Backend verbosity/quality level in `[0, 3]`
    #[serde(alias = "quality_level")]
    pub quality_level: u8,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            thinking_enabled: false,
            temperature: DEFAULT_TEMPERATURE,
            caching_enabled: true,
            max_tokens: DEFAULT_MAX_TOKENS,
            quality_level: DEFAULT_QUALITY_LEVEL,
        }
    }
}

impl ChatOptions {
    /// Parse options from a JSON object, rejecting unknown keys
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` for unknown keys, wrong types or out-of-range values
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let options: Self =
            serde_json::from_value(value).map_err(|e| Error::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` naming the first offending field
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::InvalidOptions(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if self.quality_level > 3 {
            return Err(Error::InvalidOptions(format!(
                "qualityLevel {} outside [0, 3]",
                self.quality_level
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::InvalidOptions("maxTokens must be positive".to_string()));
        }
        Ok(())
    }
}
