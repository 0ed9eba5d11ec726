//! Flat generation settings read from `settings.txt`.
//!
//! Format is one `key = value` per line. Lines starting with `#` and blank
//! lines are skipped. Unknown keys are ignored with a warning so an older
//! binary can read a newer file.

use std::path::Path;

use crate::ConfigError;

pub const SETTINGS_FILE: &str = "settings.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Most recent history turns forwarded to the model
    pub history_limit: usize,
    pub rag_top_k: usize,
    pub rag_min_similarity: f32,
    /// Free-form text appended to the style section of the prompt
    pub additional_instructions: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
            history_limit: 20,
            rag_top_k: 3,
            rag_min_similarity: 0.05,
            additional_instructions: String::new(),
        }
    }
}

impl Settings {
    /// Parse settings text. Keys not present keep their defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "temperature" => settings.temperature = parse_value(key, value)?,
                "max_tokens" => settings.max_tokens = parse_value(key, value)?,
                "history_limit" => settings.history_limit = parse_value(key, value)?,
                "rag_top_k" => settings.rag_top_k = parse_value(key, value)?,
                "rag_min_similarity" => settings.rag_min_similarity = parse_value(key, value)?,
                "additional_instructions" => settings.additional_instructions = value.to_string(),
                other => tracing::warn!(key = other, "Ignoring unknown setting"),
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(invalid(
                "temperature",
                self.temperature,
                "must be between 0.0 and 1.0",
            ));
        }
        if self.history_limit == 0 {
            return Err(invalid("history_limit", self.history_limit, "must be >= 1"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", self.max_tokens, "must be >= 1"));
        }
        if !(0.0..1.0).contains(&self.rag_min_similarity) {
            return Err(invalid(
                "rag_min_similarity",
                self.rag_min_similarity,
                "must be in [0.0, 1.0)",
            ));
        }
        Ok(())
    }

    /// A commented sample file (for the `init` command).
    pub fn sample() -> String {
        let d = Self::default();
        format!(
            "# Generation settings\n\
             temperature = {}\n\
             max_tokens = {}\n\
             history_limit = {}\n\
             \n\
             # Retrieval\n\
             rag_top_k = {}\n\
             rag_min_similarity = {}\n\
             \n\
             # Appended to the style section of every prompt\n\
             additional_instructions =\n",
            d.temperature, d.max_tokens, d.history_limit, d.rag_top_k, d.rag_min_similarity
        )
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(key: &str, value: impl std::fmt::Display, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
