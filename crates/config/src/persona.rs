//! The persona directive: the owner-written opening of every system prompt.

use std::path::Path;

use crate::ConfigError;

pub const SYSTEM_PROMPT_FILE: &str = "system_prompt.txt";

const DEFAULT_DIRECTIVE: &str = "You are a digital twin representing the owner of this website. \
Be friendly, conversational, and authentic. Share information about the owner openly, \
but only what you have been told.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaDirective {
    text: String,
    /// True when no file was found and the built-in text is in use
    fallback: bool,
}

impl PersonaDirective {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fallback: false,
        }
    }

    pub fn builtin() -> Self {
        Self {
            text: DEFAULT_DIRECTIVE.to_string(),
            fallback: true,
        }
    }

    /// Read `system_prompt.txt`. A missing or blank file falls back to the
    /// built-in directive; an unreadable one is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No system prompt at {}, using built-in directive", path.display());
            return Ok(Self::builtin());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::builtin());
        }
        Ok(Self::new(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl Default for PersonaDirective {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let d = PersonaDirective::load_from(&dir.path().join(SYSTEM_PROMPT_FILE)).unwrap();
        assert!(d.is_fallback());
        assert!(d.as_str().contains("digital twin"));
    }

    #[test]
    fn file_contents_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SYSTEM_PROMPT_FILE);
        std::fs::write(&path, "\n  You are Cameron's stand-in.  \n").unwrap();
        let d = PersonaDirective::load_from(&path).unwrap();
        assert!(!d.is_fallback());
        assert_eq!(d.as_str(), "You are Cameron's stand-in.");
    }

    #[test]
    fn blank_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SYSTEM_PROMPT_FILE);
        std::fs::write(&path, "   \n").unwrap();
        assert!(PersonaDirective::load_from(&path).unwrap().is_fallback());
    }
}
