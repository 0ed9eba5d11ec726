//! Sends a composed prompt to the completion service.

use std::sync::Arc;
use std::time::Duration;

use doppel_config::Settings;
use doppel_core::{GenerationError, Provider, ProviderRequest};
use tracing::{debug, warn};

use crate::prompt::ComposedPrompt;

/// Appended on a first turn when the reply forgot to ask who the visitor is.
pub const FIRST_TURN_FOLLOW_UP: &str = "Who am I talking to, and what brings you here?";

const WHO_QUESTIONS: &[&str] = &[
    "who am i talking to",
    "who am i chatting with",
    "who are you",
    "who is this",
    "who's this",
    "what's your name",
    "what is your name",
    "what brings you",
];

pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    /// One completion call, bounded by the configured timeout and never
    /// retried here. Service errors and timeouts both come back as
    /// [`GenerationError::Unavailable`].
    pub async fn generate(
        &self,
        prompt: &ComposedPrompt,
        settings: &Settings,
    ) -> Result<String, GenerationError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: prompt.messages.clone(),
            temperature: settings.temperature,
            max_tokens: Some(settings.max_tokens),
            stop: Vec::new(),
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            "Generating reply"
        );

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "Completion failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Completion timed out"
                );
                return Err(GenerationError::Unavailable(format!(
                    "completion timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::Unavailable(
                "completion service returned an empty reply".into(),
            ));
        }

        if prompt.metadata.first_turn && !asks_who(&text) {
            return Ok(format!("{text} {FIRST_TURN_FOLLOW_UP}"));
        }
        Ok(text)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::clone(&self.provider)
    }
}

fn asks_who(text: &str) -> bool {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    WHO_QUESTIONS.iter().any(|q| lowered.contains(q))
}
