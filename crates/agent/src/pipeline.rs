//! The response pipeline.
//!
//! One call walks a fixed state machine:
//!
//! ```text
//! IdentityCheck -> InputGuard -> Retrieve -> Generate -> OutputGuard -> Done
//!                      |                        |             |
//!                   Blocked                   Failed       Blocked
//! ```
//!
//! A blocked input never reaches the provider. A blocked output is thrown
//! away whole. Nothing about a call outlives it except the feedback record
//! written when the reply hedges.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doppel_config::{AppConfig, PersonaDirective, Settings};
use doppel_core::{
    AnalyticsEvent, CorpusError, Error, EventSink, FeedbackKind, FeedbackRecord, InputVerdict,
    Outcome, PersistenceError, PipelineResult, Provider, TranscriptRecord, Turn,
};
use doppel_corpus::{Corpus, CorpusHandle, Roster, Snapshot};
use doppel_guard::{Guard, RETRY_MESSAGE, RuleSet, deflection};
use tracing::{debug, info, warn};

use crate::generator::Generator;
use crate::identity::identify;
use crate::prompt::{PromptInput, compose};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns every read-only piece a call needs. Share it behind `Arc` and call
/// [`respond`](Self::respond) from as many tasks as you like.
pub struct Pipeline {
    owner_name: String,
    directive: PersonaDirective,
    settings: Settings,
    corpus: CorpusHandle,
    guard: Guard,
    generator: Generator,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    /// A pipeline with default settings, the built-in directive, and no
    /// persistence.
    pub fn new(
        owner_name: impl Into<String>,
        corpus: Corpus,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        let owner_name = owner_name.into();
        let guard = Guard::new(Arc::new(RuleSet::new(&owner_name, &[])));
        Self {
            owner_name,
            directive: PersonaDirective::builtin(),
            settings: Settings::default(),
            corpus: CorpusHandle::from_corpus(corpus),
            guard,
            generator: Generator::new(provider, model, DEFAULT_TIMEOUT),
            sink: Arc::new(NoSink),
        }
    }

    /// Build everything from the loaded configuration: corpus from
    /// `persona.data_dir`, settings and directive from `persona.persona_dir`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, Error> {
        let persona = &config.persona;
        let settings = Settings::load_from(&persona.settings_path()).map_err(config_error)?;
        let directive =
            PersonaDirective::load_from(&persona.system_prompt_path()).map_err(config_error)?;
        let corpus = Corpus::load(&persona.data_dir, settings.rag_min_similarity)?;

        info!(
            owner = %persona.owner_name,
            documents = corpus.documents.len(),
            roster = corpus.roster.len(),
            fallback_directive = directive.is_fallback(),
            "Pipeline ready"
        );

        Ok(
            Self::new(persona.owner_name.clone(), corpus, provider, config.model.clone())
                .with_settings(settings)
                .with_directive(directive)
                .with_blocked_terms(&persona.extra_blocked_terms)
                .with_generation_timeout(Duration::from_secs(persona.generation_timeout_secs))
                .with_sink(sink),
        )
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_directive(mut self, directive: PersonaDirective) -> Self {
        self.directive = directive;
        self
    }

    /// Recompile the guard with extra blocked-topic terms.
    pub fn with_blocked_terms(mut self, terms: &[String]) -> Self {
        self.guard = Guard::new(Arc::new(RuleSet::new(&self.owner_name, terms)));
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        let provider = self.generator.provider();
        let model = self.generator.model().to_string();
        self.generator = Generator::new(provider, model, timeout);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The index and roster as of now.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.corpus.current()
    }

    pub fn roster(&self) -> Roster {
        self.snapshot().roster.clone()
    }

    /// Rebuild the index and roster from `data_dir` and swap both at once.
    /// Calls already running finish against what they started with; on
    /// error nothing changes.
    pub fn reload(&self, data_dir: &Path) -> Result<(), CorpusError> {
        self.corpus.reload(data_dir)
    }

    /// Answer one utterance given the conversation so far.
    pub async fn respond(&self, utterance: &str, history: &[Turn]) -> PipelineResult {
        self.respond_in(None, utterance, history).await
    }

    /// As [`respond`](Self::respond), tagging any feedback record with the
    /// caller's conversation id.
    pub async fn respond_in(
        &self,
        conversation_id: Option<&str>,
        utterance: &str,
        history: &[Turn],
    ) -> PipelineResult {
        let snapshot = self.snapshot();

        // ── IdentityCheck ──
        let identity = identify(&snapshot.roster, history, utterance);
        if let Some(m) = &identity {
            debug!(name = %m.name, kind = %m.kind, "Visitor identified");
        }

        // ── InputGuard ──
        if let InputVerdict {
            allowed: false,
            reason: Some(reason),
        } = self.guard.screen_input(utterance)
        {
            info!(reason = %reason, "Input blocked");
            return PipelineResult::blocked(
                deflection(reason, &self.owner_name),
                Outcome::BlockedInput,
                reason,
                identity,
            );
        }

        // ── Retrieve ──
        let chunks = snapshot.index.query(utterance, self.settings.rag_top_k);
        debug!(
            retrieved = chunks.len(),
            top_score = chunks.first().map(|c| c.score),
            "Context retrieved"
        );

        // ── Generate ──
        let prompt = compose(&PromptInput {
            owner_name: &self.owner_name,
            directive: &self.directive,
            settings: &self.settings,
            chunks: &chunks,
            identity: identity.as_ref(),
            history,
            utterance,
        });
        let text = match self.generator.generate(&prompt, &self.settings).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Generation failed");
                return PipelineResult::failed(RETRY_MESSAGE, identity);
            }
        };

        // ── OutputGuard ──
        // Anything the model was shown counts as grounding: context, the
        // history window, and the utterance itself.
        let window = &history[history.len().saturating_sub(self.settings.history_limit)..];
        let grounding: Vec<&str> = chunks
            .iter()
            .map(|c| c.chunk.text.as_str())
            .chain(window.iter().map(|t| t.text.as_str()))
            .chain(std::iter::once(utterance))
            .collect();
        let verdict = self.guard.screen_output(&text, &grounding);

        if let Some(flag) = verdict.primary_flag() {
            info!(flag = %flag, flags = ?verdict.flags, "Output blocked");
            return PipelineResult::blocked(
                deflection(flag, &self.owner_name),
                Outcome::BlockedOutput,
                flag,
                identity,
            );
        }

        if verdict.uncertain {
            self.record_unanswered(conversation_id, utterance, &text).await;
        }

        PipelineResult::done(text, identity, verdict.uncertain, !chunks.is_empty())
    }

    /// Log a hedged reply for later review. Failures never reach the caller.
    async fn record_unanswered(&self, conversation_id: Option<&str>, utterance: &str, reply: &str) {
        let record = FeedbackRecord {
            conversation_id: conversation_id.map(str::to_string),
            user_message: utterance.to_string(),
            assistant_response: Some(reply.to_string()),
            kind: FeedbackKind::Unanswered,
            rating: None,
            notes: Some("reply hedged; corpus may not cover this".into()),
            at: Utc::now(),
        };
        match self.sink.record_feedback(record).await {
            Ok(id) => debug!(feedback_id = id, sink = self.sink.name(), "Unanswered question logged"),
            Err(e) => warn!(sink = self.sink.name(), error = %e, "Failed to log unanswered question"),
        }
    }
}

fn config_error(e: doppel_config::ConfigError) -> Error {
    Error::Config {
        message: e.to_string(),
    }
}

/// Default sink: drops everything.
struct NoSink;

#[async_trait::async_trait]
impl EventSink for NoSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn record_turn(&self, _record: TranscriptRecord) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn record_feedback(&self, _record: FeedbackRecord) -> Result<i64, PersistenceError> {
        Ok(0)
    }

    async fn record_event(&self, _event: AnalyticsEvent) -> Result<(), PersistenceError> {
        Ok(())
    }
}
