//! Scripted providers and sinks for exercising the pipeline without a
//! network or a database. Also used by the gateway tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use doppel_core::{
    AnalyticsEvent, EventSink, FeedbackRecord, Message, PersistenceError, Provider, ProviderError,
    ProviderRequest, ProviderResponse, TranscriptRecord, Usage,
};

/// Returns scripted responses in order. Once the script runs out every
/// further call fails with [`ProviderError::NotConfigured`].
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider with one text reply.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// The same text for `n` calls.
    pub fn repeating(text: &str, n: usize) -> Self {
        Self::new((0..n).map(|_| make_text_response(text)).collect())
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        lock(&self.requests).last().cloned()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = lock(&self.requests);
            requests.push(request);
            requests.len() - 1
        };
        let responses = lock(&self.responses);
        responses.get(call).cloned().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no scripted response for call #{call} (have {})",
                responses.len()
            ))
        })
    }
}

/// Replies with every message of the request joined by newlines, so tests
/// can see exactly what the prompt contained.
#[derive(Default)]
pub struct EchoProvider {
    calls: Mutex<usize>,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *lock(&self.calls) += 1;
        let text = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(make_text_response(&text))
    }
}

/// Always fails like an unreachable service.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Sleeps before answering. Pair with a paused tokio clock.
pub struct SlowProvider {
    delay: Duration,
    text: String,
}

impl SlowProvider {
    pub fn new(delay: Duration, text: impl Into<String>) -> Self {
        Self {
            delay,
            text: text.into(),
        }
    }
}

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(make_text_response(&self.text))
    }
}

/// Keeps everything it is given. Optionally fails every write.
#[derive(Default)]
pub struct RecordingSink {
    turns: Mutex<Vec<TranscriptRecord>>,
    feedback: Mutex<Vec<FeedbackRecord>>,
    events: Mutex<Vec<AnalyticsEvent>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose writes all fail after being counted.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn turns(&self) -> Vec<TranscriptRecord> {
        lock(&self.turns).clone()
    }

    pub fn feedback(&self) -> Vec<FeedbackRecord> {
        lock(&self.feedback).clone()
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        lock(&self.events).clone()
    }

    fn outcome(&self) -> Result<(), PersistenceError> {
        if self.fail {
            Err(PersistenceError::Storage("recording sink set to fail".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn record_turn(&self, record: TranscriptRecord) -> Result<(), PersistenceError> {
        lock(&self.turns).push(record);
        self.outcome()
    }

    async fn record_feedback(&self, record: FeedbackRecord) -> Result<i64, PersistenceError> {
        let id = {
            let mut feedback = lock(&self.feedback);
            feedback.push(record);
            feedback.len() as i64
        };
        self.outcome().map(|_| id)
    }

    async fn record_event(&self, event: AnalyticsEvent) -> Result<(), PersistenceError> {
        lock(&self.events).push(event);
        self.outcome()
    }
}

/// A plain text response with fixed usage numbers.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
