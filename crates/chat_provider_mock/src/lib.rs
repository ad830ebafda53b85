//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing. Replies and
//! transcripts can be scripted up front; once a script runs dry the mock
//! falls back to a reply describing what it received.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chat_provider::{
    AudioClip, ChatProvider, CompletionRequest, ContentBlock, ProviderError, ProviderProfile,
    Transcriber, TurnContent,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Model id reported by the mock profile.
pub const MOCK_MODEL_ID: &str = "mock";

/// Scripted result for one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Reply(String),
    Fail(String),
}

impl MockOutcome {
    fn into_result(self) -> Result<String, ProviderError> {
        match self {
            Self::Reply(text) => Ok(text),
            Self::Fail(message) => Err(ProviderError::new(message)),
        }
    }
}

/// Deterministic provider used by front-end tests and local runs.
#[derive(Debug, Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<MockOutcome>>,
    observed: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose first calls resolve to `outcomes`, in order.
    #[must_use]
    pub fn scripted(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    /// Convenience for a script made only of successful replies.
    #[must_use]
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scripted(
            replies
                .into_iter()
                .map(|reply| MockOutcome::Reply(reply.into()))
                .collect(),
        )
    }

    pub fn push_outcome(&self, outcome: MockOutcome) {
        lock_unpoisoned(&self.script).push_back(outcome);
    }

    /// Every request received so far, oldest first.
    pub fn observed_requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.observed).clone()
    }

    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.observed).len()
    }
}

impl ChatProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: MOCK_MODEL_ID.to_string(),
        }
    }

    fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let fallback = describe_request(&request);
        lock_unpoisoned(&self.observed).push(request);

        match lock_unpoisoned(&self.script).pop_front() {
            Some(outcome) => outcome.into_result(),
            None => Ok(fallback),
        }
    }
}

/// Deterministic transcriber; unscripted calls yield `mock transcript of <filename>`.
#[derive(Debug, Default)]
pub struct MockTranscriber {
    script: Mutex<VecDeque<MockOutcome>>,
    observed: Mutex<Vec<AudioClip>>,
}

impl MockTranscriber {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scripted(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            observed: Mutex::new(Vec::new()),
        }
    }

    pub fn observed_clips(&self) -> Vec<AudioClip> {
        lock_unpoisoned(&self.observed).clone()
    }

    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.observed).len()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, clip: AudioClip) -> Result<String, ProviderError> {
        let fallback = format!("mock transcript of {}", clip.filename);
        lock_unpoisoned(&self.observed).push(clip);

        match lock_unpoisoned(&self.script).pop_front() {
            Some(outcome) => outcome.into_result(),
            None => Ok(fallback),
        }
    }
}

fn describe_request(request: &CompletionRequest) -> String {
    let last = match request.turns.last() {
        Some(turn) => turn,
        None => return "Mock reply: the conversation is empty.".to_string(),
    };

    let described = match &last.content {
        TurnContent::PlainText(text) => format!("\"{text}\""),
        TurnContent::StructuredBlocks(blocks) => {
            let attachments = blocks
                .iter()
                .filter(|block| !matches!(block, ContentBlock::Text { .. }))
                .count();
            let text = blocks.iter().find_map(|block| match block {
                ContentBlock::Text { value } => Some(value.as_str()),
                _ => None,
            });
            match text {
                Some(text) => format!("\"{text}\" with {attachments} attachment(s)"),
                None => format!("{attachments} attachment(s)"),
            }
        }
    };

    format!(
        "Mock reply to {described} ({} turn(s) in history).",
        request.turns.len()
    )
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use chat_provider::Turn;

    use super::*;

    fn request(turns: Vec<Turn>) -> CompletionRequest {
        CompletionRequest {
            turns,
            instructions: "system instructions".to_string(),
        }
    }

    #[test]
    fn profile_exposes_explicit_mock_provider_identity() {
        let profile = MockProvider::new().profile();

        assert_eq!(profile.provider_id, MOCK_PROVIDER_ID);
        assert_eq!(profile.model_id, MOCK_MODEL_ID);
    }

    #[test]
    fn scripted_outcomes_are_consumed_in_order_then_fall_back() {
        let provider = MockProvider::scripted(vec![
            MockOutcome::Reply("hello".to_string()),
            MockOutcome::Fail("HTTP 500".to_string()),
        ]);

        assert_eq!(
            provider.complete(request(vec![Turn::user("hi")])).as_deref(),
            Ok("hello")
        );
        let error = provider
            .complete(request(vec![Turn::user("again")]))
            .expect_err("second outcome is scripted to fail");
        assert_eq!(error.message(), "HTTP 500");
        assert_eq!(
            provider.complete(request(vec![Turn::user("third")])).as_deref(),
            Ok("Mock reply to \"third\" (1 turn(s) in history).")
        );
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn observed_requests_keep_full_history() {
        let provider = MockProvider::with_replies(["hello", "good"]);
        provider
            .complete(request(vec![Turn::user("hi")]))
            .expect("scripted reply");
        provider
            .complete(request(vec![
                Turn::user("hi"),
                Turn::assistant("hello"),
                Turn::user("how are you"),
            ]))
            .expect("scripted reply");

        let observed = provider.observed_requests();
        assert_eq!(observed.len(), 2);
        assert_eq!(observed[1].turns.len(), 3);
        assert_eq!(observed[1].instructions, "system instructions");
    }

    #[test]
    fn fallback_reply_counts_attachments() {
        let provider = MockProvider::new();
        let reply = provider
            .complete(request(vec![Turn::user(vec![
                ContentBlock::text("compare"),
                ContentBlock::image_from_bytes("image/png", b"a"),
                ContentBlock::image_from_bytes("image/png", b"b"),
            ])]))
            .expect("fallback reply");

        assert_eq!(
            reply,
            "Mock reply to \"compare\" with 2 attachment(s) (1 turn(s) in history)."
        );
    }

    #[test]
    fn pushed_outcomes_extend_the_script() {
        let provider = MockProvider::new();
        provider.push_outcome(MockOutcome::Fail("rate limited".to_string()));

        assert!(provider.complete(request(vec![Turn::user("hi")])).is_err());
    }

    #[test]
    fn transcriber_records_clips_and_uses_script() {
        let transcriber =
            MockTranscriber::scripted(vec![MockOutcome::Reply("turn on the lights".to_string())]);
        let clip = AudioClip {
            filename: "memo.wav".to_string(),
            mime_type: Some("audio/wav".to_string()),
            bytes: vec![1, 2, 3],
        };

        assert_eq!(
            transcriber.transcribe(clip.clone()).as_deref(),
            Ok("turn on the lights")
        );
        assert_eq!(
            transcriber.transcribe(clip.clone()).as_deref(),
            Ok("mock transcript of memo.wav")
        );
        assert_eq!(transcriber.observed_clips(), vec![clip.clone(), clip]);
    }
}
