//! One chat session: a conversation plus the collaborators that extend it.
//!
//! Every front end drives a [`ChatSession`] and renders the
//! [`SessionEvent`]s it emits. A session is never shared between users.

use std::sync::Arc;

use chat_provider::{
    ChatProvider, CompletionRequest, ProviderError, ProviderInitError, ProviderProfile,
    Transcriber, Turn, TurnContent,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::classify::{classify_command_line, classify_message, ClassifiedInput, Upload};
use crate::config::ChatConfig;
use crate::conversation::Conversation;
use crate::encode::TurnEncoder;
use crate::providers::providers_for_config;

/// What happens to the user turn when the agent call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedTurnPolicy {
    /// The user turn is committed only together with the reply.
    #[default]
    Discard,
    /// The user turn stays in history even without a reply.
    Keep,
}

impl FailedTurnPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "discard" => Some(Self::Discard),
            "keep" => Some(Self::Keep),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discard => "discard",
            Self::Keep => "keep",
        }
    }
}

/// Progress of one round-trip, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Local problem with the input; the turn continues with a fallback.
    Notice(String),
    Transcribing { filename: String },
    Thinking,
    Replied(String),
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("nothing to send")]
    NothingToSend,
    #[error(transparent)]
    Remote(#[from] ProviderError),
}

pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    encoder: TurnEncoder,
    conversation: Conversation,
    instructions: String,
    failed_turn_policy: FailedTurnPolicy,
}

impl ChatSession {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        transcriber: Arc<dyn Transcriber>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            encoder: TurnEncoder::new(transcriber),
            conversation: Conversation::new(),
            instructions: instructions.into(),
            failed_turn_policy: FailedTurnPolicy::default(),
        }
    }

    /// Resolves providers from `config`; fails before any remote call when a
    /// credential is missing.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ProviderInitError> {
        let handles = providers_for_config(config)?;
        Ok(
            Self::new(handles.chat, handles.transcriber, config.instructions.clone())
                .with_failed_turn_policy(config.failed_turn_policy),
        )
    }

    #[must_use]
    pub fn with_failed_turn_policy(mut self, policy: FailedTurnPolicy) -> Self {
        self.failed_turn_policy = policy;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn failed_turn_policy(&self) -> FailedTurnPolicy {
        self.failed_turn_policy
    }

    pub fn profile(&self) -> ProviderProfile {
        self.provider.profile()
    }

    /// Terminal path: one line, attachment marked by a leading command token.
    ///
    /// A line that cannot be classified or encoded is sent as typed, after a
    /// [`SessionEvent::Notice`].
    pub fn send_command_line(
        &mut self,
        line: &str,
        emit: &mut dyn FnMut(SessionEvent),
    ) -> Result<String, SessionError> {
        if line.trim().is_empty() {
            return Err(SessionError::NothingToSend);
        }

        let content = match classify_command_line(line) {
            Ok(input) => self.encode_or_fallback(input, line, emit),
            Err(error) => {
                warn!(%error, "attachment command fell back to plain text");
                emit(SessionEvent::Notice(error.to_string()));
                TurnContent::PlainText(line.to_string())
            }
        };

        self.round_trip(content, emit)
    }

    /// Browser path: free text plus any number of uploaded files.
    ///
    /// Unsupported uploads are skipped with a notice. When encoding fails the
    /// text alone is sent; with no text either, nothing is sent.
    pub fn send_uploads(
        &mut self,
        text: &str,
        uploads: Vec<Upload>,
        emit: &mut dyn FnMut(SessionEvent),
    ) -> Result<String, SessionError> {
        let (input, rejected) = classify_message(text, uploads);
        for error in rejected {
            warn!(%error, "upload skipped");
            emit(SessionEvent::Notice(error.to_string()));
        }

        if matches!(&input, ClassifiedInput::Plain(text) if text.is_empty()) {
            return Err(SessionError::NothingToSend);
        }

        let fallback = input.text().to_string();
        let content = self.encode_or_fallback(input, &fallback, emit);
        if content.as_plain_text().is_some_and(str::is_empty) {
            return Err(SessionError::NothingToSend);
        }

        self.round_trip(content, emit)
    }

    fn encode_or_fallback(
        &self,
        input: ClassifiedInput,
        fallback: &str,
        emit: &mut dyn FnMut(SessionEvent),
    ) -> TurnContent {
        let encoded = self.encoder.encode(input, &mut |filename: &str| {
            emit(SessionEvent::Transcribing {
                filename: filename.to_string(),
            })
        });

        match encoded {
            Ok(content) => content,
            Err(error) => {
                warn!(%error, "attachment encoding fell back to plain text");
                emit(SessionEvent::Notice(error.to_string()));
                TurnContent::PlainText(fallback.to_string())
            }
        }
    }

    /// Sends the committed history plus `content` and commits the exchange.
    fn round_trip(
        &mut self,
        content: TurnContent,
        emit: &mut dyn FnMut(SessionEvent),
    ) -> Result<String, SessionError> {
        let user_turn = Turn::user(content);
        let mut turns = self.conversation.snapshot_for_call();
        turns.push(user_turn.clone());

        let mut pending_user_turn = Some(user_turn);
        if self.failed_turn_policy == FailedTurnPolicy::Keep {
            if let Some(turn) = pending_user_turn.take() {
                self.conversation.append(turn);
            }
        }

        emit(SessionEvent::Thinking);
        let request = CompletionRequest {
            turns,
            instructions: self.instructions.clone(),
        };

        match self.provider.complete(request) {
            Ok(reply) => {
                if let Some(turn) = pending_user_turn.take() {
                    self.conversation.append(turn);
                }
                self.conversation.append(Turn::assistant(reply.clone()));
                debug!(
                    exchanges = self.conversation.exchange_count(),
                    turns = self.conversation.len(),
                    "exchange committed"
                );
                emit(SessionEvent::Replied(reply.clone()));
                Ok(reply)
            }
            Err(error) => {
                warn!(
                    %error,
                    policy = self.failed_turn_policy.as_str(),
                    "agent call failed"
                );
                emit(SessionEvent::Failed(error.to_string()));
                Err(SessionError::Remote(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chat_provider_mock::{MockOutcome, MockProvider, MockTranscriber};

    use super::*;

    fn session_with(provider: Arc<MockProvider>) -> ChatSession {
        ChatSession::new(provider, Arc::new(MockTranscriber::new()), "be helpful")
    }

    #[test]
    fn failed_turn_policy_parses_case_insensitively() {
        assert_eq!(FailedTurnPolicy::parse(" Keep "), Some(FailedTurnPolicy::Keep));
        assert_eq!(FailedTurnPolicy::parse("DISCARD"), Some(FailedTurnPolicy::Discard));
        assert_eq!(FailedTurnPolicy::parse("rollback"), None);
    }

    #[test]
    fn blank_line_sends_nothing() {
        let provider = Arc::new(MockProvider::new());
        let mut session = session_with(Arc::clone(&provider));

        let result = session.send_command_line("   ", &mut |_| {});

        assert!(matches!(result, Err(SessionError::NothingToSend)));
        assert_eq!(provider.call_count(), 0);
        assert!(session.conversation().is_empty());
    }

    #[test]
    fn events_follow_round_trip_order() {
        let provider = Arc::new(MockProvider::with_replies(["hello"]));
        let mut session = session_with(provider);
        let mut events = Vec::new();

        session
            .send_command_line("hi", &mut |event| events.push(event))
            .expect("round-trip succeeds");

        assert_eq!(
            events,
            vec![
                SessionEvent::Thinking,
                SessionEvent::Replied("hello".to_string())
            ]
        );
    }

    #[test]
    fn discard_policy_leaves_history_untouched_on_failure() {
        let provider = Arc::new(MockProvider::scripted(vec![MockOutcome::Fail(
            "HTTP 500".to_string(),
        )]));
        let mut session = session_with(provider);
        let mut events = Vec::new();

        let error = session
            .send_command_line("hi", &mut |event| events.push(event))
            .expect_err("scripted failure");

        assert_eq!(error.to_string(), "HTTP 500");
        assert!(session.conversation().is_empty());
        assert_eq!(events.last(), Some(&SessionEvent::Failed("HTTP 500".to_string())));
    }

    #[test]
    fn keep_policy_retains_unanswered_user_turn() {
        let provider = Arc::new(MockProvider::scripted(vec![MockOutcome::Fail(
            "timeout".to_string(),
        )]));
        let mut session = session_with(provider).with_failed_turn_policy(FailedTurnPolicy::Keep);

        assert!(session.send_command_line("hi", &mut |_| {}).is_err());

        assert_eq!(session.conversation().turns(), &[Turn::user("hi")]);
    }

    #[test]
    fn upload_turn_without_text_or_files_is_rejected() {
        let provider = Arc::new(MockProvider::new());
        let mut session = session_with(Arc::clone(&provider));

        let result = session.send_uploads("  ", Vec::new(), &mut |_| {});

        assert!(matches!(result, Err(SessionError::NothingToSend)));
        assert_eq!(provider.call_count(), 0);
    }
}
