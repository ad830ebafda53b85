//! Append-only conversation history.
//!
//! The remote agent keeps no state between calls, so the whole history is
//! handed over on every call. There is no trimming or summarization: history
//! grows for the lifetime of the session.

use chat_provider::{Role, Turn};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `turn` after every earlier turn.
    pub fn append(&mut self, turn: Turn) {
        debug!(
            role = turn.role.as_str(),
            position = self.turns.len(),
            "appending conversation turn"
        );
        self.turns.push(turn);
    }

    /// Full ordered history to send with the next remote call.
    pub fn snapshot_for_call(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of completed user/assistant exchanges.
    pub fn exchange_count(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.role == Role::Assistant)
            .count()
    }
}
