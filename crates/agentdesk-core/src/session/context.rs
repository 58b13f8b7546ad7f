//! Context-window management for chat sessions.
//!
//! Token counts are estimated at roughly four characters per token. When the
//! history outgrows the budget, the oldest non-system messages are dropped
//! first, one whole exchange (a user message plus the replies that follow it)
//! at a time. The system prompt and the most recent exchange (the last user
//! message and everything after it) are never dropped, even when they alone
//! exceed the budget.

use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, MessageRole};

/// Default budget, matching a 32k-token context window.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 32_768;

const CHARS_PER_TOKEN: usize = 4;

/// Estimated token budget for a session's serialized history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub max_tokens: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
        }
    }
}

impl ContextBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Rough token estimate for one message.
    pub fn estimate_tokens(message: &ChatMessage) -> usize {
        message.content.chars().count().div_ceil(CHARS_PER_TOKEN)
    }

    /// Rough token estimate for a whole history.
    pub fn estimate_total(messages: &[ChatMessage]) -> usize {
        messages.iter().map(Self::estimate_tokens).sum()
    }

    /// Drops the oldest droppable messages until the history fits.
    ///
    /// Returns the number of messages removed.
    pub fn trim(&self, messages: &mut Vec<ChatMessage>) -> usize {
        let mut total = Self::estimate_total(messages);
        if total <= self.max_tokens {
            return 0;
        }

        let start = match messages.first() {
            Some(first) if first.role == MessageRole::System => 1,
            _ => 0,
        };
        let pinned_from = messages
            .iter()
            .rposition(|m| m.role == MessageRole::User)
            .unwrap_or(messages.len())
            .max(start);

        // Drop whole exchanges so a reply never outlives its question.
        let mut drop_count = 0;
        let mut idx = start;
        while idx < pinned_from && total > self.max_tokens {
            let mut end = idx + 1;
            while end < pinned_from && messages[end].role != MessageRole::User {
                end += 1;
            }
            total -= Self::estimate_total(&messages[idx..end]);
            drop_count += end - idx;
            idx = end;
        }

        messages.drain(start..start + drop_count);
        drop_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tokens: usize) -> String {
        "x".repeat(tokens * CHARS_PER_TOKEN)
    }

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(ContextBudget::estimate_tokens(&ChatMessage::user("abcde")), 2);
        assert_eq!(ContextBudget::estimate_tokens(&ChatMessage::user("")), 0);
    }

    #[test]
    fn test_trim_noop_within_budget() {
        let budget = ContextBudget::new(100);
        let mut messages = vec![ChatMessage::system(text(10)), ChatMessage::user(text(10))];
        assert_eq!(budget.trim(&mut messages), 0);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_trim_drops_oldest_and_keeps_system_and_latest_exchange() {
        let budget = ContextBudget::new(35);
        let mut messages = vec![
            ChatMessage::system(text(5)),
            ChatMessage::user(format!("old-user{}", text(10))),
            ChatMessage::assistant(text(10)),
            ChatMessage::user(text(5)),
            ChatMessage::assistant(text(5)),
            ChatMessage::user("latest"),
            ChatMessage::assistant("reply"),
        ];

        let removed = budget.trim(&mut messages);

        assert_eq!(removed, 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages.last().unwrap().content, "reply");
        assert!(messages.iter().all(|m| !m.content.starts_with("old-user")));
        assert!(ContextBudget::estimate_total(&messages) <= 35);
    }

    #[test]
    fn test_trim_never_drops_latest_exchange_even_if_oversized() {
        let budget = ContextBudget::new(10);
        let mut messages = vec![
            ChatMessage::system(text(5)),
            ChatMessage::user(text(5)),
            ChatMessage::assistant(text(5)),
            ChatMessage::user(text(50)),
        ];

        budget.trim(&mut messages);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
    }
}
