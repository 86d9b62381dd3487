//! Conversation state and its transition operations

use serde::{Deserialize, Serialize};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The transcript plus the transient flags the presentation layer renders.
///
/// The transcript is append-only: no operation edits or removes a message.
/// `last_error` and `last_failed_input` are set and cleared together.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub transcript: Vec<Message>,
    pub busy: bool,
    pub last_error: Option<String>,
    pub last_failed_input: Option<String>,
}

impl ConversationState {
    /// Create a fresh conversation seeded with an assistant greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            transcript: vec![Message::assistant(greeting)],
            busy: false,
            last_error: None,
            last_failed_input: None,
        }
    }

    /// Append the outgoing user message and enter the busy window.
    ///
    /// Clears any previous failure record; the caller enforces that `busy`
    /// is false before invoking this.
    pub fn append_user_message(&mut self, text: impl Into<String>) {
        self.transcript.push(Message::user(text));
        self.busy = true;
        self.last_error = None;
        self.last_failed_input = None;
    }

    /// Append the assistant reply and leave the busy window.
    pub fn append_assistant_message(&mut self, text: impl Into<String>) {
        self.transcript.push(Message::assistant(text));
        self.busy = false;
    }

    /// Record a failed send: the fallback reply lands in the transcript and
    /// the failed input is kept so a retry can reissue it byte-for-byte.
    pub fn record_failure(
        &mut self,
        original_input: impl Into<String>,
        error_text: impl Into<String>,
        fallback_reply: impl Into<String>,
    ) {
        self.transcript.push(Message::assistant(fallback_reply));
        self.busy = false;
        self.last_error = Some(error_text.into());
        self.last_failed_input = Some(original_input.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ConversationState {
        ConversationState::new("Hello! How can I help you today?")
    }

    #[test]
    fn test_new_state_seeds_greeting() {
        let state = fresh();
        assert_eq!(state.transcript.len(), 1);
        assert_eq!(state.transcript[0].role, Role::Assistant);
        assert!(!state.busy);
        assert!(state.last_error.is_none());
        assert!(state.last_failed_input.is_none());
    }

    #[test]
    fn test_append_user_message_enters_busy_and_clears_failure() {
        let mut state = fresh();
        state.record_failure("old", "Network issue detected.", "fallback");

        state.append_user_message("Hello");

        assert!(state.busy);
        assert!(state.last_error.is_none());
        assert!(state.last_failed_input.is_none());
        assert_eq!(state.transcript.last().unwrap(), &Message::user("Hello"));
    }

    #[test]
    fn test_append_assistant_message_leaves_busy() {
        let mut state = fresh();
        state.append_user_message("Hello");
        state.append_assistant_message("Hi there");

        assert!(!state.busy);
        assert_eq!(
            state.transcript.last().unwrap(),
            &Message::assistant("Hi there")
        );
    }

    #[test]
    fn test_record_failure_sets_error_and_input_together() {
        let mut state = fresh();
        state.append_user_message("Hello");
        state.record_failure("Hello", "Network issue detected.", "Try again.");

        assert!(!state.busy);
        assert_eq!(state.last_error.as_deref(), Some("Network issue detected."));
        assert_eq!(state.last_failed_input.as_deref(), Some("Hello"));
        assert_eq!(
            state.transcript.last().unwrap(),
            &Message::assistant("Try again.")
        );
    }

    #[test]
    fn test_error_and_failed_input_always_paired() {
        let mut state = fresh();
        assert_eq!(state.last_error.is_some(), state.last_failed_input.is_some());

        state.append_user_message("a");
        assert_eq!(state.last_error.is_some(), state.last_failed_input.is_some());

        state.record_failure("a", "err", "fallback");
        assert_eq!(state.last_error.is_some(), state.last_failed_input.is_some());

        state.append_user_message("b");
        assert_eq!(state.last_error.is_some(), state.last_failed_input.is_some());

        state.append_assistant_message("ok");
        assert_eq!(state.last_error.is_some(), state.last_failed_input.is_some());
    }

    #[test]
    fn test_transcript_grows_by_exactly_one_per_operation() {
        let mut state = fresh();
        let before = state.transcript.clone();

        state.append_user_message("Hello");
        assert_eq!(&state.transcript[..before.len()], &before[..]);
        assert_eq!(state.transcript.len(), before.len() + 1);

        let before = state.transcript.clone();
        state.record_failure("Hello", "err", "fallback");
        assert_eq!(&state.transcript[..before.len()], &before[..]);
        assert_eq!(state.transcript.len(), before.len() + 1);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
