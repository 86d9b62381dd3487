//! Request lifecycle orchestration
//!
//! Exactly one request may be in flight at a time. The coordinator is the
//! single owner of conversation mutations; the presentation layer only
//! calls `send`/`retry` and reads snapshots.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::backend::ChatBackend;
use super::state::ConversationState;

/// Seed assistant message for a fresh conversation.
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Generic user-visible error text. Every failure kind collapses into this.
pub const ERROR_TEXT: &str = "Network issue detected.";

/// Generic assistant fallback appended to the transcript on failure.
pub const FALLBACK_REPLY: &str = "I'm temporarily unable to respond. Please try again.";

/// Orchestrates a single send/receive/retry cycle against the backend.
#[derive(Clone)]
pub struct RequestCoordinator {
    state: Arc<RwLock<ConversationState>>,
    backend: Arc<dyn ChatBackend>,
    session_id: Arc<str>,
}

impl RequestCoordinator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        session_id: impl Into<Arc<str>>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConversationState::new(greeting))),
            backend,
            session_id: session_id.into(),
        }
    }

    /// Relay one user message to the backend and apply the outcome.
    ///
    /// Whitespace-only input and input arriving while a request is in
    /// flight are dropped silently: no transcript change, no network call,
    /// no queueing. The outgoing message lands in the transcript before the
    /// network outcome is known.
    pub async fn send(&self, raw_text: &str) {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            debug!("Ignoring empty input");
            return;
        }

        // The busy check and the optimistic append happen under one lock
        // acquisition, so a second send cannot slip in between them.
        {
            let mut state = self.state.write().await;
            if state.busy {
                debug!("Request already in flight, dropping send");
                return;
            }
            state.append_user_message(trimmed);
        }

        self.await_outcome(trimmed).await;
    }

    /// Reissue the last failed input, subject to the same busy guard as
    /// any other send. A no-op when nothing has failed. The busy check,
    /// the read of the failed input, and the optimistic append happen
    /// under one lock acquisition, so an interleaving send can neither
    /// clear the record mid-retry nor leave a stale copy to reissue.
    pub async fn retry(&self) {
        let text = {
            let mut state = self.state.write().await;
            if state.busy {
                debug!("Request already in flight, dropping retry");
                return;
            }
            let Some(text) = state.last_failed_input.clone() else {
                debug!("No failed input to retry");
                return;
            };
            state.append_user_message(&text);
            text
        };

        self.await_outcome(&text).await;
    }

    /// Issue the one backend call for an accepted send and apply its
    /// outcome. The caller has already appended the user message and
    /// entered the busy window.
    async fn await_outcome(&self, text: &str) {
        let outcome = self.backend.send_message(&self.session_id, text).await;

        let mut state = self.state.write().await;
        match outcome {
            Ok(reply) => {
                debug!("Received reply ({} chars)", reply.len());
                state.append_assistant_message(reply);
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                state.record_failure(text, ERROR_TEXT, FALLBACK_REPLY);
            }
        }
    }

    /// Read-only view of the conversation for rendering.
    pub async fn snapshot(&self) -> ConversationState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::errors::{BackendError, BackendResult};
    use crate::chat::state::{Message, Role};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::{Mutex, Notify};

    /// Backend that replays scripted outcomes and records every call.
    struct ScriptedBackend {
        outcomes: Mutex<VecDeque<Result<String, String>>>,
        calls: Mutex<Vec<(String, String)>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedBackend {
        fn new(outcomes: Vec<Result<String, String>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
                gate: None,
            })
        }

        fn gated(outcomes: Vec<Result<String, String>>, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(Vec::new()),
                gate: Some(gate),
            })
        }

        async fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send_message(&self, session_id: &str, message: &str) -> BackendResult<String> {
            self.calls
                .lock()
                .await
                .push((session_id.to_string(), message.to_string()));

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            match self.outcomes.lock().await.pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(BackendError::Api(e)),
                None => Err(BackendError::Api("no scripted outcome".to_string())),
            }
        }
    }

    fn coordinator(backend: Arc<ScriptedBackend>) -> RequestCoordinator {
        RequestCoordinator::new(backend, "session-1", DEFAULT_GREETING)
    }

    #[tokio::test]
    async fn test_whitespace_input_is_a_silent_noop() {
        let backend = ScriptedBackend::new(vec![]);
        let coord = coordinator(backend.clone());

        coord.send("   ").await;
        coord.send("\n\t").await;
        coord.send("").await;

        let state = coord.snapshot().await;
        assert_eq!(state.transcript.len(), 1);
        assert!(!state.busy);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_successful_send_appends_user_then_reply() {
        let backend = ScriptedBackend::new(vec![Ok("Hi there".to_string())]);
        let coord = coordinator(backend.clone());

        coord.send("Hello").await;

        let state = coord.snapshot().await;
        assert_eq!(state.transcript.len(), 3);
        assert_eq!(state.transcript[1], Message::user("Hello"));
        assert_eq!(state.transcript[2], Message::assistant("Hi there"));
        assert!(!state.busy);
        assert!(state.last_error.is_none());

        assert_eq!(
            backend.calls().await,
            vec![("session-1".to_string(), "Hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_input_is_trimmed_before_sending() {
        let backend = ScriptedBackend::new(vec![Ok("ok".to_string())]);
        let coord = coordinator(backend.clone());

        coord.send("  Hello  ").await;

        let state = coord.snapshot().await;
        assert_eq!(state.transcript[1], Message::user("Hello"));
        assert_eq!(backend.calls().await[0].1, "Hello");
    }

    #[tokio::test]
    async fn test_failure_records_fallback_and_failed_input() {
        let backend = ScriptedBackend::new(vec![Err("500 Internal Server Error".to_string())]);
        let coord = coordinator(backend.clone());

        coord.send("Hello").await;

        let state = coord.snapshot().await;
        assert_eq!(state.transcript.len(), 3);
        assert_eq!(state.transcript[1], Message::user("Hello"));
        assert_eq!(state.transcript[2], Message::assistant(FALLBACK_REPLY));
        assert!(!state.busy);
        assert_eq!(state.last_error.as_deref(), Some(ERROR_TEXT));
        assert_eq!(state.last_failed_input.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_retry_reissues_the_exact_failed_input() {
        let backend = ScriptedBackend::new(vec![
            Err("boom".to_string()),
            Ok("Sorted".to_string()),
        ]);
        let coord = coordinator(backend.clone());

        coord.send("Hello").await;
        coord.retry().await;

        let state = coord.snapshot().await;
        let roles: Vec<Role> = state.transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Assistant, // greeting
                Role::User,
                Role::Assistant, // fallback
                Role::User,      // retried copy
                Role::Assistant, // reply
            ]
        );
        assert_eq!(state.transcript[3], Message::user("Hello"));
        assert_eq!(state.transcript[4], Message::assistant("Sorted"));
        assert!(state.last_error.is_none());
        assert!(state.last_failed_input.is_none());

        let calls = backend.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "Hello");
        assert_eq!(calls[1].1, "Hello");
    }

    #[tokio::test]
    async fn test_retry_without_prior_failure_is_a_noop() {
        let backend = ScriptedBackend::new(vec![]);
        let coord = coordinator(backend.clone());

        coord.retry().await;

        let state = coord.snapshot().await;
        assert_eq!(state.transcript.len(), 1);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_while_busy_is_dropped() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::gated(vec![Ok("First reply".to_string())], gate.clone());
        let coord = coordinator(backend.clone());

        let first = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.send("first").await })
        };

        // Wait for the first send to enter its busy window.
        while !coord.snapshot().await.busy {
            tokio::task::yield_now().await;
        }

        // Second send arrives while the first is in flight: dropped.
        coord.send("second").await;

        let state = coord.snapshot().await;
        assert!(state.busy);
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[1], Message::user("first"));
        assert_eq!(backend.calls().await.len(), 1);

        gate.notify_one();
        first.await.unwrap();

        let state = coord.snapshot().await;
        assert!(!state.busy);
        assert_eq!(state.transcript.len(), 3);
        assert_eq!(state.transcript[2], Message::assistant("First reply"));
    }

    #[tokio::test]
    async fn test_retry_while_busy_is_dropped() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::gated(
            vec![Err("boom".to_string()), Ok("late".to_string())],
            gate.clone(),
        );
        let coord = coordinator(backend.clone());

        // Produce a failure so a retry target exists.
        gate.notify_one();
        coord.send("Hello").await;
        assert!(coord.snapshot().await.last_failed_input.is_some());

        let second = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.send("next question").await })
        };
        while !coord.snapshot().await.busy {
            tokio::task::yield_now().await;
        }

        // A retry during the busy window is itself silently dropped.
        coord.retry().await;
        assert_eq!(backend.calls().await.len(), 2);

        gate.notify_one();
        second.await.unwrap();
        assert_eq!(backend.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_retry_after_a_newer_send_cleared_the_record_is_a_noop() {
        let backend = ScriptedBackend::new(vec![
            Err("boom".to_string()),
            Ok("fresh reply".to_string()),
        ]);
        let coord = coordinator(backend.clone());

        coord.send("Hello").await;
        assert!(coord.snapshot().await.last_failed_input.is_some());

        // A newer accepted send clears the failure record; a retry
        // arriving after it must not reissue the stale text.
        coord.send("fresh").await;
        coord.retry().await;

        let state = coord.snapshot().await;
        assert_eq!(backend.calls().await.len(), 2);
        assert_eq!(state.transcript.last().unwrap().content, "fresh reply");
        assert!(state.last_failed_input.is_none());
    }

    #[tokio::test]
    async fn test_new_send_clears_previous_error() {
        let backend = ScriptedBackend::new(vec![
            Err("boom".to_string()),
            Ok("All good".to_string()),
        ]);
        let coord = coordinator(backend.clone());

        coord.send("Hello").await;
        assert!(coord.snapshot().await.last_error.is_some());

        coord.send("Something else").await;

        let state = coord.snapshot().await;
        assert!(state.last_error.is_none());
        assert!(state.last_failed_input.is_none());
        assert_eq!(state.transcript.last().unwrap().content, "All good");
    }
}
