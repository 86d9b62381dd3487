//! Conversation core: state machine, request lifecycle, and backend client

mod backend;
mod coordinator;
mod errors;
mod state;

pub use backend::{ChatBackend, HttpBackend};
pub use coordinator::{RequestCoordinator, DEFAULT_GREETING, ERROR_TEXT, FALLBACK_REPLY};
pub use errors::{BackendError, BackendResult};
pub use state::{ConversationState, Message, Role};
