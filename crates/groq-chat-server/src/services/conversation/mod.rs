//! Conversation memory management module
//!
//! Provides in-memory conversation state with:
//! - Rolling turn windows (bounded FIFO or unbounded)
//! - Per-session handles in a concurrent store
//! - Context building for the completion request

mod context_builder;
pub mod manager;
pub mod session;
mod store;
pub mod types;
mod window;

pub use context_builder::ContextBuilder;
pub use manager::{AskOutcome, ConversationManager, LlmProvider, ResetOutcome};
pub use session::{Session, SessionDefaults};
pub use store::{SessionHandle, SessionStore, StoreStats};
pub use types::{validate_temperature, GenerationRequest, PromptStyle, Turn, WindowCapacity};
pub use window::MemoryWindow;
