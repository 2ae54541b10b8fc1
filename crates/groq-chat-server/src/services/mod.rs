pub mod conversation;
pub mod llm_service;

pub use conversation::ConversationManager;
pub use llm_service::GroqService;
