pub mod settings;

pub use settings::{LlmConfig, MemoryConfig, ServerConfig, Settings, UiConfig, UiVariant};
