use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::services::conversation::{validate_temperature, PromptStyle, WindowCapacity};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bind every interface so the page is reachable from other machines
    pub share: bool,
    /// Open the local URL in the default browser once the listener is bound
    pub open_browser: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub default_temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    pub timeout_seconds: u64,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    /// Number of turns kept per session, 0 means unbounded
    pub window_size: usize,
    pub session_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub max_sessions: usize,
    pub prompt_style: PromptStyle,
    #[serde(default)]
    pub preamble: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UiVariant {
    /// Single question, single answer
    Textbox,
    /// Running transcript with temperature slider and reset button
    Chat,
}

impl std::str::FromStr for UiVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "textbox" => Ok(Self::Textbox),
            "chat" => Ok(Self::Chat),
            other => Err(format!("unknown ui variant '{}', expected textbox or chat", other)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiConfig {
    pub variant: UiVariant,
    pub title: String,
    pub description: String,
}

impl MemoryConfig {
    pub fn capacity(&self) -> WindowCapacity {
        WindowCapacity::from_size(self.window_size)
    }
}

impl ServerConfig {
    pub fn bind_host(&self) -> &str {
        if self.share {
            "0.0.0.0"
        } else {
            &self.host
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::builder()?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would only fail later, on every request
    pub fn validate(&self) -> Result<()> {
        validate_temperature(self.llm.default_temperature)
            .context("Invalid llm.default_temperature")?;
        Ok(())
    }

    /// Built-in defaults, mirroring `config/settings.toml`
    pub(crate) fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 7860)?
            .set_default("server.share", false)?
            .set_default("server.open_browser", false)?
            .set_default("llm.base_url", "https://api.groq.com/openai/v1")?
            .set_default("llm.model", "llama3-8b-8192")?
            .set_default("llm.default_temperature", 1.0)?
            .set_default("llm.timeout_seconds", 60)?
            .set_default("llm.api_key_env", "GROQ_API_KEY")?
            .set_default("memory.window_size", 5)?
            .set_default("memory.session_ttl_secs", 6 * 60 * 60)?
            .set_default("memory.cleanup_interval_secs", 300)?
            .set_default("memory.max_sessions", 10_000)?
            .set_default("memory.prompt_style", "chat")?
            .set_default("ui.variant", "chat")?
            .set_default("ui.title", "Groq Chat App")?
            .set_default("ui.description", "Ask a question and get a response.")?;
        Ok(builder)
    }

    /// Read the API key named by `llm.api_key_env`. Missing or blank is fatal.
    pub fn api_key(&self) -> Result<String> {
        let key = std::env::var(&self.llm.api_key_env)
            .with_context(|| format!("{} is not set", self.llm.api_key_env))?;
        if key.trim().is_empty() {
            anyhow::bail!("{} is empty", self.llm.api_key_env);
        }
        Ok(key)
    }
}
