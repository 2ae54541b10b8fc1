use std::sync::Arc;
use tracing::{debug, warn};

use crate::utils::error::ApiError;
use super::context_builder::ContextBuilder;
use super::manager::LlmProvider;
use super::types::{GenerationRequest, Turn, WindowCapacity};
use super::window::MemoryWindow;

/// Prefix of the reply returned in place of a failed generation
pub const FAILURE_REPLY_PREFIX: &str = "Terjadi error";

pub fn failure_reply(err: &ApiError) -> String {
    format!("{}: {}", FAILURE_REPLY_PREFIX, err)
}

/// Values every fresh session starts from
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub model: String,
    pub temperature: f32,
    pub capacity: WindowCapacity,
    pub context_builder: ContextBuilder,
}

/// A memory window paired with the generation settings used for it
#[derive(Debug)]
pub struct Session {
    window: MemoryWindow,
    model: String,
    temperature: f32,
    defaults: Arc<SessionDefaults>,
}

impl Session {
    pub fn new(defaults: Arc<SessionDefaults>) -> Self {
        Self {
            window: MemoryWindow::new(defaults.capacity),
            model: defaults.model.clone(),
            temperature: defaults.temperature,
            defaults,
        }
    }

    /// Send `user_message` and remember the exchange on success.
    ///
    /// A failed call is reported as a diagnostic reply and leaves the window
    /// untouched.
    pub async fn ask(
        &mut self,
        provider: &dyn LlmProvider,
        user_message: &str,
        temperature: f32,
    ) -> String {
        match self.exchange(provider, user_message, temperature).await {
            Ok(reply) => reply,
            Err(e) => failure_reply(&e),
        }
    }

    /// Same as [`Session::ask`] but hands the generation error back
    pub async fn exchange(
        &mut self,
        provider: &dyn LlmProvider,
        user_message: &str,
        temperature: f32,
    ) -> Result<String, ApiError> {
        self.temperature = temperature;

        let request = GenerationRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            messages: self
                .defaults
                .context_builder
                .build(self.window.render_context(), user_message),
        };

        match provider.generate(&request).await {
            Ok(reply) => {
                self.window.append(Turn::new(user_message, reply.clone()));
                debug!(
                    "Exchange stored: window={}/{:?}, reply_len={}",
                    self.window.len(),
                    self.window.capacity(),
                    reply.len()
                );
                Ok(reply)
            }
            Err(e) => {
                warn!("Generation failed, exchange not remembered: {}", e);
                Err(e)
            }
        }
    }

    /// Drop this session wholesale and start over from the defaults
    pub fn reset(&mut self) -> Vec<Turn> {
        *self = Session::new(self.defaults.clone());
        Vec::new()
    }

    pub fn window(&self) -> &MemoryWindow {
        &self.window
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}
