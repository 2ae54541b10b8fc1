use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::models::chat::SessionId;
use crate::utils::error::ApiError;

use super::context_builder::ContextBuilder;
use super::session::{failure_reply, Session, SessionDefaults};
use super::store::{SessionStore, StoreStats};
use super::types::{validate_temperature, GenerationRequest, Turn};

/// Trait for the text generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ApiError>;
}

/// Result of one `ask`
#[derive(Debug, Clone)]
pub struct AskOutcome {
    pub session_id: SessionId,
    pub reply: String,
    pub failed: bool,
    pub temperature: f32,
    pub turns: Vec<Turn>,
}

/// Result of a reset: the id to keep using and the (empty) history
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub session_id: SessionId,
    pub history: Vec<Turn>,
}

pub struct ConversationManager {
    store: SessionStore,
    llm_provider: Arc<dyn LlmProvider>,
}

impl ConversationManager {
    pub fn new(store: SessionStore, llm_provider: Arc<dyn LlmProvider>) -> Self {
        Self { store, llm_provider }
    }

    pub fn from_settings(settings: &Settings, llm_provider: Arc<dyn LlmProvider>) -> Self {
        let preamble = settings
            .memory
            .preamble
            .clone()
            .unwrap_or_else(ContextBuilder::default_base_instruction);

        let defaults = Arc::new(SessionDefaults {
            model: settings.llm.model.clone(),
            temperature: settings.llm.default_temperature,
            capacity: settings.memory.capacity(),
            context_builder: ContextBuilder::new(preamble, settings.memory.prompt_style),
        });

        let store = SessionStore::new(
            defaults,
            Duration::from_secs(settings.memory.session_ttl_secs),
            settings.memory.max_sessions,
        );

        Self::new(store, llm_provider)
    }

    /// Submit a user message on a session, creating the session if needed.
    ///
    /// Generation failures come back as a diagnostic reply with `failed` set,
    /// never as an error. Errors are reserved for invalid input and a full
    /// store.
    pub async fn ask(
        &self,
        session_id: Option<SessionId>,
        message: String,
        temperature: Option<f32>,
    ) -> Result<AskOutcome, ApiError> {
        if message.is_empty() {
            return Err(ApiError::BadRequest("message must not be empty".to_string()));
        }
        let temperature = temperature.map(validate_temperature).transpose()?;

        let (session_id, handle) = self.store.get_or_create(session_id)?;
        let mut session = handle.lock().await;
        let temperature = temperature.unwrap_or_else(|| session.temperature());

        info!(
            "Chat request: session={}, message_len={}, temperature={}",
            session_id,
            message.len(),
            temperature
        );

        let start_time = Instant::now();
        let (reply, failed) = match session
            .exchange(self.llm_provider.as_ref(), &message, temperature)
            .await
        {
            Ok(reply) => (reply, false),
            Err(e) => {
                warn!("Session {}: generation failed: {}", session_id, e);
                (failure_reply(&e), true)
            }
        };

        debug!(
            "Session {} answered in {}ms (failed={}, turns={})",
            session_id,
            start_time.elapsed().as_millis(),
            failed,
            session.window().len()
        );

        Ok(AskOutcome {
            session_id,
            reply,
            failed,
            temperature: session.temperature(),
            turns: session.window().to_vec(),
        })
    }

    /// Throw the session away and start an empty one under the same id
    pub fn reset(&self, session_id: Option<SessionId>) -> Result<ResetOutcome, ApiError> {
        let session_id = session_id.unwrap_or_else(SessionStore::generate_session_id);
        let fresh = Session::new(self.store.defaults().clone());
        self.store.replace(session_id.clone(), fresh)?;

        info!("Session {} reset", session_id);

        Ok(ResetOutcome {
            session_id,
            history: Vec::new(),
        })
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, ApiError> {
        let handle = self
            .store
            .get(session_id)
            .ok_or_else(|| ApiError::NotFound(format!("session {}", session_id)))?;
        let session = handle.lock().await;
        Ok(session.window().to_vec())
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn cleanup_expired_sessions(&self) -> usize {
        self.store.cleanup_expired()
    }

    /// Periodically evict idle sessions until the process exits
    pub fn spawn_cleanup_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let removed = self.cleanup_expired_sessions();
                debug!("Session cleanup: removed={}, active={}", removed, self.store.len());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::session::FAILURE_REPLY_PREFIX;
    use crate::services::conversation::types::{PromptStyle, WindowCapacity};

    fn manager(provider: MockLlmProvider) -> ConversationManager {
        let defaults = Arc::new(SessionDefaults {
            model: "llama3-8b-8192".to_string(),
            temperature: 1.0,
            capacity: WindowCapacity::Bounded(5),
            context_builder: ContextBuilder::new(String::new(), PromptStyle::Chat),
        });
        let store = SessionStore::new(defaults, Duration::from_secs(3600), 100);
        ConversationManager::new(store, Arc::new(provider))
    }

    fn echo_provider() -> MockLlmProvider {
        let mut provider = MockLlmProvider::new();
        provider.expect_generate().returning(|req| {
            let last = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        });
        provider
    }

    #[tokio::test]
    async fn test_ask_creates_session_and_remembers() {
        let manager = manager(echo_provider());

        let first = manager.ask(None, "Q".to_string(), Some(1.0)).await.unwrap();
        assert!(!first.failed);
        assert_eq!(first.reply, "echo: Q");
        assert_eq!(first.turns, vec![Turn::new("Q", "echo: Q")]);

        let second = manager
            .ask(Some(first.session_id.clone()), "again".to_string(), None)
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.turns.len(), 2);
        assert_eq!(manager.stats().active_sessions, 1);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let mut provider = MockLlmProvider::new();
        provider
            .expect_generate()
            .returning(|_| Err(ApiError::LlmError("Groq API error (401): bad key".to_string())));
        let manager = manager(provider);

        let outcome = manager.ask(None, "Q".to_string(), Some(0.5)).await.unwrap();

        assert!(outcome.failed);
        assert!(outcome.reply.starts_with(FAILURE_REPLY_PREFIX));
        assert!(outcome.reply.contains("bad key"));
        assert!(outcome.turns.is_empty());
        assert_eq!(outcome.temperature, 0.5);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let manager = manager(MockLlmProvider::new());

        let err = manager.ask(None, String::new(), None).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = manager.ask(None, "hi".to_string(), Some(3.0)).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(manager.stats().active_sessions, 0);
    }

    #[tokio::test]
    async fn test_whitespace_message_is_still_text() {
        let manager = manager(echo_provider());
        let outcome = manager.ask(None, "  ".to_string(), None).await.unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.turns, vec![Turn::new("  ", "echo:   ")]);
    }

    #[tokio::test]
    async fn test_from_settings_uses_transcript_style_and_preamble() {
        let settings: Settings = Settings::builder()
            .unwrap()
            .set_override("llm.default_temperature", 0.3)
            .unwrap()
            .set_override("memory.window_size", 2)
            .unwrap()
            .set_override("memory.prompt_style", "transcript")
            .unwrap()
            .set_override("memory.preamble", "You are terse.")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let mut provider = MockLlmProvider::new();
        provider
            .expect_generate()
            .withf(|req| req.messages.len() == 1 && req.messages[0].content.ends_with("Human: first\nAI:"))
            .times(1)
            .returning(|_| Ok("one".to_string()));
        provider
            .expect_generate()
            .withf(|req| {
                let prompt = &req.messages[0].content;
                req.messages.len() == 1
                    && req.messages[0].role == "user"
                    && req.model == "llama3-8b-8192"
                    && req.temperature == 0.3
                    && prompt.starts_with("You are terse.\n\nCurrent conversation:\n")
                    && prompt.ends_with("Human: first\nAI: one\nHuman: second\nAI:")
            })
            .times(1)
            .returning(|_| Ok("two".to_string()));

        let manager = ConversationManager::from_settings(&settings, Arc::new(provider));
        let first = manager.ask(None, "first".to_string(), None).await.unwrap();
        let second = manager
            .ask(Some(first.session_id), "second".to_string(), None)
            .await
            .unwrap();

        assert_eq!(second.reply, "two");
        assert_eq!(second.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_window_and_reset_scenario() {
        let manager = manager(echo_provider());
        let id = "scenario".to_string();

        for i in 1..=6 {
            manager.ask(Some(id.clone()), format!("T{}", i), None).await.unwrap();
        }
        let turns = manager.history(&id).await.unwrap();
        let asked: Vec<&str> = turns.iter().map(|t| t.user_message.as_str()).collect();
        assert_eq!(asked, vec!["T2", "T3", "T4", "T5", "T6"]);

        let reset = manager.reset(Some(id.clone())).unwrap();
        assert_eq!(reset.session_id, id);
        assert!(reset.history.is_empty());
        assert!(manager.history(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_restores_default_temperature() {
        let manager = manager(echo_provider());
        let outcome = manager.ask(None, "Q".to_string(), Some(0.1)).await.unwrap();
        manager.reset(Some(outcome.session_id.clone())).unwrap();

        let after = manager
            .ask(Some(outcome.session_id), "Q2".to_string(), None)
            .await
            .unwrap();
        assert_eq!(after.temperature, 1.0);
        assert_eq!(after.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_history_unknown_session() {
        let manager = manager(MockLlmProvider::new());
        let err = manager.history("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_asks_on_one_session_are_serialised() {
        let manager = Arc::new(manager(echo_provider()));
        let id = "shared".to_string();
        manager.reset(Some(id.clone())).unwrap();

        let mut tasks = Vec::new();
        for i in 0..4 {
            let manager = manager.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                manager.ask(Some(id), format!("m{}", i), None).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(manager.history(&id).await.unwrap().len(), 4);
    }
}
