use serde::{Deserialize, Serialize};

use crate::models::chat::ChatMessage;
use crate::utils::error::ApiError;

/// Inclusive temperature range accepted by the chat endpoint
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// One user message and the reply it produced. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user_message: String,
    pub model_reply: String,
}

impl Turn {
    pub fn new(user_message: impl Into<String>, model_reply: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            model_reply: model_reply.into(),
        }
    }
}

/// How many turns a memory window retains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowCapacity {
    Unbounded,
    Bounded(usize),
}

impl WindowCapacity {
    /// `0` maps to unbounded, anything else to a fixed window
    pub fn from_size(size: usize) -> Self {
        if size == 0 {
            Self::Unbounded
        } else {
            Self::Bounded(size)
        }
    }

    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(n) => Some(*n),
        }
    }
}

/// How prior turns are laid out in the generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// System preamble followed by alternating user/assistant messages
    Chat,
    /// Single user message holding a `Human:` / `AI:` transcript
    Transcript,
}

/// Everything the generation client needs for one call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

pub fn validate_temperature(temperature: f32) -> Result<f32, ApiError> {
    if temperature.is_finite() && TEMPERATURE_RANGE.contains(&temperature) {
        Ok(temperature)
    } else {
        Err(ApiError::BadRequest(format!(
            "temperature must be between {} and {}, got {}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end(),
            temperature
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_from_size() {
        assert_eq!(WindowCapacity::from_size(0), WindowCapacity::Unbounded);
        assert_eq!(WindowCapacity::from_size(5), WindowCapacity::Bounded(5));
        assert_eq!(WindowCapacity::Bounded(5).limit(), Some(5));
        assert_eq!(WindowCapacity::Unbounded.limit(), None);
    }

    #[test]
    fn test_temperature_bounds() {
        assert!(validate_temperature(0.0).is_ok());
        assert!(validate_temperature(2.0).is_ok());
        assert!(validate_temperature(0.7).is_ok());
        assert!(validate_temperature(-0.1).is_err());
        assert!(validate_temperature(2.01).is_err());
        assert!(validate_temperature(f32::NAN).is_err());
    }
}
