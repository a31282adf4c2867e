//! A ClientWrapper is a wrapper around a specific cloud LLM completion service.
//! It provides a common interface to interact with the model.
//! It does not keep track of the conversation; agents own their history and
//! memory and use a ClientWrapper only to obtain completions.

use crate::colloquy::error::ClientError;
use async_trait::async_trait;
use std::sync::Mutex;

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// Set by the developer to steer the model's responses.
    System,
    /// A message sent by a human user (or another agent).
    User,
    /// Content the model generated in response to a user message.
    Assistant,
}

impl Role {
    /// Wire name used by OpenAI compatible chat APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Represents a generic message to be sent to an LLM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Trait defining the interface to interact with various LLM services.
///
/// An empty `content` in the returned message is a legitimate (absent)
/// completion and must not be turned into an error by implementations.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send the messages to the LLM and get the assistant's reply.
    async fn send_message(&self, messages: &[Message]) -> Result<Message, ClientError>;

    /// Model identifier used for requests, for logging.
    fn model_name(&self) -> &str;

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl reads the slot exposed by [`usage_slot`](ClientWrapper::usage_slot).
    fn get_last_usage(&self) -> Option<TokenUsage> {
        self.usage_slot()
            .and_then(|slot| slot.lock().ok().and_then(|u| u.clone()))
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // ClientWrapper implementations supporting TokenUsage tracking should return a Mutex<Option<TokenUsage>> by overriding this method.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
