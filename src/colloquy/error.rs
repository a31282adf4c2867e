//! Error types shared by agents, the orchestrator, completion clients and the
//! secret provider.
//!
//! Every failure a caller can observe maps to exactly one variant so that
//! callers can match on the kind of failure instead of inspecting strings.
//!
//! # Examples
//!
//! ```
//! use colloquy::error::{ClientError, ConversationError};
//!
//! let err: ConversationError = ClientError::RateLimit("429 Too Many Requests".into()).into();
//! assert!(matches!(err, ConversationError::RateLimit(_)));
//! assert_eq!(err.to_string(), "Rate limited: 429 Too Many Requests");
//! ```

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors surfaced by [`Agent::respond`](crate::Agent::respond) and
/// [`Orchestrator::route`](crate::Orchestrator::route).
///
/// None of these are retried internally; callers decide whether a retry makes
/// sense (typically only for [`Transport`](ConversationError::Transport),
/// [`RateLimit`](ConversationError::RateLimit) and
/// [`Timeout`](ConversationError::Timeout)).
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationError {
    /// A prompt template could not be parsed or rendered, usually because a
    /// parameter it references was not supplied.
    Configuration(String),

    /// A collaborator required at call time is missing: a detached memory
    /// buffer or an agent id that is not registered.
    Dependency(String),

    /// Shared state (session table, a session, the log or an agent history)
    /// was left invalid by a panic while it was being mutated.
    StateCorruption(String),

    /// [`Orchestrator::route`](crate::Orchestrator::route) was called with no
    /// registered agents.
    NoAgents,

    /// An agent with the same id is already registered.
    DuplicateAgent(String),

    /// The completion client failed to reach the model provider or received
    /// an unusable answer.
    Transport(String),

    /// The model provider rejected the request because of rate limiting.
    RateLimit(String),

    /// The completion did not resolve within the caller-supplied bound.
    Timeout(Duration),
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ConversationError::Dependency(msg) => write!(f, "Missing dependency: {}", msg),
            ConversationError::StateCorruption(msg) => write!(f, "State corrupted: {}", msg),
            ConversationError::NoAgents => write!(f, "No agents registered with the orchestrator"),
            ConversationError::DuplicateAgent(id) => {
                write!(f, "Agent with id '{}' already exists", id)
            }
            ConversationError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ConversationError::RateLimit(msg) => write!(f, "Rate limited: {}", msg),
            ConversationError::Timeout(after) => {
                write!(f, "Completion timed out after {} ms", after.as_millis())
            }
        }
    }
}

impl Error for ConversationError {}

/// Errors produced by a [`ClientWrapper`](crate::ClientWrapper) implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Network, protocol or decoding failure.
    Transport(String),
    /// The provider answered with a rate-limit rejection (HTTP 429).
    RateLimit(String),
}

impl ClientError {
    /// Classify a provider error message.
    ///
    /// Anything mentioning HTTP 429 or a rate limit becomes
    /// [`ClientError::RateLimit`]; everything else is a transport failure.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("429") || lowered.contains("rate limit") {
            ClientError::RateLimit(message)
        } else {
            ClientError::Transport(message)
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ClientError::RateLimit(msg) => write!(f, "Rate limited: {}", msg),
        }
    }
}

impl Error for ClientError {}

impl From<ClientError> for ConversationError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(msg) => ConversationError::Transport(msg),
            ClientError::RateLimit(msg) => ConversationError::RateLimit(msg),
        }
    }
}

/// Errors produced by the [`SecretProvider`](crate::secrets::SecretProvider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// The key is neither in the environment nor in the backing file.
    NotFound(String),
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretError::NotFound(key) => write!(f, "Configuration key not found: {}", key),
        }
    }
}

impl Error for SecretError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_classification() {
        assert!(matches!(
            ClientError::from_provider_message("HTTP 429 Too Many Requests"),
            ClientError::RateLimit(_)
        ));
        assert!(matches!(
            ClientError::from_provider_message("Rate limit exceeded for gpt-4.1"),
            ClientError::RateLimit(_)
        ));
        assert!(matches!(
            ClientError::from_provider_message("connection reset by peer"),
            ClientError::Transport(_)
        ));
    }

    #[test]
    fn test_timeout_display() {
        let err = ConversationError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Completion timed out after 250 ms");
    }
}
