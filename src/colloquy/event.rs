//! Agent and orchestrator event system.
//!
//! Provides a callback-based observability layer. Implement [`EventHandler`] to
//! receive notifications about agent completions and routing progress.
//!
//! Both trait methods have default no-op implementations, so you only override
//! what you care about. The handler is wrapped in `Arc<dyn EventHandler>`;
//! registering it on an [`Orchestrator`](crate::Orchestrator) via
//! [`with_event_handler`](crate::Orchestrator::with_event_handler) also
//! propagates it to every agent added afterwards.
//!
//! # Example
//!
//! ```rust,no_run
//! use colloquy::event::{AgentEvent, EventHandler, OrchestratorEvent};
//! use async_trait::async_trait;
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl EventHandler for Printer {
//!     async fn on_agent_event(&self, event: &AgentEvent) {
//!         if let AgentEvent::RespondCompleted { agent_id, response_length, .. } = event {
//!             println!("{} answered ({} chars)", agent_id, response_length);
//!         }
//!     }
//!     async fn on_orchestrator_event(&self, event: &OrchestratorEvent) {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

use crate::colloquy::client_wrapper::TokenUsage;
use async_trait::async_trait;

/// Events emitted by an [`Agent`](crate::Agent) while answering a message.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Fired once the prompt is built, right before the completion request.
    RespondStarted {
        agent_id: String,
        speaker: String,
        /// First ~120 characters of the incoming message.
        message_preview: String,
    },

    /// Fired after the turn has been recorded in the agent's history.
    RespondCompleted {
        agent_id: String,
        speaker: String,
        /// Usage reported by the client for this request, if any.
        tokens_used: Option<TokenUsage>,
        response_length: usize,
    },

    /// Fired when `respond` fails; nothing was recorded.
    RespondFailed {
        agent_id: String,
        speaker: String,
        error: String,
    },
}

/// Events emitted by the [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// A session key was seen for the first time.
    SessionOpened {
        session_key: String,
        participants: Vec<String>,
    },

    /// A `route` call passed validation and is about to drive its agents.
    RouteStarted {
        session_key: String,
        speaker: String,
        agent_count: usize,
    },

    /// One participant answered and its turn was logged.
    AgentResponded {
        session_key: String,
        agent_id: String,
        response_length: usize,
    },

    /// One participant failed; the remaining participants are skipped.
    AgentFailed {
        session_key: String,
        agent_id: String,
        error: String,
    },

    /// Every participant answered.
    RouteCompleted {
        session_key: String,
        responses: usize,
        log_len: usize,
    },
}

/// Receiver of [`AgentEvent`]s and [`OrchestratorEvent`]s.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_agent_event(&self, _event: &AgentEvent) {}

    async fn on_orchestrator_event(&self, _event: &OrchestratorEvent) {}
}

/// First `max_chars` characters of `text`, with an ellipsis when truncated.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("héllo wörld", 5), "héllo...");
    }
}
