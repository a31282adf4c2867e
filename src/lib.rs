//! # Colloquy
//!
//! Colloquy routes conversations between people and LLM-backed agents. Each
//! incoming message is delivered under a *session key* to every participating
//! agent; every answer is recorded in the agent's own history, in the session,
//! and in one global append-only log.
//!
//! The crate provides:
//!
//! * **Agents**: [`Agent`] pairs an identity with a [`ClientWrapper`], a
//!   [`prompt_template::PromptTemplate`] and a [`memory::MemoryBuffer`].
//! * **Orchestration**: [`Orchestrator`] keeps the agent registry, the session
//!   table and the [`conversation_log::ConversationLog`], and serialises calls
//!   on the same session while letting distinct sessions run concurrently.
//! * **Provider access**: [`clients::openai::OpenAIClient`] implements
//!   [`ClientWrapper`] over the OpenAI chat completions API; API keys come from
//!   a [`secrets::SecretProvider`] (environment first, then a `.env` file).
//! * **Observability**: [`event::EventHandler`] callbacks and `log` records.
//!
//! ## Routing a message
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use colloquy::{Agent, ColloquyConfig, Orchestrator};
//! use colloquy::clients::openai::{Model, OpenAIClient};
//! use colloquy::secrets::SecretProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     colloquy::init_logger();
//!
//!     let config = ColloquyConfig::default();
//!     let secrets = SecretProvider::from_env_file(&config.env_file);
//!     let client = || OpenAIClient::from_secrets(&secrets, Model::GPT41Mini).map(Arc::new);
//!
//!     let mut orchestrator = Orchestrator::new().with_config(config.clone());
//!     orchestrator.add_agent(Agent::new("writer", "Miss Writer", client()?).with_config(&config))?;
//!     orchestrator.add_agent(Agent::new("editor", "Mr. Editor", client()?).with_config(&config))?;
//!
//!     for (agent_id, reply) in orchestrator.route("book-1", "alice", "Let's begin.").await? {
//!         println!("[{}] {}", agent_id, reply);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a provider
//!
//! Everything above the client is provider-agnostic. Implement
//! [`ClientWrapper`] for a mock to drive agents deterministically:
//!
//! ```rust
//! use async_trait::async_trait;
//! use colloquy::{Agent, ClientError, ClientWrapper, Message, Orchestrator, Role};
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ClientWrapper for Echo {
//!     async fn send_message(&self, messages: &[Message]) -> Result<Message, ClientError> {
//!         let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
//!         Ok(Message::new(Role::Assistant, format!("echo: {}", last)))
//!     }
//!     fn model_name(&self) -> &str {
//!         "echo"
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.add_agent(Agent::new("echo", "Echo", Arc::new(Echo))).unwrap();
//! let replies = orchestrator.route("s1", "bob", "hi").await.unwrap();
//! assert_eq!(replies, vec![("echo".to_string(), "echo: hi".to_string())]);
//! # });
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global `env_logger` once; later calls are no-ops.
///
/// Verbosity follows `RUST_LOG`. Applications that install their own logger
/// should not call this.
///
/// ```rust
/// colloquy::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

pub mod colloquy;

pub use colloquy::agent::{Agent, Turn};
pub use colloquy::client_wrapper;
pub use colloquy::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
pub use colloquy::clients;
pub use colloquy::config::ColloquyConfig;
pub use colloquy::conversation_log;
pub use colloquy::conversation_log::LogEntry;
pub use colloquy::error;
pub use colloquy::error::{ClientError, ConversationError, SecretError};
pub use colloquy::event;
pub use colloquy::event::{AgentEvent, EventHandler, OrchestratorEvent};
pub use colloquy::memory;
pub use colloquy::orchestrator::{Orchestrator, Session, SessionStatus, SessionTurn};
pub use colloquy::prompt_template;
pub use colloquy::secrets;
