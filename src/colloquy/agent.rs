//! Agent System
//!
//! This module provides the [`Agent`] struct: an LLM-backed participant with an
//! identity, a prompt template, a memory buffer and an append-only history of
//! the turns it has taken.
//!
//! Agents can be used standalone through [`Agent::respond`] or registered with
//! an [`Orchestrator`](crate::Orchestrator), which drives several agents per
//! incoming message and keeps a global log.
//!
//! # Turn lifecycle
//!
//! ```text
//! respond(speaker, message)
//!   ├─ history intact?            no → StateCorruption
//!   ├─ memory buffer attached?    no → Dependency
//!   ├─ render prompt template     missing parameter → Configuration
//!   ├─ [system prompt, memory window..., message] → ClientWrapper
//!   │                              failure → Transport / RateLimit / Timeout
//!   └─ one synchronous commit:
//!        memory += [User(message), Assistant(response)]
//!        history.push((speaker, message, response))
//! ```
//!
//! Nothing is recorded unless the completion succeeds, and the commit has no
//! await point, so a dropped `respond` future records all of the turn or none
//! of it.
//!
//! # Example
//!
//! ```rust,no_run
//! use colloquy::Agent;
//! use colloquy::clients::openai::OpenAIClient;
//! use colloquy::prompt_template::PromptTemplate;
//! use std::sync::Arc;
//!
//! # async {
//! let agent = Agent::new(
//!     "editor",
//!     "Mr. Editor",
//!     Arc::new(OpenAIClient::new_with_model_string("key", "gpt-4o")),
//! )
//! .with_prompt_template(
//!     PromptTemplate::new("You are {{ agent }}, a blunt editor. {{ speaker }} sent a draft.").unwrap(),
//! );
//!
//! let reply = agent.respond("Miss Writer", "Here is chapter one.").await.unwrap();
//! println!("{}", reply);
//! # };
//! ```

use crate::colloquy::client_wrapper::{ClientWrapper, Message, Role};
use crate::colloquy::config::ColloquyConfig;
use crate::colloquy::error::ConversationError;
use crate::colloquy::event::{preview, AgentEvent, EventHandler};
use crate::colloquy::memory::{BufferMemory, MemoryBuffer};
use crate::colloquy::prompt_template::PromptTemplate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One `(speaker, input, output)` exchange recorded by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who sent the message the agent answered.
    pub speaker: String,
    /// The message the agent answered.
    pub input: String,
    /// The agent's response.
    pub output: String,
    /// UTC time at which the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A completed turn that has not been recorded yet.
pub(crate) struct PendingTurn {
    pub(crate) turn: Turn,
    memory: Arc<dyn MemoryBuffer>,
}

impl PendingTurn {
    /// Record the exchange in memory and in `history`. Synchronous, so it is
    /// never interrupted by a dropped future.
    pub(crate) fn commit(self, history: &mut Vec<Turn>) -> Turn {
        self.memory
            .add_message(Message::new(Role::User, self.turn.input.clone()));
        self.memory
            .add_message(Message::new(Role::Assistant, self.turn.output.clone()));
        history.push(self.turn.clone());
        self.turn
    }
}

/// An LLM-backed conversation participant.
///
/// `Agent` is `Send + Sync`: its history and memory slot use interior
/// mutability so an orchestrator can hold it behind an `Arc` and drive it from
/// several sessions. The history lock is never held across the completion
/// request.
pub struct Agent {
    /// Stable identifier used by the orchestrator and in the log.
    pub id: String,
    /// Human-readable display name, exposed to the prompt template as `agent`.
    pub name: String,
    /// Arbitrary metadata associated with the agent.
    pub metadata: HashMap<String, String>,

    client: Arc<dyn ClientWrapper>,
    prompt_template: PromptTemplate,
    memory: Mutex<Option<Arc<dyn MemoryBuffer>>>,
    memory_window: usize,
    completion_timeout: Option<Duration>,
    history: Mutex<Vec<Turn>>,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Agent {
    /// Create a new agent with the mandatory identity information.
    ///
    /// Defaults: [`PromptTemplate::default`], an unbounded [`BufferMemory`],
    /// the memory window of [`ColloquyConfig::default`] and no timeout.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        let defaults = ColloquyConfig::default();
        Self {
            id: id.into(),
            name: name.into(),
            metadata: HashMap::new(),
            client,
            prompt_template: PromptTemplate::default(),
            memory: Mutex::new(Some(Arc::new(BufferMemory::new()))),
            memory_window: defaults.memory_window,
            completion_timeout: defaults.completion_timeout,
            history: Mutex::new(Vec::new()),
            event_handler: None,
        }
    }

    /// Use `template` as the system prompt (builder pattern).
    ///
    /// The template may reference `agent` (display name), `speaker` (also
    /// available as `user`) and `message`.
    pub fn with_prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = template;
        self
    }

    /// Replace the memory buffer (builder pattern).
    pub fn with_memory(self, memory: Arc<dyn MemoryBuffer>) -> Self {
        self.attach_memory(memory);
        self
    }

    /// Number of recent memory messages replayed to the model on each turn.
    pub fn with_memory_window(mut self, size: usize) -> Self {
        self.memory_window = size;
        self
    }

    /// Bound every completion request made by [`respond`](Agent::respond).
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    /// Apply window, timeout and memory capacity from `config`.
    ///
    /// Installs a fresh [`BufferMemory`] sized by `config.memory_capacity`;
    /// call [`with_memory`](Agent::with_memory) afterwards to use another one.
    pub fn with_config(mut self, config: &ColloquyConfig) -> Self {
        self.memory_window = config.memory_window;
        self.completion_timeout = config.completion_timeout;
        let buffer = match config.memory_capacity {
            Some(capacity) => BufferMemory::with_capacity(capacity),
            None => BufferMemory::new(),
        };
        self.with_memory(Arc::new(buffer))
    }

    /// Add arbitrary metadata to the agent definition.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach an [`EventHandler`] (builder pattern).
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Set or replace the event handler on a live agent. Used by
    /// [`Orchestrator::add_agent`](crate::Orchestrator::add_agent).
    pub fn set_event_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.event_handler = Some(handler);
    }

    pub fn prompt_template(&self) -> &PromptTemplate {
        &self.prompt_template
    }

    pub fn memory_window(&self) -> usize {
        self.memory_window
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }

    /// The attached memory buffer, if any.
    pub fn memory(&self) -> Option<Arc<dyn MemoryBuffer>> {
        self.memory_slot().clone()
    }

    /// Remove and return the memory buffer. Until a buffer is attached again
    /// [`respond`](Agent::respond) fails with [`ConversationError::Dependency`].
    pub fn detach_memory(&self) -> Option<Arc<dyn MemoryBuffer>> {
        self.memory_slot().take()
    }

    /// Attach (or replace) the memory buffer.
    pub fn attach_memory(&self, memory: Arc<dyn MemoryBuffer>) {
        *self.memory_slot() = Some(memory);
    }

    fn memory_slot(&self) -> MutexGuard<'_, Option<Arc<dyn MemoryBuffer>>> {
        // The slot only ever holds a complete Option, a poisoned lock is safe to reuse.
        self.memory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of every turn taken so far, oldest first.
    pub fn history(&self) -> Result<Vec<Turn>, ConversationError> {
        self.lock_history().map(|turns| turns.clone())
    }

    pub fn turn_count(&self) -> Result<usize, ConversationError> {
        self.lock_history().map(|turns| turns.len())
    }

    /// Answer `message` sent by `speaker` and record the exchange.
    ///
    /// See the [module documentation](self) for the failure modes.
    pub async fn respond(&self, speaker: &str, message: &str) -> Result<String, ConversationError> {
        self.respond_within(speaker, message, self.completion_timeout)
            .await
    }

    /// Like [`respond`](Agent::respond) with an explicit completion bound.
    /// `None` waits indefinitely.
    pub async fn respond_within(
        &self,
        speaker: &str,
        message: &str,
        timeout: Option<Duration>,
    ) -> Result<String, ConversationError> {
        let pending = self.generate(speaker, message, timeout).await?;
        let committed = self
            .lock_history()
            .map(|mut history| pending.commit(&mut history));
        match committed {
            Ok(turn) => {
                self.emit_completed(&turn).await;
                Ok(turn.output)
            }
            Err(err) => Err(self.report_failure(speaker, err).await),
        }
    }

    /// Produce a turn without recording it. Emits `RespondStarted`, and
    /// `RespondFailed` on error.
    pub(crate) async fn generate(
        &self,
        speaker: &str,
        message: &str,
        timeout: Option<Duration>,
    ) -> Result<PendingTurn, ConversationError> {
        match self.try_generate(speaker, message, timeout).await {
            Ok(pending) => Ok(pending),
            Err(err) => Err(self.report_failure(speaker, err).await),
        }
    }

    async fn try_generate(
        &self,
        speaker: &str,
        message: &str,
        timeout: Option<Duration>,
    ) -> Result<PendingTurn, ConversationError> {
        if self.history.is_poisoned() {
            return Err(self.corrupted_history());
        }

        let memory = self.memory().ok_or_else(|| {
            ConversationError::Dependency(format!(
                "agent '{}' has no memory buffer attached",
                self.id
            ))
        })?;

        let system_prompt = self.prompt_template.render(&[
            ("agent", self.name.as_str()),
            ("speaker", speaker),
            ("user", speaker),
            ("message", message),
        ])?;

        let recent = memory.recent(self.memory_window);
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Message::new(Role::System, system_prompt));
        messages.extend(recent);
        messages.push(Message::new(Role::User, message));

        self.emit(AgentEvent::RespondStarted {
            agent_id: self.id.clone(),
            speaker: speaker.to_string(),
            message_preview: preview(message, 120),
        })
        .await;

        log::debug!(
            "Agent '{}' sending {} messages ({} memory) to {}",
            self.id,
            messages.len(),
            memory.kind(),
            self.client.model_name()
        );

        let completion = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.send_message(&messages))
                .await
                .map_err(|_| ConversationError::Timeout(limit))??,
            None => self.client.send_message(&messages).await?,
        };

        Ok(PendingTurn {
            turn: Turn {
                speaker: speaker.to_string(),
                input: message.to_string(),
                output: completion.content,
                timestamp: Utc::now(),
            },
            memory,
        })
    }

    /// Lock the turn history for a commit.
    pub(crate) fn lock_history(&self) -> Result<MutexGuard<'_, Vec<Turn>>, ConversationError> {
        self.history.lock().map_err(|_| self.corrupted_history())
    }

    pub(crate) async fn emit_completed(&self, turn: &Turn) {
        self.emit(AgentEvent::RespondCompleted {
            agent_id: self.id.clone(),
            speaker: turn.speaker.clone(),
            tokens_used: self.client.get_last_usage(),
            response_length: turn.output.len(),
        })
        .await;
    }

    /// Log and announce a failed turn, handing the error back.
    pub(crate) async fn report_failure(
        &self,
        speaker: &str,
        err: ConversationError,
    ) -> ConversationError {
        log::warn!("Agent '{}' failed to respond to {}: {}", self.id, speaker, err);
        self.emit(AgentEvent::RespondFailed {
            agent_id: self.id.clone(),
            speaker: speaker.to_string(),
            error: err.to_string(),
        })
        .await;
        err
    }

    fn corrupted_history(&self) -> ConversationError {
        ConversationError::StateCorruption(format!(
            "turn history of agent '{}' is corrupted",
            self.id
        ))
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_agent_event(&event).await;
        }
    }

    #[cfg(test)]
    pub(crate) fn poison_history(&self) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = self.history.lock().unwrap();
                    panic!("history replaced mid-update");
                })
                .join();
        });
    }
}
