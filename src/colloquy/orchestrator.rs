//! Multi-Agent Conversation Orchestrator
//!
//! The [`Orchestrator`] routes incoming messages to registered [`Agent`]s under
//! caller-supplied *session keys* and keeps a global, append-only
//! [`ConversationLog`] of every exchange.
//!
//! # Routing
//!
//! ```text
//! route("s1", "alice", "hi")
//!   ├─ no agents registered          → NoAgents (nothing recorded)
//!   ├─ session table / log corrupted → StateCorruption
//!   ├─ create or resume session "s1" (participants = agents in registration order)
//!   ├─ agent A.respond("alice", "hi") → turn + log entry
//!   ├─ agent B.respond("alice", "hi") → turn + log entry
//!   └─ [(A, respA), (B, respB)]
//! ```
//!
//! Each participant answers the *same* incoming message; one agent's reply is
//! never fed to the next within a call. Agents are driven one after the other
//! so the log order always matches registration order. The first failing agent
//! aborts the call (fail-fast); turns already recorded by earlier agents stay.
//!
//! # Concurrency
//!
//! All methods take `&self`, share the orchestrator through an `Arc` to route
//! from several tasks. Calls on the same session are serialised in arrival
//! order; calls on different sessions proceed concurrently because no shared
//! lock is held while a completion request is in flight.
//!
//! Each answer is committed to the agent history, agent memory, session and
//! log in one synchronous step, before any event is emitted. Dropping a `route`
//! future therefore never leaves an answer recorded in one place and missing
//! from another.
//!
//! # Example
//!
//! ```rust,no_run
//! use colloquy::{Agent, Orchestrator};
//! use colloquy::clients::openai::OpenAIClient;
//! use std::sync::Arc;
//!
//! # async {
//! let client = || Arc::new(OpenAIClient::new_with_model_string("key", "gpt-4o"));
//!
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.add_agent(Agent::new("writer", "Miss Writer", client())).unwrap();
//! orchestrator.add_agent(Agent::new("editor", "Mr. Editor", client())).unwrap();
//!
//! let replies = orchestrator.route("draft-1", "alice", "Chapter one is done.").await.unwrap();
//! for (agent_id, reply) in &replies {
//!     println!("[{}] {}", agent_id, reply);
//! }
//! assert_eq!(orchestrator.get_log().unwrap().len(), 2);
//! # };
//! ```

use crate::colloquy::agent::{Agent, PendingTurn, Turn};
use crate::colloquy::config::ColloquyConfig;
use crate::colloquy::conversation_log::{write_jsonl, ConversationLog, LogEntry};
use crate::colloquy::error::ConversationError;
use crate::colloquy::event::{EventHandler, OrchestratorEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Lifecycle state of a [`Session`]. Sessions are created open and stay open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Open,
}

/// A turn recorded in a session, attributed to the agent that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub agent_id: String,
    #[serde(flatten)]
    pub turn: Turn,
}

/// A routing context identified by a caller-supplied key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub status: SessionStatus,
    /// Agent ids driven by `route`, in order.
    pub participants: Vec<String>,
    /// Every turn recorded under this key, in call order then participant order.
    pub turns: Vec<SessionTurn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(key: &str, participants: Vec<String>) -> Self {
        Self {
            key: key.to_string(),
            status: SessionStatus::Open,
            participants,
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Live entry of the session table.
///
/// `gate` serialises `route` calls on this session across completion awaits;
/// `state` is only locked for short synchronous reads and appends.
struct SessionSlot {
    gate: tokio::sync::Mutex<()>,
    state: Mutex<Session>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            gate: tokio::sync::Mutex::new(()),
            state: Mutex::new(session),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, Session>, ConversationError> {
        self.state.lock().map_err(|poisoned| {
            ConversationError::StateCorruption(format!(
                "turn list of session '{}' is corrupted",
                poisoned.get_ref().key
            ))
        })
    }
}

/// Routes messages to agents under named sessions and logs every exchange.
pub struct Orchestrator {
    /// Registered agents in registration order.
    agents: Vec<Arc<Agent>>,
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
    log: ConversationLog,
    config: ColloquyConfig,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// An orchestrator with no agents and [`ColloquyConfig::default`].
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            sessions: Mutex::new(HashMap::new()),
            log: ConversationLog::new(),
            config: ColloquyConfig::default(),
            event_handler: None,
        }
    }

    /// Use `config` for routing defaults (builder pattern).
    ///
    /// `config.completion_timeout`, when set, bounds every completion made by
    /// [`route`](Orchestrator::route) and takes precedence over the agents'
    /// own timeouts.
    pub fn with_config(mut self, config: ColloquyConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an [`EventHandler`] (builder pattern). Agents added afterwards
    /// report their events to the same handler.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn config(&self) -> &ColloquyConfig {
        &self.config
    }

    /// Register an agent. Registration order is routing order.
    pub fn add_agent(&mut self, mut agent: Agent) -> Result<(), ConversationError> {
        if self.agents.iter().any(|a| a.id == agent.id) {
            return Err(ConversationError::DuplicateAgent(agent.id));
        }
        if let Some(handler) = &self.event_handler {
            agent.set_event_handler(Arc::clone(handler));
        }
        log::debug!("Orchestrator: registered agent '{}'", agent.id);
        self.agents.push(Arc::new(agent));
        Ok(())
    }

    pub fn get_agent(&self, id: &str) -> Option<Arc<Agent>> {
        self.agents.iter().find(|a| a.id == id).cloned()
    }

    /// Agents in registration order.
    pub fn list_agents(&self) -> Vec<Arc<Agent>> {
        self.agents.clone()
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    /// Route `message` from `speaker` to every participant of `session_key`.
    ///
    /// Creates the session on first use with every registered agent as a
    /// participant; later calls with the same key resume it. Returns
    /// `(agent_id, response)` pairs in participant order.
    ///
    /// # Errors
    ///
    /// - [`ConversationError::NoAgents`] when no agent is registered.
    /// - [`ConversationError::StateCorruption`] when the session table, the
    ///   session or the log is corrupted, or an agent's history is.
    /// - Any error of [`Agent::respond`], from the first failing participant.
    pub async fn route(
        &self,
        session_key: &str,
        speaker: &str,
        message: &str,
    ) -> Result<Vec<(String, String)>, ConversationError> {
        self.route_inner(session_key, speaker, message, self.config.completion_timeout)
            .await
    }

    /// Like [`route`](Orchestrator::route) with every completion bounded by
    /// `timeout`. An agent that times out records nothing and aborts the call
    /// with [`ConversationError::Timeout`].
    pub async fn route_with_timeout(
        &self,
        session_key: &str,
        speaker: &str,
        message: &str,
        timeout: Duration,
    ) -> Result<Vec<(String, String)>, ConversationError> {
        self.route_inner(session_key, speaker, message, Some(timeout))
            .await
    }

    async fn route_inner(
        &self,
        session_key: &str,
        speaker: &str,
        message: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<(String, String)>, ConversationError> {
        if self.agents.is_empty() {
            return Err(ConversationError::NoAgents);
        }
        if self.log.is_corrupted() {
            return Err(ConversationError::StateCorruption(
                "conversation log is corrupted".to_string(),
            ));
        }

        let slot = self.session_slot(session_key, self.agent_ids()).await?;
        let _gate = slot.gate.lock().await;

        let participants = slot.lock_state()?.participants.clone();
        let agents = participants
            .iter()
            .map(|id| {
                self.get_agent(id).ok_or_else(|| {
                    ConversationError::Dependency(format!(
                        "session '{}' references unknown agent '{}'",
                        session_key, id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.emit(OrchestratorEvent::RouteStarted {
            session_key: session_key.to_string(),
            speaker: speaker.to_string(),
            agent_count: agents.len(),
        })
        .await;

        let mut responses = Vec::with_capacity(agents.len());
        for agent in agents {
            let bound = timeout.or(agent.completion_timeout());
            let committed = match agent.generate(speaker, message, bound).await {
                Ok(pending) => match self.commit_turn(&slot, &agent, session_key, pending) {
                    Ok(turn) => Ok(turn),
                    Err(err) => Err(agent.report_failure(speaker, err).await),
                },
                Err(err) => Err(err),
            };
            let turn = match committed {
                Ok(turn) => turn,
                Err(err) => {
                    log::warn!(
                        "Orchestrator: session '{}' aborted at agent '{}': {}",
                        session_key,
                        agent.id,
                        err
                    );
                    self.emit(OrchestratorEvent::AgentFailed {
                        session_key: session_key.to_string(),
                        agent_id: agent.id.clone(),
                        error: err.to_string(),
                    })
                    .await;
                    return Err(err);
                }
            };

            log::debug!(
                "Orchestrator: session '{}' agent '{}' answered {} ({} chars)",
                session_key,
                agent.id,
                speaker,
                turn.output.len()
            );
            agent.emit_completed(&turn).await;
            self.emit(OrchestratorEvent::AgentResponded {
                session_key: session_key.to_string(),
                agent_id: agent.id.clone(),
                response_length: turn.output.len(),
            })
            .await;

            responses.push((agent.id.clone(), turn.output));
        }

        self.emit(OrchestratorEvent::RouteCompleted {
            session_key: session_key.to_string(),
            responses: responses.len(),
            log_len: self.log.len()?,
        })
        .await;

        Ok(responses)
    }

    /// Record a generated turn in the agent history, the agent memory, the
    /// session and the log. Every lock is taken before anything is written and
    /// there is no await point, so either all four see the turn or none does.
    fn commit_turn(
        &self,
        slot: &SessionSlot,
        agent: &Agent,
        session_key: &str,
        pending: PendingTurn,
    ) -> Result<Turn, ConversationError> {
        let mut history = agent.lock_history()?;
        let mut session = slot.lock_state()?;
        let mut log = self.log.lock_entries()?;

        let turn = pending.commit(&mut history);
        log.push(LogEntry {
            session_key: session_key.to_string(),
            agent_id: agent.id.clone(),
            speaker: turn.speaker.clone(),
            message: turn.input.clone(),
            response: turn.output.clone(),
            timestamp: turn.timestamp,
        });
        session.turns.push(SessionTurn {
            agent_id: agent.id.clone(),
            turn: turn.clone(),
        });
        Ok(turn)
    }

    /// Open `session_key` with an explicit ordered subset of agents.
    ///
    /// An existing session is returned unchanged; its participants are not
    /// replaced.
    ///
    /// # Errors
    ///
    /// [`ConversationError::NoAgents`] for an empty participant list,
    /// [`ConversationError::Dependency`] for an unregistered agent id.
    pub async fn open_session(
        &self,
        session_key: &str,
        participants: &[&str],
    ) -> Result<Session, ConversationError> {
        if participants.is_empty() {
            return Err(ConversationError::NoAgents);
        }
        if let Some(missing) = participants.iter().find(|id| self.get_agent(id).is_none()) {
            return Err(ConversationError::Dependency(format!(
                "agent '{}' is not registered",
                missing
            )));
        }
        let participants = participants.iter().map(|id| id.to_string()).collect();
        let slot = self.session_slot(session_key, participants).await?;
        let session = slot.lock_state()?.clone();
        Ok(session)
    }

    /// Find or create the slot for `session_key`.
    async fn session_slot(
        &self,
        session_key: &str,
        participants: Vec<String>,
    ) -> Result<Arc<SessionSlot>, ConversationError> {
        let (slot, created) = {
            let mut sessions = self.lock_sessions()?;
            match sessions.get(session_key) {
                Some(slot) => (Arc::clone(slot), None),
                None => {
                    let slot = Arc::new(SessionSlot::new(Session::new(
                        session_key,
                        participants.clone(),
                    )));
                    sessions.insert(session_key.to_string(), Arc::clone(&slot));
                    (slot, Some(participants))
                }
            }
        };

        if let Some(participants) = created {
            log::info!(
                "Orchestrator: opened session '{}' with {} participant(s)",
                session_key,
                participants.len()
            );
            self.emit(OrchestratorEvent::SessionOpened {
                session_key: session_key.to_string(),
                participants,
            })
            .await;
        }
        Ok(slot)
    }

    fn lock_sessions(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, Arc<SessionSlot>>>, ConversationError> {
        self.sessions.lock().map_err(|_| {
            ConversationError::StateCorruption("session table is corrupted".to_string())
        })
    }

    /// Snapshot of the session stored under `session_key`.
    pub fn session(&self, session_key: &str) -> Result<Option<Session>, ConversationError> {
        let slot = match self.lock_sessions()?.get(session_key) {
            Some(slot) => Arc::clone(slot),
            None => return Ok(None),
        };
        let session = slot.lock_state()?.clone();
        Ok(Some(session))
    }

    pub fn session_count(&self) -> Result<usize, ConversationError> {
        Ok(self.lock_sessions()?.len())
    }

    /// Keys of every live session, sorted.
    pub fn session_keys(&self) -> Result<Vec<String>, ConversationError> {
        let mut keys: Vec<String> = self.lock_sessions()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Copy of the global log, in append order.
    pub fn get_log(&self) -> Result<Vec<LogEntry>, ConversationError> {
        self.log.snapshot()
    }

    pub fn log_len(&self) -> Result<usize, ConversationError> {
        self.log.len()
    }

    /// Write a snapshot of the log to `writer` as JSON lines.
    ///
    /// A failing writer is reported as [`ConversationError::Dependency`].
    pub fn export_log<W: Write>(&self, writer: W) -> Result<usize, ConversationError> {
        let entries = self.log.snapshot()?;
        write_jsonl(&entries, writer).map_err(|err| {
            ConversationError::Dependency(format!("failed to export conversation log: {}", err))
        })
    }

    async fn emit(&self, event: OrchestratorEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_orchestrator_event(&event).await;
        }
    }
}
