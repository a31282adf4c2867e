// src/colloquy/mod.rs

pub mod agent;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod conversation_log;
pub mod error;
pub mod event;
pub mod memory;
pub mod orchestrator;
pub mod prompt_template;
pub mod secrets;

pub use agent::Agent;
pub use orchestrator::Orchestrator;
