//! Configuration for colloquy.
//!
//! Provides the [`ColloquyConfig`] struct holding the knobs shared by agents
//! and the orchestrator. Users construct it manually; no file parsing
//! dependencies are required. Secrets (API keys) are resolved separately
//! through [`SecretProvider`](crate::secrets::SecretProvider).
//!
//! # Example
//!
//! ```rust
//! use colloquy::ColloquyConfig;
//! use std::time::Duration;
//!
//! let config = ColloquyConfig {
//!     memory_window: 4,
//!     completion_timeout: Some(Duration::from_secs(30)),
//!     ..ColloquyConfig::default()
//! };
//! assert_eq!(config.default_model, "gpt-4.1-mini");
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Global configuration for colloquy agents and orchestrators.
#[derive(Debug, Clone, PartialEq)]
pub struct ColloquyConfig {
    /// How many recent memory messages an agent replays to the model.
    pub memory_window: usize,

    /// Capacity of the [`BufferMemory`](crate::memory::BufferMemory) created for
    /// agents built without an explicit buffer. `None` means unbounded.
    pub memory_capacity: Option<usize>,

    /// Upper bound applied to every completion request made while routing.
    /// `None` waits indefinitely.
    pub completion_timeout: Option<Duration>,

    /// Model name used by helpers that construct a completion client.
    pub default_model: String,

    /// `KEY=VALUE` file consulted by the [`SecretProvider`](crate::secrets::SecretProvider)
    /// after the environment.
    pub env_file: PathBuf,
}

impl Default for ColloquyConfig {
    /// ```rust
    /// use colloquy::ColloquyConfig;
    /// use std::path::PathBuf;
    ///
    /// let config = ColloquyConfig::default();
    /// assert_eq!(config.memory_window, 10);
    /// assert_eq!(config.env_file, PathBuf::from(".env"));
    /// ```
    fn default() -> Self {
        Self {
            memory_window: 10,
            memory_capacity: None,
            completion_timeout: None,
            default_model: "gpt-4.1-mini".to_string(),
            env_file: PathBuf::from(".env"),
        }
    }
}
