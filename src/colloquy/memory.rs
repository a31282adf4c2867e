//! Agent memory buffers.
//!
//! Every [`Agent`](crate::Agent) holds a typed handle to a [`MemoryBuffer`]
//! that records the exchanges it took part in: each message it answered (as
//! [`Role::User`]) followed by its own reply (as [`Role::Assistant`]). The most
//! recent messages (a *window*) are replayed to the model on the next turn so
//! the agent keeps conversational context, including what it said itself,
//! without re-sending its whole history.
//!
//! Two implementations are provided:
//!
//! - [`BufferMemory`]: FIFO buffer, optionally bounded (oldest messages evicted)
//! - [`KeywordMemory`]: unbounded store that can also be searched by word overlap
//!
//! Both are `Send + Sync` and use interior mutability so that a buffer can be
//! shared between an agent and an observer through an `Arc`.
//!
//! ```rust
//! use colloquy::memory::{BufferMemory, MemoryBuffer};
//! use colloquy::{Message, Role};
//!
//! let memory = BufferMemory::with_capacity(3);
//! for i in 0..4 {
//!     memory.add(&format!("msg{}", i));
//! }
//! memory.add_message(Message::new(Role::Assistant, "reply"));
//! assert_eq!(memory.len(), 3);
//! assert_eq!(memory.window(2), vec!["msg3".to_string(), "reply".to_string()]);
//! assert_eq!(memory.recent(1)[0].role, Role::Assistant);
//! ```

use crate::colloquy::client_wrapper::{Message, Role};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Capability contract shared by all memory variants.
pub trait MemoryBuffer: Send + Sync {
    /// Record a role-tagged message.
    fn add_message(&self, message: Message);

    /// The most recent `size` messages with their roles, oldest first.
    /// Returns fewer when the buffer holds fewer.
    fn recent(&self, size: usize) -> Vec<Message>;

    /// Number of messages currently held.
    fn len(&self) -> usize;

    /// Short label used in logs.
    fn kind(&self) -> &'static str;

    /// Record an incoming message.
    fn add(&self, message: &str) {
        self.add_message(Message::new(Role::User, message));
    }

    /// Contents of the most recent `size` messages, oldest first.
    fn window(&self, size: usize) -> Vec<String> {
        self.recent(size).into_iter().map(|m| m.content).collect()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memory contents are complete messages, a panic elsewhere cannot leave them
/// half-written, so a poisoned lock is simply recovered.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn tail<'a>(messages: impl DoubleEndedIterator<Item = &'a Message>, size: usize) -> Vec<Message> {
    let mut recent: Vec<Message> = messages.rev().take(size).cloned().collect();
    recent.reverse();
    recent
}

/// FIFO message buffer.
#[derive(Debug, Default)]
pub struct BufferMemory {
    capacity: Option<usize>,
    messages: Mutex<VecDeque<Message>>,
}

impl BufferMemory {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding at most `capacity` messages; older ones are evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Contents of every message held, oldest first.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages)
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.messages).clear();
    }
}

impl MemoryBuffer for BufferMemory {
    fn add_message(&self, message: Message) {
        let mut messages = lock(&self.messages);
        if self.capacity == Some(0) {
            return;
        }
        messages.push_back(message);
        if let Some(capacity) = self.capacity {
            while messages.len() > capacity {
                messages.pop_front();
            }
        }
    }

    fn recent(&self, size: usize) -> Vec<Message> {
        tail(lock(&self.messages).iter(), size)
    }

    fn len(&self) -> usize {
        lock(&self.messages).len()
    }

    fn kind(&self) -> &'static str {
        "buffer"
    }
}

/// Unbounded memory that can also be queried for messages related to a text.
///
/// Relevance is the Jaccard similarity between normalised word sets, words of
/// two characters or fewer are ignored.
///
/// ```rust
/// use colloquy::memory::{KeywordMemory, MemoryBuffer};
///
/// let memory = KeywordMemory::new();
/// memory.add("The chapter about dragons needs a stronger ending");
/// memory.add("Lunch is at noon");
/// let hits = memory.search("dragons ending", 1);
/// assert_eq!(hits.len(), 1);
/// assert!(hits[0].contains("dragons"));
/// ```
#[derive(Debug, Default)]
pub struct KeywordMemory {
    messages: Mutex<Vec<Message>>,
}

impl KeywordMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to `limit` stored messages sharing words with `query`, best match
    /// first. Ties keep insertion order; messages with no overlap are skipped.
    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        let query_words = word_set(query);
        let messages = lock(&self.messages);
        let mut scored: Vec<(f32, usize)> = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| (jaccard(&query_words, &word_set(&msg.content)), idx))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, idx)| messages[idx].content.clone())
            .collect()
    }
}

impl MemoryBuffer for KeywordMemory {
    fn add_message(&self, message: Message) {
        lock(&self.messages).push(message);
    }

    fn recent(&self, size: usize) -> Vec<Message> {
        tail(lock(&self.messages).iter(), size)
    }

    fn len(&self) -> usize {
        lock(&self.messages).len()
    }

    fn kind(&self) -> &'static str {
        "keyword"
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() > 2)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}
