//! The global, append-only conversation log.
//!
//! Every completed agent turn routed through an
//! [`Orchestrator`](crate::Orchestrator) produces exactly one [`LogEntry`].
//! Entries are never removed or reordered; readers get copies.
//!
//! The log lives in memory. [`write_jsonl`] exports a snapshot as JSON lines,
//! one entry per line, for callers that want a transcript on disk.

use crate::colloquy::error::ConversationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

/// `(session_key, speaker, message, response)` for one agent turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub session_key: String,
    /// Id of the agent that produced `response`.
    pub agent_id: String,
    pub speaker: String,
    pub message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// Mutex-guarded append-only sequence of [`LogEntry`] values.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`, returning the new length.
    pub fn append(&self, entry: LogEntry) -> Result<usize, ConversationError> {
        let mut entries = self.lock_entries()?;
        entries.push(entry);
        Ok(entries.len())
    }

    /// Hold the log for a commit spanning several structures.
    pub(crate) fn lock_entries(&self) -> Result<MutexGuard<'_, Vec<LogEntry>>, ConversationError> {
        self.entries.lock().map_err(|_| corrupted())
    }

    /// Copy of every entry, in append order.
    pub fn snapshot(&self) -> Result<Vec<LogEntry>, ConversationError> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .map_err(|_| corrupted())
    }

    pub fn len(&self) -> Result<usize, ConversationError> {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .map_err(|_| corrupted())
    }

    pub fn is_empty(&self) -> Result<bool, ConversationError> {
        self.len().map(|len| len == 0)
    }

    /// Whether a panic interrupted a previous append.
    pub fn is_corrupted(&self) -> bool {
        self.entries.is_poisoned()
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = self.entries.lock().unwrap();
                    panic!("log replaced mid-append");
                })
                .join();
        });
    }
}

fn corrupted() -> ConversationError {
    ConversationError::StateCorruption("conversation log is corrupted".to_string())
}

/// Write `entries` to `writer` as JSON lines. Returns the number written.
pub fn write_jsonl<W: Write>(entries: &[LogEntry], mut writer: W) -> io::Result<usize> {
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> LogEntry {
        LogEntry {
            session_key: "s1".to_string(),
            agent_id: "bot1".to_string(),
            speaker: "alice".to_string(),
            message: format!("msg{}", n),
            response: format!("bot1 received: msg{}", n),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let log = ConversationLog::new();
        assert!(log.is_empty().unwrap());
        for n in 0..3 {
            assert_eq!(log.append(entry(n)).unwrap(), n + 1);
        }
        let messages: Vec<String> = log
            .snapshot()
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["msg0", "msg1", "msg2"]);
    }

    #[test]
    fn test_snapshot_is_detached_from_live_log() {
        let log = ConversationLog::new();
        log.append(entry(0)).unwrap();
        let mut copy = log.snapshot().unwrap();
        copy.clear();
        assert_eq!(log.len().unwrap(), 1);
    }

    #[test]
    fn test_poisoned_log_reports_corruption() {
        let log = ConversationLog::new();
        log.poison();
        assert!(log.is_corrupted());
        assert!(matches!(
            log.append(entry(0)),
            Err(ConversationError::StateCorruption(_))
        ));
    }

    #[test]
    fn test_write_jsonl_one_line_per_entry() {
        let entries = vec![entry(0), entry(1)];
        let mut out = Vec::new();
        assert_eq!(write_jsonl(&entries, &mut out).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: LogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.message, "msg1");
    }
}
