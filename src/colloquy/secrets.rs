//! Secret and configuration value lookup.
//!
//! A [`SecretProvider`] resolves named values (API keys, tokens) from two
//! sources. The process environment always wins; a `KEY=VALUE` file (usually
//! `.env`) is consulted only when the environment has no entry for the key.
//! The environment is read on every [`get`](SecretProvider::get), so rotating a
//! variable at runtime takes effect immediately.
//!
//! ```rust
//! use colloquy::secrets::SecretProvider;
//!
//! let secrets = SecretProvider::from_pairs([("COLLOQUY_DOC_KEY", "file-value")]);
//! assert_eq!(secrets.get("COLLOQUY_DOC_KEY").unwrap(), "file-value");
//! assert!(secrets.get("COLLOQUY_DOC_MISSING").is_err());
//! ```

use crate::colloquy::error::SecretError;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment-first lookup of configuration values with a file-backed fallback.
#[derive(Debug, Clone, Default)]
pub struct SecretProvider {
    source: Option<PathBuf>,
    file_values: HashMap<String, String>,
}

impl SecretProvider {
    /// A provider backed by the environment only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `KEY=VALUE` pairs from `path`.
    ///
    /// A missing or unreadable file is not fatal: the provider falls back to
    /// the environment alone and a warning is logged.
    pub fn from_env_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_from_env_file(path) {
            Ok(provider) => provider,
            Err(err) => {
                log::warn!(
                    "SecretProvider: could not read {} ({}), using environment only",
                    path.display(),
                    err
                );
                Self {
                    source: Some(path.to_path_buf()),
                    file_values: HashMap::new(),
                }
            }
        }
    }

    /// Strict variant of [`from_env_file`](SecretProvider::from_env_file) that
    /// reports I/O failures.
    pub fn try_from_env_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let file_values = parse_env_lines(&contents);
        log::debug!(
            "SecretProvider: loaded {} entries from {}",
            file_values.len(),
            path.display()
        );
        Ok(Self {
            source: Some(path.to_path_buf()),
            file_values,
        })
    }

    /// Build a provider whose file-backed layer is the given pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            source: None,
            file_values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Resolve `key`: environment first, then the file-backed values.
    pub fn get(&self, key: &str) -> Result<String, SecretError> {
        if let Ok(value) = env::var(key) {
            return Ok(value);
        }
        self.file_values
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(key.to_string()))
    }

    /// Resolve `key`, returning `default` when it is absent from both sources.
    pub fn get_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get(key).unwrap_or_else(|_| default.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Path of the backing file, if one was configured.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn parse_env_lines(contents: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        values.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    values
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_lines() {
        let values = parse_env_lines(
            "# comment\n\nOPENAI_API_KEY=file-key\nQUOTED=\"a b\"\nSINGLE='x=y'\nnot a pair\n=orphan\n",
        );
        assert_eq!(values.len(), 3);
        assert_eq!(values["OPENAI_API_KEY"], "file-key");
        assert_eq!(values["QUOTED"], "a b");
        assert_eq!(values["SINGLE"], "x=y");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let values = parse_env_lines("TOKEN=abc==\n");
        assert_eq!(values["TOKEN"], "abc==");
    }

    #[test]
    fn test_missing_file_falls_back_to_environment() {
        let provider = SecretProvider::from_env_file("/definitely/not/here/.env");
        assert!(provider.get("COLLOQUY_UNIT_ABSENT_KEY").is_err());
        assert!(SecretProvider::try_from_env_file("/definitely/not/here/.env").is_err());
    }
}
