//! Prompt templates rendered per speaker.
//!
//! Templates use `minijinja` syntax and are rendered with strict undefined
//! handling: referencing a parameter that was not supplied is a
//! [`ConversationError::Configuration`] instead of silently rendering an empty
//! string.
//!
//! ```rust
//! use colloquy::prompt_template::PromptTemplate;
//!
//! let template = PromptTemplate::new("Hello, {{ speaker }}!").unwrap();
//! assert_eq!(template.render(&[("speaker", "alice")]).unwrap(), "Hello, alice!");
//! assert!(template.render(&[]).is_err());
//! ```

use crate::colloquy::error::ConversationError;
use minijinja::{Environment, UndefinedBehavior};
use std::collections::BTreeMap;

/// Default system prompt used by agents that were not given one.
pub const DEFAULT_TEMPLATE: &str =
    "You are {{ agent }}, taking part in a conversation. You are replying to {{ speaker }}.";

/// A validated prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    env: Environment<'static>,
}

impl PromptTemplate {
    /// Parse `source`, failing with [`ConversationError::Configuration`] on a
    /// syntax error.
    pub fn new(source: impl Into<String>) -> Result<Self, ConversationError> {
        let source = source.into();
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.template_from_str(&source).map_err(|e| {
            ConversationError::Configuration(format!("invalid prompt template: {}", e))
        })?;
        Ok(Self { source, env })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template with the given named parameters.
    pub fn render(&self, params: &[(&str, &str)]) -> Result<String, ConversationError> {
        let ctx: BTreeMap<&str, &str> = params.iter().copied().collect();
        self.env.render_str(&self.source, ctx).map_err(|e| {
            ConversationError::Configuration(format!("cannot format prompt template: {}", e))
        })
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            env,
        }
    }
}
