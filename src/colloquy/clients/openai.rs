//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat API,
//! capturing both the assistant response and token usage for cost tracking.
//!
//! # Example
//!
//! ```rust,no_run
//! use colloquy::clients::openai::{Model, OpenAIClient};
//! use colloquy::client_wrapper::{ClientWrapper, Message, Role};
//! use colloquy::secrets::SecretProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secrets = SecretProvider::from_env_file(".env");
//!     let client = OpenAIClient::from_secrets(&secrets, Model::GPT41Mini)?;
//!
//!     let resp = client
//!         .send_message(&[
//!             Message::new(Role::System, "You are an assistant."),
//!             Message::new(Role::User, "Hello!"),
//!         ])
//!         .await?;
//!     println!("Assistant: {}", resp.content);
//!
//!     if let Some(usage) = client.get_last_usage() {
//!         println!("Tokens used: {}", usage.total_tokens);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The API key is looked up under `OPENAI_API_KEY`.
use std::sync::Mutex;

use async_trait::async_trait;
use openai_rust::chat;
use openai_rust2 as openai_rust;

use crate::colloquy::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use crate::colloquy::error::{ClientError, SecretError};
use crate::colloquy::secrets::SecretProvider;

/// Name of the configuration key holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Model identifiers commonly used for agent conversations.
#[allow(non_camel_case_types)]
pub enum Model {
    /// `gpt-4` – the first GPT-4 release.
    GPT4,
    /// `gpt-4o` – Omni model with text + image inputs.
    GPT4o,
    /// `gpt-4o-mini` – cost effective GPT-4o derivative.
    GPT4oMini,
    /// `gpt-4.1` – general availability GPT-4.1.
    GPT41,
    /// `gpt-4.1-mini` – reduced cost GPT-4.1 tier.
    GPT41Mini,
    /// `gpt-4.1-nano` – ultra low cost GPT-4.1 derivative.
    GPT41Nano,
}

/// Convert a [`Model`] variant into the string identifier expected by the REST API.
pub fn model_to_string(model: Model) -> String {
    match model {
        Model::GPT4 => "gpt-4".to_string(),
        Model::GPT4o => "gpt-4o".to_string(),
        Model::GPT4oMini => "gpt-4o-mini".to_string(),
        Model::GPT41 => "gpt-4.1".to_string(),
        Model::GPT41Mini => "gpt-4.1-mini".to_string(),
        Model::GPT41Nano => "gpt-4.1-nano".to_string(),
    }
}

/// Client wrapper for OpenAI's Chat Completions API.
pub struct OpenAIClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
    /// Model name that will be injected into each request.
    model: String,
    /// Storage for the token usage returned by the most recent request.
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a new client using the provided API key and [`Model`] variant.
    pub fn new_with_model_enum(secret_key: &str, model: Model) -> Self {
        Self::new_with_model_string(secret_key, &model_to_string(model))
    }

    /// Construct a new client using the provided API key and explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new(secret_key),
            model: model_name.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// Construct a client whose API key is resolved through a [`SecretProvider`].
    pub fn from_secrets(secrets: &SecretProvider, model: Model) -> Result<Self, SecretError> {
        let key = secrets.get(OPENAI_API_KEY)?;
        Ok(Self::new_with_model_enum(&key, model))
    }

    /// Like [`from_secrets`](OpenAIClient::from_secrets) with an explicit model name.
    pub fn from_secrets_with_model_string(
        secrets: &SecretProvider,
        model_name: &str,
    ) -> Result<Self, SecretError> {
        let key = secrets.get(OPENAI_API_KEY)?;
        Ok(Self::new_with_model_string(&key, model_name))
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, ClientError> {
        let formatted_messages = messages
            .iter()
            .map(|msg| chat::Message {
                role: msg.role.as_str().to_owned(),
                content: msg.content.clone(),
            })
            .collect();

        let chat_arguments = chat::ChatArguments::new(&self.model, formatted_messages);
        let url_path_string = "/v1/chat/completions".to_string();

        match self
            .client
            .create_chat(chat_arguments, Some(url_path_string))
            .await
        {
            Ok(response) => {
                let usage = TokenUsage {
                    input_tokens: response.usage.prompt_tokens as usize,
                    output_tokens: response.usage.completion_tokens as usize,
                    total_tokens: response.usage.total_tokens as usize,
                };
                if let Ok(mut slot) = self.token_usage.lock() {
                    *slot = Some(usage);
                }

                // No choices is an absent completion, not a failure.
                let content = response
                    .choices
                    .first()
                    .map(|choice| choice.message.content.clone())
                    .unwrap_or_default();

                Ok(Message {
                    role: Role::Assistant,
                    content,
                })
            }
            Err(err) => {
                log::error!(
                    "OpenAIClient::send_message(...): OpenAI API Error ({}): {}",
                    self.model,
                    err
                );
                Err(ClientError::from_provider_message(err.to_string()))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() {
        assert_eq!(model_to_string(Model::GPT4), "gpt-4");
        assert_eq!(model_to_string(Model::GPT41Mini), "gpt-4.1-mini");
    }

    #[test]
    fn test_client_has_no_usage_before_first_call() {
        let client = OpenAIClient::new_with_model_string("test-key", "gpt-4o");
        assert_eq!(client.model_name(), "gpt-4o");
        assert!(client.get_last_usage().is_none());
    }
}
