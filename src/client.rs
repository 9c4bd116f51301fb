//! The model seam: one trait for "send a prompt (and maybe an image), get
//! text back", plus the production implementation on top of edgequake-llm.
//!
//! The client is built once at startup and handed to
//! [`crate::audit::Auditor::new`]; nothing in the crate reaches for a global
//! handle. Tests implement [`ModelClient`] directly.

use crate::config::AuditConfig;
use crate::error::{AuditError, ModelError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, info};

/// Primary credential variable.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Variable the Gemini provider of edgequake-llm reads.
pub const PROVIDER_KEY_VAR: &str = "GEMINI_API_KEY";

/// Text plus token accounting from one model call.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A text/vision generation backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier shown in the UI.
    fn model_name(&self) -> &str;

    /// Send `prompt`, optionally with one image, and wait for the reply.
    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageData>,
    ) -> Result<ModelReply, ModelError>;
}

/// [`ModelClient`] backed by an `edgequake_llm::LLMProvider`.
pub struct LlmModelClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl LlmModelClient {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AuditConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Build the provider named in `config` via `ProviderFactory`.
    ///
    /// Fails with [`AuditError::MissingApiKey`] when no credential is present
    /// for the Gemini provider; other providers report their own missing keys
    /// through `ProviderNotConfigured`.
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        if config.provider_name == "gemini" && resolve_api_key().is_none() {
            return Err(AuditError::MissingApiKey { var: API_KEY_VAR });
        }

        let provider =
            ProviderFactory::create_llm_provider(&config.provider_name, &config.model).map_err(
                |e| AuditError::ProviderNotConfigured {
                    provider: config.provider_name.clone(),
                    hint: format!("{e}"),
                },
            )?;

        info!(
            "Model client ready: {} / {}",
            config.provider_name, config.model
        );
        Ok(Self::new(provider, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelClient for LlmModelClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageData>,
    ) -> Result<ModelReply, ModelError> {
        let message = match image {
            Some(img) => ChatMessage::user_with_images(prompt, vec![img]),
            None => ChatMessage::user(prompt),
        };
        let messages = vec![message];
        let options = self.options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::new(e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model, response.prompt_tokens, response.completion_tokens
        );

        Ok(ModelReply {
            text: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }
}

/// The configured credential, `GOOGLE_API_KEY` first, then `GEMINI_API_KEY`.
pub fn resolve_api_key() -> Option<String> {
    [API_KEY_VAR, PROVIDER_KEY_VAR]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
}

/// Mirror `GOOGLE_API_KEY` into `GEMINI_API_KEY` for the provider factory.
///
/// Mutates the process environment, so call it from `main` before any
/// runtime threads exist.
pub fn export_provider_key() {
    let provider_key_set = std::env::var(PROVIDER_KEY_VAR)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if provider_key_set {
        return;
    }
    if let Ok(key) = std::env::var(API_KEY_VAR) {
        if !key.trim().is_empty() {
            std::env::set_var(PROVIDER_KEY_VAR, key);
        }
    }
}

