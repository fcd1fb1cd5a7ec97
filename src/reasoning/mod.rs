//! Reasoning provider boundary.
//!
//! Actors, memory compaction and social events all talk to the outside
//! world through [`ReasoningProvider::complete`]: text in, text out. The
//! provider is assumed to fail transiently and to sometimes return text that
//! is not the structured payload the caller asked for.
//!
//! ```text
//! Actor ──► RetryingProvider ──► OpenAiCompatProvider ──► HTTP
//!             │ backoff on transient errors
//!             └ circuit breaker fails fast while the provider is down
//! ```
//!
//! Callers never see transient errors from a [`RetryingProvider`]; they see
//! either text or [`SimError::ProviderUnavailable`], and degrade locally.

mod mock;
mod openai;
mod retrying;

pub use mock::{MockProvider, ScriptedProvider};
pub use openai::OpenAiCompatProvider;
pub use retrying::RetryingProvider;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{ReasoningConfig, ResilienceConfig};
use crate::error::{Result, SimError};
use crate::resilience::{CircuitBreaker, ExponentialBackoff};

/// One completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system prompt
    pub system_prompt: Option<String>,
    /// Sampling temperature override
    pub temperature: Option<f32>,
    /// Completion length override
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Request with only a user prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the completion length
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Boxed completion future
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Text-in/text-out reasoning collaborator
pub trait ReasoningProvider: Send + Sync {
    /// Complete a prompt
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Build the configured provider, wrapped in retry and circuit breaking.
pub fn build(
    config: &ReasoningConfig,
    resilience: &ResilienceConfig,
    seed: Option<u64>,
) -> Result<Arc<dyn ReasoningProvider>> {
    let inner: Arc<dyn ReasoningProvider> = match config.provider.as_str() {
        "mock" => Arc::new(MockProvider::new(seed.unwrap_or(0))),
        "openai" => Arc::new(OpenAiCompatProvider::from_config(config)?),
        other => {
            return Err(SimError::Config(format!(
                "Unknown reasoning provider: {}",
                other
            )))
        },
    };
    tracing::info!(provider = inner.name(), model = %config.model, "Reasoning provider ready");

    Ok(Arc::new(RetryingProvider::new(
        inner,
        ExponentialBackoff::from(resilience),
        CircuitBreaker::new(
            resilience.circuit_threshold as usize,
            resilience.circuit_reset_ms,
        ),
    )))
}
