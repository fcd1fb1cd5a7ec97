//! OpenAI-compatible chat completion provider (OpenAI, OpenRouter, vLLM, Ollama).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{CompletionFuture, CompletionRequest, ReasoningProvider};
use crate::config::ReasoningConfig;
use crate::error::{Result, SimError};

/// Default wait when a 429 carries no Retry-After header
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// HTTP provider speaking the `/chat/completions` protocol
#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatProvider {
    /// Build from config; the API key is read from `api_key_env` if set
    pub fn from_config(config: &ReasoningConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: std::env::var(&config.api_key_env).ok(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn chat_completion(&self, request: CompletionRequest) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt {
            messages.push(Message {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt,
        });

        let body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(request.temperature.unwrap_or(self.temperature)),
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
        };

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            http = http.header("Authorization", format!("Bearer {}", key));
        }
        let response = http.send().await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                let retry_after_ms = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map_or(DEFAULT_RETRY_AFTER_MS, |secs| secs * 1000);
                return Err(SimError::RateLimited { retry_after_ms });
            }
            let error_text = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(SimError::Reasoning(format!(
                    "API error {}: {}",
                    status, error_text
                )));
            }
            return Err(SimError::ProviderUnavailable {
                attempts: 1,
                last_error: format!("API error {}: {}", status, error_text),
            });
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| SimError::Reasoning(format!("JSON parse error: {}", e)))?;
        Ok(result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}

impl ReasoningProvider for OpenAiCompatProvider {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(self.chat_completion(request))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalization() {
        let config = ReasoningConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key_env: "STAKESIM_TEST_UNSET_KEY".to_string(),
            ..ReasoningConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.endpoint, "http://localhost:11434/v1/chat/completions");
        assert!(provider.api_key.is_none());
    }

    #[test]
    fn test_request_serialization_skips_none() {
        let req = ChatRequest {
            model: "m".to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: None,
            max_tokens: Some(10),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 10);
    }
}
