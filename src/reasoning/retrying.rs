//! Retry and circuit-breaking wrapper.

use std::sync::Arc;

use super::{CompletionFuture, CompletionRequest, ReasoningProvider};
use crate::error::{Result, SimError};
use crate::resilience::{CircuitBreaker, ExponentialBackoff, RetryPolicy};

/// Wraps a provider with bounded exponential backoff and a circuit breaker.
pub struct RetryingProvider {
    inner: Arc<dyn ReasoningProvider>,
    policy: ExponentialBackoff,
    breaker: CircuitBreaker,
}

impl std::fmt::Debug for RetryingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingProvider")
            .field("inner", &self.inner.name())
            .field("policy", &self.policy)
            .field("breaker", &self.breaker)
            .finish()
    }
}

impl RetryingProvider {
    /// Wrap a provider
    pub fn new(
        inner: Arc<dyn ReasoningProvider>,
        policy: ExponentialBackoff,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            inner,
            policy,
            breaker,
        }
    }

    /// The circuit breaker guarding the inner provider
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<String> {
        if self.breaker.is_open() {
            return Err(SimError::ProviderUnavailable {
                attempts: 0,
                last_error: "provider tripped after repeated failures".to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(text) => {
                    self.breaker.record_success();
                    return Ok(text);
                },
                Err(e) if self.policy.should_retry(attempt, e.is_transient()) => {
                    let mut wait = self.policy.backoff(attempt);
                    if let SimError::RateLimited { retry_after_ms } = &e {
                        wait = wait.max(std::time::Duration::from_millis(*retry_after_ms));
                    }
                    tracing::warn!(
                        provider = self.inner.name(),
                        attempt = attempt + 1,
                        backoff_ms = wait.as_millis() as u64,
                        error = %e,
                        "Transient reasoning failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                },
                Err(e) => {
                    self.breaker.record_failure();
                    return Err(SimError::ProviderUnavailable {
                        attempts: attempt + 1,
                        last_error: e.to_string(),
                    });
                },
            }
        }
    }
}

impl ReasoningProvider for RetryingProvider {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(self.complete_with_retry(request))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ScriptedProvider;

    fn fast_policy(max_attempts: u32) -> ExponentialBackoff {
        ExponentialBackoff {
            max_attempts,
            base_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let inner = Arc::new(ScriptedProvider::new());
        inner.push_error(SimError::RateLimited { retry_after_ms: 1 });
        inner.push_error(SimError::Network("reset".into()));
        inner.push_text("ok");

        let provider =
            RetryingProvider::new(inner.clone(), fast_policy(3), CircuitBreaker::new(5, 60_000));
        let text = provider.complete(CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = Arc::new(ScriptedProvider::new());
        for _ in 0..5 {
            inner.push_error(SimError::Network("down".into()));
        }
        let provider =
            RetryingProvider::new(inner.clone(), fast_policy(2), CircuitBreaker::new(5, 60_000));
        let err = provider.complete(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, SimError::ProviderUnavailable { attempts: 3, .. }));
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_open_circuit_fails_fast() {
        let inner = Arc::new(ScriptedProvider::new());
        inner.push_error(SimError::Storage("not transient".into()));
        let provider =
            RetryingProvider::new(inner.clone(), fast_policy(3), CircuitBreaker::new(1, 60_000));

        assert!(provider.complete(CompletionRequest::new("a")).await.is_err());
        assert!(provider.breaker().is_open());

        let err = provider.complete(CompletionRequest::new("b")).await.unwrap_err();
        match err {
            SimError::ProviderUnavailable { attempts, last_error } => {
                assert_eq!(attempts, 0);
                assert!(last_error.contains("tripped"));
            },
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(inner.calls(), 1);
    }
}
