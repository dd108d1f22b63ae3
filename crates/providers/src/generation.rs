//! Generation Client — the single long-latency call to the language model.
//!
//! Wraps a [`Provider`] with an overall deadline, bounded retries on
//! transient failures, and caller cancellation. Failures come back as a
//! typed [`GenerationError`], never as text.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use warren_core::error::{GenerationError, ProviderError};
use warren_core::provider::{ChatMessage, Provider, ProviderRequest};
use warren_core::CancellationToken;

use crate::retry::RetryPolicy;

pub struct GenerationClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from the `[generation]` section and top-level defaults.
    pub fn from_config(provider: Arc<dyn Provider>, config: &warren_config::AppConfig) -> Self {
        let g = &config.generation;
        Self::new(provider, config.default_model.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_timeout(Duration::from_secs(g.timeout_secs))
            .with_retry(RetryPolicy::new(
                g.max_attempts,
                Duration::from_millis(g.backoff_base_ms),
                Duration::from_millis(g.backoff_max_ms),
            ))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the prompt and return the raw model text.
    ///
    /// The deadline covers every attempt and backoff. On cancellation or
    /// timeout the in-flight provider future is dropped, which aborts the
    /// underlying request.
    pub async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(provider = %self.provider.name(), "Generation cancelled by caller");
                Err(GenerationError::Cancelled)
            }
            outcome = tokio::time::timeout(self.timeout, self.attempt_loop(messages)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            provider = %self.provider.name(),
                            timeout_secs = self.timeout.as_secs(),
                            "Generation timed out"
                        );
                        Err(GenerationError::Timeout {
                            timeout_secs: self.timeout.as_secs(),
                        })
                    }
                }
            }
        }
    }

    async fn attempt_loop(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                stop: Vec::new(),
            };

            debug!(provider = %self.provider.name(), model = %self.model, attempt, "Generation attempt");

            match self.provider.complete(request).await {
                Ok(response) => return Ok(response.content),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt, &e);
                    warn!(
                        provider = %self.provider.name(),
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient generation failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ProviderError::RateLimited { .. }) => {
                    return Err(GenerationError::RateLimited { attempts: attempt });
                }
                Err(e) => return Err(GenerationError::Provider(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use warren_core::provider::ProviderResponse;

    /// Replays a fixed list of outcomes, then repeats the last one.
    struct Scripted {
        outcomes: Mutex<Vec<Result<String, ProviderError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            let next = if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                outcomes[0].clone()
            };
            next.map(|content| ProviderResponse {
                content,
                usage: None,
                model: request.model,
            })
        }
    }

    /// Never answers; records whether its future was dropped.
    struct Hanging {
        dropped: Arc<AtomicBool>,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Provider for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let _guard = DropFlag(self.dropped.clone());
            std::future::pending().await
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(10), Duration::from_millis(50))
    }

    fn unavailable() -> ProviderError {
        ProviderError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_then_succeeds() {
        let provider = Scripted::new(vec![
            Err(unavailable()),
            Err(ProviderError::Network("reset".into())),
            Ok("done".into()),
        ]);
        let client = GenerationClient::new(provider.clone(), "m").with_retry(fast_retry(3));
        let text = client
            .generate(vec![ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "done");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_error_is_not_retried() {
        let provider = Scripted::new(vec![Err(ProviderError::AuthenticationFailed("bad key".into()))]);
        let client = GenerationClient::new(provider.clone(), "m").with_retry(fast_retry(3));
        let err = client
            .generate(vec![ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Provider(ProviderError::AuthenticationFailed(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_reports_attempts() {
        let provider = Scripted::new(vec![Err(ProviderError::RateLimited { retry_after_secs: 0 })]);
        let client = GenerationClient::new(provider.clone(), "m").with_retry(fast_retry(3));
        let err = client
            .generate(vec![ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited { attempts: 3 }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transient_errors_surface_as_provider_error() {
        let provider = Scripted::new(vec![Err(unavailable())]);
        let client = GenerationClient::new(provider.clone(), "m").with_retry(fast_retry(2));
        let err = client
            .generate(vec![ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Provider(ProviderError::ApiError { status_code: 503, .. })
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_drops_the_request() {
        let dropped = Arc::new(AtomicBool::new(false));
        let provider = Arc::new(Hanging {
            dropped: dropped.clone(),
        });
        let client = GenerationClient::new(provider, "m").with_timeout(Duration::from_secs(5));
        let err = client
            .generate(vec![ChatMessage::user("hi")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { timeout_secs: 5 }));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_drops_the_request() {
        let dropped = Arc::new(AtomicBool::new(false));
        let provider = Arc::new(Hanging {
            dropped: dropped.clone(),
        });
        let client = GenerationClient::new(provider, "m").with_timeout(Duration::from_secs(600));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = client
            .generate(vec![ChatMessage::user("hi")], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn pre_cancelled_token_skips_the_call() {
        let provider = Scripted::new(vec![Ok("never".into())]);
        let client = GenerationClient::new(provider.clone(), "m");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .generate(vec![ChatMessage::user("hi")], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
