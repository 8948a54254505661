use crate::client::api::ApiError;
use crate::telemetry::counters;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

/// Failure taxonomy for business requests. VALIDATION is purely local
/// (no network attempted); the rest classify what the wire reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Timeout,
    Network,
    ServerCold,
    ServerError,
    Auth,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Network => "NETWORK",
            ErrorKind::ServerCold => "SERVER_COLD",
            ErrorKind::ServerError => "SERVER_ERROR",
            ErrorKind::Auth => "AUTH",
        }
    }

    /// SERVER_COLD is terminal: retrying against a sleeping service only
    /// keeps it from waking. VALIDATION and AUTH cannot improve on retry.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Network | ErrorKind::ServerError
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub attempts: u32,
    pub message: String,
}

impl RequestError {
    pub fn new(kind: ErrorKind, attempts: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            attempts,
            message: message.into(),
        }
    }
}

/// One unit of retryable work. `validate` runs before any attempt and a
/// failure there short-circuits without touching the network.
#[async_trait]
pub trait RetryableCall: Send + Sync {
    type Output: Send;

    fn describe(&self) -> &'static str;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    async fn attempt(&self) -> Result<Self::Output, ApiError>;
}

/// Receives the SERVER_COLD signal so the readiness layer can re-enter a
/// wait-for-ready state instead of letting callers hammer a sleeping
/// service.
#[async_trait]
pub trait ColdStartSink: Send + Sync {
    async fn service_went_cold(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl RequestPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            attempt_timeout,
        }
    }

    fn delay_after(&self, attempt_number: u32) -> Duration {
        self.base_delay.saturating_mul(attempt_number.max(1))
    }
}

/// Bounded retry around one business request, with linear backoff between
/// retryable failures and a per-attempt timeout independent of the outer
/// budget.
pub struct RequestRetrier {
    policy: RequestPolicy,
    cold_sink: Option<Arc<dyn ColdStartSink>>,
}

impl RequestRetrier {
    pub fn new(policy: RequestPolicy) -> Self {
        Self {
            policy,
            cold_sink: None,
        }
    }

    pub fn with_cold_sink(mut self, sink: Arc<dyn ColdStartSink>) -> Self {
        self.cold_sink = Some(sink);
        self
    }

    pub async fn execute<C>(&self, call: &C) -> Result<C::Output, RequestError>
    where
        C: RetryableCall,
    {
        if let Err(reason) = call.validate() {
            counters().record_request_failure(call.describe(), ErrorKind::Validation);
            return Err(RequestError::new(ErrorKind::Validation, 0, reason));
        }

        let mut attempts = 0;
        let mut last_error: Option<ApiError> = None;

        while attempts < self.policy.max_attempts {
            attempts += 1;

            let result = match timeout(self.policy.attempt_timeout, call.attempt()).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout),
            };

            match result {
                Ok(output) => {
                    counters().record_request_success(call.describe());
                    tracing::debug!(call = call.describe(), attempts, "request succeeded");
                    return Ok(output);
                }
                Err(err) => {
                    let kind = err.kind();
                    tracing::warn!(
                        call = call.describe(),
                        attempt = attempts,
                        kind = kind.as_str(),
                        error = %err,
                        "request attempt failed"
                    );
                    let retryable = kind.is_retryable();
                    last_error = Some(err);
                    if !retryable {
                        break;
                    }
                    if attempts < self.policy.max_attempts {
                        sleep(self.policy.delay_after(attempts)).await;
                    }
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| ApiError::Network("no attempt outcome recorded".to_string()));
        let kind = error.kind();
        counters().record_request_failure(call.describe(), kind);

        if kind == ErrorKind::ServerCold {
            if let Some(sink) = &self.cold_sink {
                sink.service_went_cold().await;
            }
        }

        Err(RequestError::new(kind, attempts, error.to_string()))
    }
}
