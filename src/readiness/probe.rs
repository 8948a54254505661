use crate::error::Result;
use crate::readiness::state::ProbeOutcome;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

/// One bounded-time readiness check. Implementations issue a single call
/// and classify it; retries belong to the caller.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, timeout: Duration) -> ProbeOutcome;
}

/// Probes `GET <base>/api/health` and compares the `status` field of the
/// JSON body against the configured ready token.
pub struct HttpHealthProbe {
    client: Client,
    endpoint: Url,
    ready_token: String,
}

impl HttpHealthProbe {
    pub fn new(client: Client, base_url: &Url, ready_token: impl Into<String>) -> Result<Self> {
        let endpoint = base_url.join("api/health")?;
        Ok(Self {
            client,
            endpoint,
            ready_token: ready_token.into(),
        })
    }

    async fn classify(&self) -> ProbeOutcome {
        let response = match self.client.get(self.endpoint.clone()).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return ProbeOutcome::Timeout,
            Err(_) => return ProbeOutcome::NetworkError,
        };

        if !response.status().is_success() {
            return ProbeOutcome::BadStatus;
        }

        let body: JsonValue = match response.json().await {
            Ok(body) => body,
            Err(err) if err.is_timeout() => return ProbeOutcome::Timeout,
            Err(_) => return ProbeOutcome::BadStatus,
        };

        match body.get("status").and_then(JsonValue::as_str) {
            Some(token) if token == self.ready_token => ProbeOutcome::Success,
            _ => ProbeOutcome::BadStatus,
        }
    }
}

#[async_trait]
impl HealthCheck for HttpHealthProbe {
    async fn check(&self, timeout: Duration) -> ProbeOutcome {
        let outcome = match tokio::time::timeout(timeout, self.classify()).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::Timeout,
        };
        tracing::debug!(
            endpoint = %self.endpoint,
            outcome = outcome.as_str(),
            "health probe"
        );
        outcome
    }
}
