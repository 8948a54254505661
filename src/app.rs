use crate::auth::StaticTokenSource;
use crate::client::api::{CompareCall, PredictCall, PredictionClient, TeamsCall};
use crate::client::model::{
    ComparisonRequest, ComparisonResponse, PredictionRequest, PredictionResponse, TeamDirectory,
};
use crate::client::retrier::{ErrorKind, RequestError, RequestRetrier};
use crate::config::CourtsideConfig;
use crate::error::{Context, Result};
use crate::readiness::probe::HttpHealthProbe;
use crate::readiness::state::{ProbeOutcome, ReadinessStatus};
use crate::readiness::{ReadinessController, ReadinessSnapshot};
use std::sync::Arc;
use url::Url;

/// Composition root: the shared HTTP client, the readiness controller and
/// the request retrier, wired so SERVER_COLD outcomes reset readiness.
pub struct CourtsideApp {
    client: PredictionClient,
    readiness: ReadinessController,
    retrier: RequestRetrier,
}

impl CourtsideApp {
    pub fn initialise(config: &CourtsideConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.service.base_url).context("invalid service base URL")?;
        let http = reqwest::Client::builder()
            .user_agent(&config.service.user_agent)
            .timeout(config.service.request_timeout)
            .build()
            .context("failed to construct HTTP client")?;

        let probe = Arc::new(HttpHealthProbe::new(
            http.clone(),
            &base_url,
            &config.service.ready_token,
        )?);
        let readiness = ReadinessController::new(
            probe,
            config.probe.policy(),
            config.probe.jitter,
            config.probe.timeout,
            config.probe.keep_alive,
        );

        let mut client = PredictionClient::new(http, &base_url)?;
        if let Some(token) = &config.auth.bearer_token {
            client = client.with_token_source(Arc::new(StaticTokenSource::new(token.clone())));
        }

        let retrier = RequestRetrier::new(config.request.policy())
            .with_cold_sink(Arc::new(readiness.clone()));

        Ok(Self {
            client,
            readiness,
            retrier,
        })
    }

    pub fn readiness(&self) -> &ReadinessController {
        &self.readiness
    }

    pub async fn predict(
        &self,
        request: PredictionRequest,
    ) -> std::result::Result<PredictionResponse, RequestError> {
        // Validation errors surface before any probing happens.
        if let Err(reason) = request.validate() {
            return Err(RequestError::new(ErrorKind::Validation, 0, reason));
        }
        self.ensure_ready().await?;
        self.retrier
            .execute(&PredictCall {
                client: self.client.clone(),
                request,
            })
            .await
    }

    pub async fn compare(
        &self,
        request: ComparisonRequest,
    ) -> std::result::Result<ComparisonResponse, RequestError> {
        if let Err(reason) = request.validate() {
            return Err(RequestError::new(ErrorKind::Validation, 0, reason));
        }
        self.ensure_ready().await?;
        self.retrier
            .execute(&CompareCall {
                client: self.client.clone(),
                request,
            })
            .await
    }

    pub async fn teams(&self) -> std::result::Result<TeamDirectory, RequestError> {
        self.ensure_ready().await?;
        self.retrier
            .execute(&TeamsCall {
                client: self.client.clone(),
            })
            .await
    }

    /// Runs the readiness cycle to a settled state and reports it.
    pub async fn probe_status(&self) -> ReadinessSnapshot {
        self.readiness.start().await;
        self.readiness.wait_until_settled().await
    }

    pub fn shutdown(&self) {
        self.readiness.shutdown();
    }

    async fn ensure_ready(&self) -> std::result::Result<(), RequestError> {
        self.readiness.start().await;
        let snapshot = self.readiness.wait_until_settled().await;
        match snapshot.status {
            ReadinessStatus::Ready => Ok(()),
            status => {
                let kind = match snapshot.last_outcome {
                    Some(ProbeOutcome::Timeout) => ErrorKind::Timeout,
                    Some(ProbeOutcome::BadStatus) => ErrorKind::ServerCold,
                    _ => ErrorKind::Network,
                };
                Err(RequestError::new(
                    kind,
                    snapshot.attempts,
                    format!(
                        "service did not become ready (status {status} after {} probe attempts)",
                        snapshot.attempts
                    ),
                ))
            }
        }
    }
}
