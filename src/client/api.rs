use crate::auth::TokenSource;
use crate::client::model::{
    ComparisonRequest, ComparisonResponse, ErrorBody, PredictionRequest, PredictionResponse,
    TeamDirectory,
};
use crate::client::retrier::{ErrorKind, RetryableCall};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Classified failure of a single wire attempt. The retrier maps these to
/// the request-error taxonomy; nothing here escapes unclassified.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("service is cold-starting (HTTP {status})")]
    ColdStart { status: u16 },
    #[error("service error (HTTP {status}): {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("{0}")]
    Auth(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Timeout => ErrorKind::Timeout,
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::ColdStart { .. } => ErrorKind::ServerCold,
            ApiError::Status { .. } | ApiError::Decode(_) => ErrorKind::ServerError,
            ApiError::Auth(_) => ErrorKind::Auth,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Typed calls against the prediction service. Endpoint URLs are resolved
/// once at construction so individual calls cannot fail on URL assembly.
#[derive(Clone)]
pub struct PredictionClient {
    http: Client,
    predict_url: Url,
    compare_url: Url,
    teams_url: Url,
    auth: Option<Arc<dyn TokenSource>>,
}

impl PredictionClient {
    pub fn new(http: Client, base_url: &Url) -> Result<Self> {
        Ok(Self {
            http,
            predict_url: base_url.join("api/predict-teams")?,
            compare_url: base_url.join("api/compare-teams")?,
            teams_url: base_url.join("api/teams")?,
            auth: None,
        })
    }

    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.auth = Some(source);
        self
    }

    pub async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> std::result::Result<PredictionResponse, ApiError> {
        let builder = self.http.post(self.predict_url.clone()).json(request);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn compare(
        &self,
        request: &ComparisonRequest,
    ) -> std::result::Result<ComparisonResponse, ApiError> {
        let builder = self.http.get(self.compare_url.clone()).query(&[
            ("team1", request.team1.as_str()),
            ("team2", request.team2.as_str()),
            ("season", request.season.as_str()),
        ]);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn teams(&self) -> std::result::Result<TeamDirectory, ApiError> {
        let builder = self.http.get(self.teams_url.clone());
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    async fn send(&self, builder: RequestBuilder) -> std::result::Result<Response, ApiError> {
        let builder = self.authorize(builder).await?;
        let response = builder.send().await.map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ApiError::ColdStart {
                status: status.as_u16(),
            });
        }

        let message = Self::error_message(response).await;
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn authorize(
        &self,
        builder: RequestBuilder,
    ) -> std::result::Result<RequestBuilder, ApiError> {
        let Some(source) = &self.auth else {
            return Ok(builder);
        };
        match source.bearer_token().await {
            Ok(Some(token)) => Ok(builder.bearer_auth(token)),
            Ok(None) => Ok(builder),
            Err(err) => Err(ApiError::Auth(err.to_string())),
        }
    }

    async fn error_message(response: Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => body.message(),
            Err(_) => format!("HTTP {status}"),
        }
    }

    async fn decode<T>(response: Response) -> std::result::Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        response.json().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::Timeout
            } else if err.is_decode() {
                ApiError::Decode(err.to_string())
            } else {
                ApiError::Network(err.to_string())
            }
        })
    }
}

pub struct PredictCall {
    pub client: PredictionClient,
    pub request: PredictionRequest,
}

#[async_trait]
impl RetryableCall for PredictCall {
    type Output = PredictionResponse;

    fn describe(&self) -> &'static str {
        "predict"
    }

    fn validate(&self) -> std::result::Result<(), String> {
        self.request.validate()
    }

    async fn attempt(&self) -> std::result::Result<Self::Output, ApiError> {
        self.client.predict(&self.request).await
    }
}

pub struct CompareCall {
    pub client: PredictionClient,
    pub request: ComparisonRequest,
}

#[async_trait]
impl RetryableCall for CompareCall {
    type Output = ComparisonResponse;

    fn describe(&self) -> &'static str {
        "compare"
    }

    fn validate(&self) -> std::result::Result<(), String> {
        self.request.validate()
    }

    async fn attempt(&self) -> std::result::Result<Self::Output, ApiError> {
        self.client.compare(&self.request).await
    }
}

pub struct TeamsCall {
    pub client: PredictionClient,
}

#[async_trait]
impl RetryableCall for TeamsCall {
    type Output = TeamDirectory;

    fn describe(&self) -> &'static str {
        "teams"
    }

    async fn attempt(&self) -> std::result::Result<Self::Output, ApiError> {
        self.client.teams().await
    }
}
