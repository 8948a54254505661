use crate::backoff::{JitterMode, RetryPolicy};
use crate::client::retrier::RequestPolicy;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config/local";
const ENV_PREFIX: &str = "COURTSIDE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourtsideConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ready_token")]
    pub ready_token: String,
    #[serde(default = "default_request_timeout", deserialize_with = "duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ready_token: default_ready_token(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_probe_base_delay", deserialize_with = "duration")]
    pub base_delay: Duration,
    #[serde(default = "default_probe_max_delay", deserialize_with = "duration")]
    pub max_delay: Duration,
    #[serde(default = "default_probe_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub jitter: JitterMode,
    #[serde(default = "default_probe_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
    #[serde(default = "default_keep_alive", deserialize_with = "duration")]
    pub keep_alive: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_probe_attempts(),
            base_delay: default_probe_base_delay(),
            max_delay: default_probe_max_delay(),
            multiplier: default_probe_multiplier(),
            jitter: JitterMode::default(),
            timeout: default_probe_timeout(),
            keep_alive: default_keep_alive(),
        }
    }
}

impl ProbeConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.base_delay,
            self.max_delay,
            self.multiplier,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_request_base_delay", deserialize_with = "duration")]
    pub base_delay: Duration,
    #[serde(default = "default_attempt_timeout", deserialize_with = "duration")]
    pub attempt_timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_request_attempts(),
            base_delay: default_request_base_delay(),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

impl RequestConfig {
    pub fn policy(&self) -> RequestPolicy {
        RequestPolicy::new(self.max_attempts, self.base_delay, self.attempt_timeout)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl CourtsideConfig {
    /// Loads an optional YAML file layered under `COURTSIDE`-prefixed
    /// environment variables. An explicit path must exist; the default
    /// path is optional.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let builder = match path {
            Some(path) => Config::builder().add_source(File::with_name(path)),
            None => {
                Config::builder().add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false))
            }
        };

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.service.base_url)
            .map_err(|err| invalid("service.base_url", err.to_string()))?;
        if self.service.ready_token.is_empty() {
            return Err(invalid("service.ready_token", "must not be empty"));
        }
        if self.probe.max_attempts == 0 {
            return Err(invalid("probe.max_attempts", "must be at least 1"));
        }
        if self.probe.multiplier <= 1.0 {
            return Err(invalid("probe.multiplier", "must be greater than 1"));
        }
        if self.probe.base_delay.is_zero() {
            return Err(invalid("probe.base_delay", "must be positive"));
        }
        if self.probe.max_delay < self.probe.base_delay {
            return Err(invalid("probe.max_delay", "must be at least base_delay"));
        }
        if self.probe.timeout.is_zero() {
            return Err(invalid("probe.timeout", "must be positive"));
        }
        if self.probe.keep_alive.is_zero() {
            return Err(invalid("probe.keep_alive", "must be positive"));
        }
        if self.request.max_attempts == 0 {
            return Err(invalid("request.max_attempts", "must be at least 1"));
        }
        if self.request.base_delay.is_zero() {
            return Err(invalid("request.base_delay", "must be positive"));
        }
        if self.request.attempt_timeout.is_zero() {
            return Err(invalid("request.attempt_timeout", "must be positive"));
        }
        Ok(())
    }
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    humantime::parse_duration(&value).map_err(serde::de::Error::custom)
}

fn default_base_url() -> String {
    "https://the-bench-prophet.onrender.com".to_string()
}

fn default_ready_token() -> String {
    "operational".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("courtside/{}", env!("CARGO_PKG_VERSION"))
}

fn default_probe_attempts() -> u32 {
    8
}

fn default_probe_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_probe_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_multiplier() -> f64 {
    2.0
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(240)
}

fn default_request_attempts() -> u32 {
    3
}

fn default_request_base_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(10)
}
