use async_trait::async_trait;
use thiserror::Error;

/// The identity provider's message, surfaced verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct AuthError(pub String);

/// Opaque seam to the external identity provider. Sign-in, sign-up and
/// session lifecycle stay with the provider; the client only consumes
/// tokens for outbound requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current bearer token, `None` when requests go unauthenticated.
    async fn bearer_token(&self) -> Result<Option<String>, AuthError>;
}

/// Fixed token handed in through configuration.
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn bearer_token(&self) -> Result<Option<String>, AuthError> {
        Ok(Some(self.token.clone()))
    }
}
