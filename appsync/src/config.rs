//! Client configuration shared by the host server and the browser.
//!
//! The server builds a [`ClientConfig`] from its environment once at startup
//! and serves it as JSON; the browser deserializes the same type before it
//! composes the GraphQL link.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ProtocolError;

pub const DEFAULT_OAUTH_SCOPES: &[&str] = &["openid", "email", "profile"];

/// Everything the browser needs to reach the GraphQL endpoint and sign in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub graphql_endpoint: String,
    pub region: String,
    pub auth: AuthMode,
    /// Hosted-UI settings. `None` disables sign-in entirely.
    #[serde(default)]
    pub identity: Option<HostedUiConfig>,
}

impl ClientConfig {
    /// Host name of the GraphQL endpoint, used as the `host` auth header.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidEndpoint`] if the endpoint is not an
    /// absolute URL with a host.
    pub fn endpoint_host(&self) -> Result<String, ProtocolError> {
        let url = Url::parse(&self.graphql_endpoint).map_err(|e| ProtocolError::InvalidEndpoint {
            endpoint: self.graphql_endpoint.clone(),
            reason: e.to_string(),
        })?;
        url.host_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| ProtocolError::InvalidEndpoint {
                endpoint: self.graphql_endpoint.clone(),
                reason: "missing host".to_owned(),
            })
    }
}

/// How outgoing operations are authorized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthMode {
    /// Static API key sent as `x-api-key`.
    ApiKey { api_key: String },
    /// User-pool JWT sent as `Authorization`, fetched per request.
    AmazonCognitoUserPools,
}

impl AuthMode {
    #[must_use]
    pub fn auth_type(&self) -> AuthType {
        match self {
            Self::ApiKey { .. } => AuthType::ApiKey,
            Self::AmazonCognitoUserPools => AuthType::AmazonCognitoUserPools,
        }
    }
}

/// Payload-free discriminant of [`AuthMode`], as spelled in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    ApiKey,
    AmazonCognitoUserPools,
}

impl FromStr for AuthType {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "API_KEY" => Ok(Self::ApiKey),
            "AMAZON_COGNITO_USER_POOLS" => Ok(Self::AmazonCognitoUserPools),
            other => Err(ProtocolError::UnknownValue { field: "auth type", value: other.to_owned() }),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ApiKey => "API_KEY",
            Self::AmazonCognitoUserPools => "AMAZON_COGNITO_USER_POOLS",
        })
    }
}

/// OAuth flow used by the hosted sign-in page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Authorization code, exchanged at the token endpoint.
    #[default]
    Code,
    /// Implicit grant, tokens returned in the redirect fragment.
    Token,
}

impl ResponseType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
        }
    }
}

impl FromStr for ResponseType {
    type Err = ProtocolError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "code" => Ok(Self::Code),
            "token" => Ok(Self::Token),
            other => Err(ProtocolError::UnknownValue { field: "oauth response type", value: other.to_owned() }),
        }
    }
}

/// Cognito hosted-UI settings for redirect-based sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedUiConfig {
    pub user_pool_id: String,
    pub client_id: String,
    /// Hosted-UI domain without scheme, e.g. `example.auth.us-east-1.amazoncognito.com`.
    pub domain: String,
    pub redirect_sign_in: String,
    pub redirect_sign_out: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub response_type: ResponseType,
}

impl HostedUiConfig {
    /// `https://{domain}` with any scheme or trailing slash in `domain` normalized away.
    #[must_use]
    pub fn base_url(&self) -> String {
        let domain = self
            .domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{domain}")
    }
}

/// Split a scope list on spaces and commas, dropping empties.
#[must_use]
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Scopes requested when none are configured.
#[must_use]
pub fn default_scopes() -> Vec<String> {
    DEFAULT_OAUTH_SCOPES.iter().map(|s| (*s).to_owned()).collect()
}
