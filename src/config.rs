//! Host configuration parsed from environment variables.
//!
//! The GraphQL endpoint and identity settings are read once at startup and
//! served read-only to the browser via `/api/config`.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use appsync::config::{default_scopes, parse_scopes};
use appsync::{AuthMode, AuthType, ClientConfig, HostedUiConfig, ResponseType};

pub const DEFAULT_PORT: u16 = 3000;

/// Errors raised while reading host configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    /// A variable is set but cannot be interpreted.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub client: ClientConfig,
}

impl AppConfig {
    /// Build typed host config from environment variables.
    ///
    /// Required:
    /// - `APPSYNC_GRAPHQL_ENDPOINT`, `APPSYNC_REGION`
    /// - `APPSYNC_API_KEY` when the auth type is `API_KEY`
    ///
    /// Optional:
    /// - `APPSYNC_AUTHENTICATION_TYPE`: `API_KEY` (default) or `AMAZON_COGNITO_USER_POOLS`
    /// - `COGNITO_*`: hosted-UI sign-in, enabled only when all of pool id,
    ///   client id, domain and both redirects are set
    /// - `COGNITO_OAUTH_SCOPES`: default `openid email profile`
    /// - `COGNITO_OAUTH_RESPONSE_TYPE`: `code` (default) or `token`
    /// - `PORT`: default 3000
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing { var: key });

        let graphql_endpoint = require("APPSYNC_GRAPHQL_ENDPOINT")?;
        if !graphql_endpoint.starts_with("https://") && !graphql_endpoint.starts_with("http://") {
            return Err(ConfigError::Invalid {
                var: "APPSYNC_GRAPHQL_ENDPOINT",
                reason: "must be an absolute http(s) URL".to_owned(),
            });
        }
        let region = require("APPSYNC_REGION")?;

        let auth_type = match get("APPSYNC_AUTHENTICATION_TYPE") {
            Some(raw) => raw.parse::<AuthType>().map_err(|e| ConfigError::Invalid {
                var: "APPSYNC_AUTHENTICATION_TYPE",
                reason: e.to_string(),
            })?,
            None => AuthType::ApiKey,
        };
        let auth = match auth_type {
            AuthType::ApiKey => AuthMode::ApiKey { api_key: require("APPSYNC_API_KEY")? },
            AuthType::AmazonCognitoUserPools => AuthMode::AmazonCognitoUserPools,
        };

        let identity = parse_hosted_ui(&get)?;
        if identity.is_none() && auth_type == AuthType::AmazonCognitoUserPools {
            return Err(ConfigError::Missing { var: "COGNITO_USER_POOL_WEB_CLIENT_ID" });
        }

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid { var: "PORT", reason: e.to_string() })?,
            None => DEFAULT_PORT,
        };

        Ok(Self { port, client: ClientConfig { graphql_endpoint, region, auth, identity } })
    }
}

fn parse_hosted_ui<G>(get: &G) -> Result<Option<HostedUiConfig>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let (Some(user_pool_id), Some(client_id), Some(domain), Some(redirect_sign_in), Some(redirect_sign_out)) = (
        get("COGNITO_USER_POOL_ID"),
        get("COGNITO_USER_POOL_WEB_CLIENT_ID"),
        get("COGNITO_OAUTH_DOMAIN"),
        get("COGNITO_REDIRECT_SIGN_IN"),
        get("COGNITO_REDIRECT_SIGN_OUT"),
    ) else {
        return Ok(None);
    };

    let scopes = get("COGNITO_OAUTH_SCOPES")
        .map(|raw| parse_scopes(&raw))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_scopes);
    let response_type = match get("COGNITO_OAUTH_RESPONSE_TYPE") {
        Some(raw) => raw.parse::<ResponseType>().map_err(|e| ConfigError::Invalid {
            var: "COGNITO_OAUTH_RESPONSE_TYPE",
            reason: e.to_string(),
        })?,
        None => ResponseType::default(),
    };

    Ok(Some(HostedUiConfig {
        user_pool_id,
        client_id,
        domain,
        redirect_sign_in,
        redirect_sign_out,
        scopes,
        response_type,
    }))
}
