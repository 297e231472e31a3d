//! Builds the two-stage pipeline from client configuration.

#[cfg(test)]
#[path = "compose_test.rs"]
mod compose_test;

use std::rc::Rc;

use appsync::{AuthMode, ClientConfig};

use super::auth_link::{AuthLink, Credentials, TokenProvider};
use super::handshake_link::SubscriptionHandshakeLink;
use super::link::{Link, LinkChain, LinkError};
use super::transport::{HttpTransport, RealtimeTransport};

/// Compose `AuthLink` then `SubscriptionHandshakeLink`.
///
/// `tokens` supplies bearer tokens for user-pool auth and is ignored for
/// API-key auth.
///
/// # Errors
///
/// Returns [`LinkError::Protocol`] if the endpoint has no host, or
/// [`LinkError::Auth`] if user-pool auth is configured without `tokens`.
pub fn compose(
    config: &ClientConfig,
    tokens: Option<Rc<dyn TokenProvider>>,
    http: Rc<dyn HttpTransport>,
    realtime: Rc<dyn RealtimeTransport>,
) -> Result<LinkChain, LinkError> {
    let host = config.endpoint_host()?;
    let credentials = match &config.auth {
        AuthMode::ApiKey { api_key } => Credentials::ApiKey(api_key.clone()),
        AuthMode::AmazonCognitoUserPools => Credentials::Token(
            tokens.ok_or_else(|| LinkError::Auth("user pool auth needs a token provider".to_owned()))?,
        ),
    };

    let links: Vec<Rc<dyn Link>> = vec![
        Rc::new(AuthLink::new(host, credentials)),
        Rc::new(SubscriptionHandshakeLink::new(config.graphql_endpoint.clone(), http, realtime)),
    ];
    Ok(LinkChain::from(links))
}
