//! Credential stage: stamps each operation with the endpoint's auth headers.

#[cfg(test)]
#[path = "auth_link_test.rs"]
mod auth_link_test;

use std::rc::Rc;

use async_trait::async_trait;

use super::link::{Link, LinkError, Next, Operation, ResponseStream};
use crate::identity::IdentityProvider;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Source of a bearer token, asked once per operation.
#[async_trait(?Send)]
pub trait TokenProvider {
    async fn token(&self) -> Result<String, LinkError>;
}

/// Reads the access token from the identity provider's current session,
/// refreshing it when expired.
pub struct SessionTokens {
    identity: Rc<dyn IdentityProvider>,
}

impl SessionTokens {
    pub fn new(identity: Rc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

#[async_trait(?Send)]
impl TokenProvider for SessionTokens {
    async fn token(&self) -> Result<String, LinkError> {
        let session = self
            .identity
            .current_session()
            .await
            .map_err(|e| LinkError::Auth(e.to_string()))?;
        Ok(session.access_token)
    }
}

#[derive(Clone)]
pub enum Credentials {
    ApiKey(String),
    Token(Rc<dyn TokenProvider>),
}

pub struct AuthLink {
    host: String,
    credentials: Credentials,
}

impl AuthLink {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self { host: host.into(), credentials }
    }
}

#[async_trait(?Send)]
impl Link for AuthLink {
    async fn request(&self, mut operation: Operation, next: Next<'_>) -> Result<ResponseStream, LinkError> {
        let (name, value) = match &self.credentials {
            Credentials::ApiKey(key) => (API_KEY_HEADER, key.clone()),
            Credentials::Token(provider) => (AUTHORIZATION_HEADER, provider.token().await?),
        };
        let headers = &mut operation.context.headers;
        headers.insert("host".to_owned(), self.host.clone());
        headers.insert(name.to_owned(), value);
        next.run(operation).await
    }
}
