//! Identity provider abstraction and the hosted-UI implementation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth session only talks to [`IdentityProvider`]. Lifecycle events
//! (`signIn`, `signOut`, `signIn_failure`) are broadcast on the [`hub::Hub`]
//! `auth` channel so listeners react without holding a provider reference.

pub mod hosted_ui;
pub mod hub;
pub mod jwt;
pub mod storage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use hosted_ui::{HostedUi, Navigator};
pub use hub::{AUTH_CHANNEL, Hub, HubPayload, ListenerHandle};

/// Signed-in user as exposed to the view layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub sub: Option<String>,
    pub email: Option<String>,
}

impl User {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), sub: None, email: None }
    }
}

/// Tokens for the current user pool session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds after which the tokens are no longer accepted.
    pub expires_at: i64,
}

impl Session {
    /// Tokens are treated as expired slightly early so in-flight requests
    /// don't race the deadline.
    #[must_use]
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at.saturating_sub(EXPIRY_SKEW_SECS) > now
    }
}

pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Errors surfaced by identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("the user is not authenticated")]
    NotAuthenticated,
    #[error("sign-in is not configured")]
    NotConfigured,
    #[error("oauth error: {error}")]
    OAuth { error: String, description: Option<String> },
    #[error("oauth state mismatch")]
    StateMismatch,
    #[error("token endpoint returned status {status}")]
    TokenEndpoint { status: u16, body: String },
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("token storage failed: {0}")]
    Storage(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// The operations the client needs from an identity provider.
#[async_trait(?Send)]
pub trait IdentityProvider {
    /// Resolve the signed-in user, `Ok(None)` when the provider positively
    /// knows nobody is signed in, or an error (including "not authenticated").
    async fn current_authenticated_user(&self) -> Result<Option<User>, IdentityError>;

    /// Current tokens, refreshed when expired.
    async fn current_session(&self) -> Result<Session, IdentityError>;

    /// Start the redirect-based sign-in flow.
    fn federated_sign_in(&self) -> Result<(), IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Finish a sign-in redirect if `current_url` is one.
    ///
    /// Returns `Ok(true)` when the URL carried an OAuth response.
    async fn complete_sign_in(&self, current_url: &str) -> Result<bool, IdentityError> {
        let _ = current_url;
        Ok(false)
    }
}

/// Provider used when no hosted UI is configured: nobody can sign in.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledIdentity;

#[async_trait(?Send)]
impl IdentityProvider for DisabledIdentity {
    async fn current_authenticated_user(&self) -> Result<Option<User>, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn current_session(&self) -> Result<Session, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    fn federated_sign_in(&self) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}
