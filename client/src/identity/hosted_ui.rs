//! Redirect-based sign-in against a Cognito-style hosted UI.
//!
//! FLOW
//! ====
//! 1. `federated_sign_in` stores a random `state` and redirects the page to
//!    `/oauth2/authorize`.
//! 2. The hosted UI redirects back to `redirect_sign_in` with either
//!    `?code=..&state=..` (code flow) or `#id_token=..&access_token=..`
//!    (implicit flow), or `?error=..` on failure.
//! 3. `complete_sign_in` redeems the response, persists the tokens, and
//!    broadcasts `signIn` (or `signIn_failure`) on the auth channel.
//!
//! Expired sessions are refreshed with the `refresh_token` grant on demand.

#[cfg(test)]
#[path = "hosted_ui_test.rs"]
mod hosted_ui_test;

use std::collections::HashMap;
use std::rc::Rc;

use appsync::HostedUiConfig;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;
use url::form_urlencoded;

use super::hub::{self, AUTH_CHANNEL, Hub, HubPayload};
use super::jwt::decode_claims;
use super::storage::TokenStore;
use super::{IdentityError, IdentityProvider, Session, User};
use crate::net::transport::{HttpRequest, HttpTransport};

pub const TOKENS_KEY: &str = "eventboard.tokens";
pub const STATE_KEY: &str = "eventboard.oauth_state";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Page navigation used by the redirect flow.
pub trait Navigator {
    /// Leave the app for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Navigation`] if the browser refuses.
    fn redirect(&self, url: &str) -> Result<(), IdentityError>;

    /// Rewrite the address bar without reloading, dropping OAuth parameters.
    fn replace_history(&self, url: &str);
}

/// Token endpoint success body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

/// What the hosted UI sent back on the redirect.
#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Error { error: String, description: Option<String> },
    Code { code: String, state: Option<String> },
    Implicit { params: HashMap<String, String> },
}

impl Redirect {
    fn parse(current_url: &str) -> Option<Self> {
        let url = Url::parse(current_url).ok()?;
        let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        if let Some(fragment) = url.fragment() {
            params.extend(form_urlencoded::parse(fragment.as_bytes()).into_owned());
        }

        if let Some(error) = params.remove("error") {
            return Some(Self::Error { error, description: params.remove("error_description") });
        }
        if let Some(code) = params.remove("code") {
            return Some(Self::Code { code, state: params.remove("state") });
        }
        if params.contains_key("access_token") {
            return Some(Self::Implicit { params });
        }
        None
    }
}

pub struct HostedUi {
    config: HostedUiConfig,
    http: Rc<dyn HttpTransport>,
    store: Rc<dyn TokenStore>,
    navigator: Rc<dyn Navigator>,
    hub: Hub,
    clock: fn() -> i64,
}

impl HostedUi {
    pub fn new(
        config: HostedUiConfig,
        http: Rc<dyn HttpTransport>,
        store: Rc<dyn TokenStore>,
        navigator: Rc<dyn Navigator>,
        hub: Hub,
    ) -> Self {
        Self { config, http, store, navigator, hub, clock: crate::util::clock::now_secs }
    }

    /// Replace the wall clock, in unix seconds.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("identity_provider", "COGNITO")
            .append_pair("redirect_uri", &self.config.redirect_sign_in)
            .append_pair("response_type", self.config.response_type.as_str())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .finish();
        format!("{}/oauth2/authorize?{query}", self.config.base_url())
    }

    #[must_use]
    pub fn logout_url(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("logout_uri", &self.config.redirect_sign_out)
            .finish();
        format!("{}/logout?{query}", self.config.base_url())
    }

    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.config.base_url())
    }

    fn load_session(&self) -> Option<Session> {
        let raw = self.store.load(TOKENS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                leptos::logging::warn!("discarding unreadable stored tokens: {e}");
                self.store.remove(TOKENS_KEY);
                None
            }
        }
    }

    fn save_session(&self, session: &Session) -> Result<(), IdentityError> {
        let raw = serde_json::to_string(session).map_err(|e| IdentityError::Storage(e.to_string()))?;
        self.store.save(TOKENS_KEY, &raw)
    }

    fn check_state(&self, returned: Option<&str>) -> Result<(), IdentityError> {
        let expected = self.store.load(STATE_KEY);
        self.store.remove(STATE_KEY);
        match (expected.as_deref(), returned) {
            (Some(expected), Some(returned)) if expected == returned => Ok(()),
            _ => Err(IdentityError::StateMismatch),
        }
    }

    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<Session, IdentityError> {
        let body = form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish();
        let request = HttpRequest::new(self.token_url(), body).header("Content-Type", FORM_CONTENT_TYPE);
        let resp = self
            .http
            .post(request)
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        if !resp.is_success() {
            return Err(IdentityError::TokenEndpoint { status: resp.status, body: resp.body });
        }
        let tokens: TokenResponse =
            serde_json::from_str(&resp.body).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        Ok(Session {
            id_token: tokens.id_token,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: (self.clock)().saturating_add(tokens.expires_in),
        })
    }

    async fn redeem(&self, redirect: Redirect) -> Result<Session, IdentityError> {
        match redirect {
            Redirect::Error { error, description } => Err(IdentityError::OAuth { error, description }),
            Redirect::Code { code, state } => {
                self.check_state(state.as_deref())?;
                self.token_grant(&[
                    ("grant_type", "authorization_code"),
                    ("client_id", &self.config.client_id),
                    ("code", &code),
                    ("redirect_uri", &self.config.redirect_sign_in),
                ])
                .await
            }
            Redirect::Implicit { mut params } => {
                self.check_state(params.get("state").map(String::as_str))?;
                let missing = |field: &str| IdentityError::InvalidToken(format!("redirect is missing {field}"));
                let id_token = params.remove("id_token").ok_or_else(|| missing("id_token"))?;
                let access_token = params.remove("access_token").ok_or_else(|| missing("access_token"))?;
                let expires_in = params
                    .get("expires_in")
                    .and_then(|v| v.parse::<i64>().ok())
                    .ok_or_else(|| missing("expires_in"))?;
                Ok(Session {
                    id_token,
                    access_token,
                    refresh_token: None,
                    expires_at: (self.clock)().saturating_add(expires_in),
                })
            }
        }
    }

    fn clear(&self) {
        self.store.remove(TOKENS_KEY);
    }
}

#[async_trait(?Send)]
impl IdentityProvider for HostedUi {
    async fn current_authenticated_user(&self) -> Result<Option<User>, IdentityError> {
        let session = self.current_session().await?;
        let claims = decode_claims(&session.id_token)?;
        Ok(Some(User::from(claims)))
    }

    async fn current_session(&self) -> Result<Session, IdentityError> {
        let session = self.load_session().ok_or(IdentityError::NotAuthenticated)?;
        if session.is_valid_at((self.clock)()) {
            return Ok(session);
        }

        let Some(refresh_token) = session.refresh_token else {
            self.clear();
            return Err(IdentityError::NotAuthenticated);
        };
        let refreshed = self
            .token_grant(&[
                ("grant_type", "refresh_token"),
                ("client_id", &self.config.client_id),
                ("refresh_token", &refresh_token),
            ])
            .await;
        match refreshed {
            Ok(mut fresh) => {
                // The refresh grant does not rotate the refresh token.
                if fresh.refresh_token.is_none() {
                    fresh.refresh_token = Some(refresh_token);
                }
                self.save_session(&fresh)?;
                Ok(fresh)
            }
            Err(IdentityError::TokenEndpoint { status, .. }) => {
                leptos::logging::warn!("token refresh rejected with status {status}; clearing session");
                self.clear();
                Err(IdentityError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }

    fn federated_sign_in(&self) -> Result<(), IdentityError> {
        let state = uuid::Uuid::new_v4().simple().to_string();
        self.store.save(STATE_KEY, &state)?;
        self.navigator.redirect(&self.authorize_url(&state))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.clear();
        self.hub.dispatch(AUTH_CHANNEL, &HubPayload::new(hub::SIGN_OUT));
        self.navigator.redirect(&self.logout_url())
    }

    async fn complete_sign_in(&self, current_url: &str) -> Result<bool, IdentityError> {
        let Some(redirect) = Redirect::parse(current_url) else {
            return Ok(false);
        };
        self.navigator.replace_history(&self.config.redirect_sign_in);

        let outcome = match self.redeem(redirect).await {
            Ok(session) => self.save_session(&session).and_then(|()| decode_claims(&session.id_token)),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(claims) => {
                let user = User::from(claims);
                let payload =
                    HubPayload::new(hub::SIGN_IN).with_data(serde_json::json!({ "username": user.username }));
                self.hub.dispatch(AUTH_CHANNEL, &payload);
                Ok(true)
            }
            Err(e) => {
                self.clear();
                let payload = HubPayload::new(hub::SIGN_IN_FAILURE).with_message(e.to_string());
                self.hub.dispatch(AUTH_CHANNEL, &payload);
                Err(e)
            }
        }
    }
}
