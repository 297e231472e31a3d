//! Service wiring: one identity provider, auth session and GraphQL client
//! per page, built from the configuration the host serves.
//!
//! [`build`] takes every platform dependency as a trait object so the whole
//! graph can be assembled natively in tests. [`Services`] stores the result
//! in the reactive arena so components receive it as `Copy` props.

#[cfg(test)]
#[path = "services_test.rs"]
mod services_test;

use std::rc::Rc;

use appsync::ClientConfig;
use futures::task::LocalSpawn;
use leptos::prelude::*;

use crate::graphql::{CacheConfig, GraphqlClient, InMemoryCache};
use crate::identity::storage::TokenStore;
use crate::identity::{DisabledIdentity, HostedUi, Hub, IdentityProvider, Navigator};
use crate::net::auth_link::{SessionTokens, TokenProvider};
use crate::net::compose;
use crate::net::link::LinkError;
use crate::net::transport::{HttpTransport, RealtimeTransport, TransportError};
use crate::state::session::AuthSession;

/// Platform dependencies of the service graph.
pub struct Platform {
    pub http: Rc<dyn HttpTransport>,
    pub realtime: Rc<dyn RealtimeTransport>,
    pub store: Rc<dyn TokenStore>,
    pub navigator: Rc<dyn Navigator>,
    pub spawner: Rc<dyn LocalSpawn>,
}

impl Platform {
    /// Browser transports, `localStorage` and the Leptos executor.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Request`] outside `hydrate` builds.
    pub fn browser() -> Result<Self, TransportError> {
        #[cfg(feature = "hydrate")]
        {
            use crate::identity::storage::LocalStorageTokenStore;
            use crate::net::gloo::{GlooHttp, GlooRealtime};
            use crate::util::browser::BrowserNavigator;
            use crate::util::spawn::LeptosSpawner;

            Ok(Self {
                http: Rc::new(GlooHttp),
                realtime: Rc::new(GlooRealtime),
                store: Rc::new(LocalStorageTokenStore),
                navigator: Rc::new(BrowserNavigator),
                spawner: Rc::new(LeptosSpawner),
            })
        }
        #[cfg(not(feature = "hydrate"))]
        {
            Err(TransportError::Request("browser transports exist only in hydrate builds".to_owned()))
        }
    }
}

/// The assembled service graph.
#[derive(Clone)]
pub struct Core {
    pub client: GraphqlClient,
    pub session: AuthSession,
    pub identity: Rc<dyn IdentityProvider>,
    pub sign_in_enabled: bool,
}

/// Build the service graph for `config`.
///
/// # Errors
///
/// Returns [`LinkError`] if the GraphQL pipeline cannot be composed.
pub fn build(config: &ClientConfig, platform: Platform) -> Result<Core, LinkError> {
    let Platform { http, realtime, store, navigator, spawner } = platform;
    let hub = Hub::new();

    let identity: Rc<dyn IdentityProvider> = match &config.identity {
        Some(hosted) => Rc::new(HostedUi::new(hosted.clone(), Rc::clone(&http), store, navigator, hub.clone())),
        None => Rc::new(DisabledIdentity),
    };

    let tokens: Rc<dyn TokenProvider> = Rc::new(SessionTokens::new(Rc::clone(&identity)));
    let link = compose(config, Some(tokens), http, realtime)?;
    // Results are keyed without type names, matching what the endpoint returns.
    let cache = InMemoryCache::new(CacheConfig { add_typename: false, identify: None });
    let client = GraphqlClient::new(link, cache);

    let session = AuthSession::new(Rc::clone(&identity), hub, spawner);
    Ok(Core { client, session, identity, sign_in_enabled: config.identity.is_some() })
}

/// [`Core`] parked in the reactive arena.
#[derive(Clone, Copy)]
pub struct Services {
    pub client: StoredValue<GraphqlClient, LocalStorage>,
    pub session: StoredValue<AuthSession, LocalStorage>,
    pub identity: StoredValue<Rc<dyn IdentityProvider>, LocalStorage>,
    pub sign_in_enabled: bool,
}

impl Services {
    /// Build the browser service graph.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] if the platform or pipeline is unavailable.
    pub fn start(config: &ClientConfig) -> Result<Self, LinkError> {
        let core = build(config, Platform::browser()?)?;
        Ok(Self::from_core(core))
    }

    pub fn from_core(core: Core) -> Self {
        Self {
            client: StoredValue::new_local(core.client),
            session: StoredValue::new_local(core.session),
            identity: StoredValue::new_local(core.identity),
            sign_in_enabled: core.sign_in_enabled,
        }
    }
}

/// Fetch the client configuration from `/api/config`.
///
/// # Errors
///
/// Returns an error string if the request fails or runs outside the browser.
#[allow(clippy::unused_async)]
pub async fn fetch_config() -> Result<ClientConfig, String> {
    #[cfg(feature = "hydrate")]
    {
        let resp = gloo_net::http::Request::get("/api/config")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !resp.ok() {
            return Err(format!("config request failed: {}", resp.status()));
        }
        resp.json::<ClientConfig>().await.map_err(|e| e.to_string())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err("client configuration is fetched in the browser".to_owned())
    }
}
