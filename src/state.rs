//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! only carries the read-only client configuration; the GraphQL service and
//! identity provider are external.

use std::sync::Arc;

use appsync::ClientConfig;

/// Clone is required by Axum; the config is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    pub client_config: Arc<ClientConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(client_config: ClientConfig) -> Self {
        Self { client_config: Arc::new(client_config) }
    }
}
