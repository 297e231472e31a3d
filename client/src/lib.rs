//! # client
//!
//! Leptos + WASM frontend for the event board.
//!
//! Users sign in through the Cognito hosted UI. Once signed in they see the
//! event inventory, loaded by a GraphQL query, and the latest event pushed
//! by an AppSync realtime subscription.
//!
//! The crate is split into the identity provider (`identity`), the GraphQL
//! link pipeline (`net`), the cache-backed client (`graphql`), plain state
//! machines (`state`), and the Leptos views (`app`, `components`).

pub mod app;
pub mod components;
pub mod graphql;
pub mod identity;
pub mod net;
pub mod services;
pub mod state;
pub mod util;

/// Hydration entry point for the WASM bundle.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::hydrate_body(app::App);
}
