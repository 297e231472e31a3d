//! Request pipeline between the GraphQL client and the network.
//!
//! ARCHITECTURE
//! ============
//! An [`link::Operation`] flows through an ordered [`link::LinkChain`]:
//! `AuthLink` stamps credentials, then `SubscriptionHandshakeLink` sends the
//! operation over HTTP or, for subscriptions, the realtime websocket.
//! Transports sit behind traits so every stage runs natively in tests.

pub mod auth_link;
pub mod compose;
#[cfg(feature = "hydrate")]
pub mod gloo;
pub mod handshake_link;
pub mod link;
pub mod transport;

pub use compose::compose;
pub use link::{LinkChain, LinkError, Operation, ResponseStream};
