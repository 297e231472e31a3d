//! Shared wire model for the AppSync-style GraphQL endpoint.
//!
//! This crate owns everything that crosses a process boundary: the client
//! configuration the host server hands to the browser, the GraphQL
//! request/response envelopes, and the realtime subscription protocol. It is
//! platform-neutral so the `client` crate can use it from both SSR and WASM.

pub mod config;
pub mod graphql;
pub mod realtime;

pub use config::{AuthMode, AuthType, ClientConfig, HostedUiConfig, ResponseType};
pub use graphql::{ErrorLocation, GraphqlError, GraphqlRequest, GraphqlResponse, OperationKind};
pub use realtime::{AuthHeaders, RealtimeMessage, StartPayload};

/// Errors produced while interpreting configuration or protocol payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An endpoint URL could not be parsed or rewritten.
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// A configuration value is not one of the accepted spellings.
    #[error("unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
    /// A realtime frame could not be encoded or decoded.
    #[error("realtime frame codec failed: {0}")]
    Codec(#[from] serde_json::Error),
}
