//! Realtime subscription protocol spoken over the AppSync websocket.
//!
//! PROTOCOL
//! ========
//! 1. Open `wss://<realtime host>/graphql?header=<b64 auth>&payload=e30=`.
//! 2. Send `connection_init`, wait for `connection_ack`.
//! 3. Send `start` per subscription; the server answers `start_ack`, then
//!    `data` frames until `complete`.
//! 4. Send `stop` to end a subscription early. `ka` frames are keep-alives.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::ProtocolError;
use crate::graphql::{GraphqlError, GraphqlRequest, GraphqlResponse};

/// Authorization headers shared by the HTTP path and the realtime handshake.
pub type AuthHeaders = BTreeMap<String, String>;

/// Base64 of the empty JSON object, the fixed handshake payload.
pub const EMPTY_PAYLOAD: &str = "e30=";

/// One frame on the realtime socket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeMessage {
    ConnectionInit,
    ConnectionAck {
        #[serde(default)]
        payload: Option<AckPayload>,
    },
    Ka,
    Start {
        id: String,
        payload: StartPayload,
    },
    StartAck {
        id: String,
    },
    Data {
        id: String,
        payload: GraphqlResponse,
    },
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        payload: ErrorPayload,
    },
    Complete {
        id: String,
    },
    Stop {
        id: String,
    },
    ConnectionError {
        #[serde(default)]
        payload: ErrorPayload,
    },
}

impl RealtimeMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Codec`] for malformed JSON or unknown frame types.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Codec`] if serialization fails.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckPayload {
    #[serde(rename = "connectionTimeoutMs")]
    pub connection_timeout_ms: u64,
}

/// Body of a `start` frame. `data` is the request serialized to a string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPayload {
    pub data: String,
    pub extensions: StartExtensions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartExtensions {
    pub authorization: AuthHeaders,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl ErrorPayload {
    /// First error message, or a generic fallback.
    #[must_use]
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|e| match &e.error_type {
                Some(kind) if !e.message.is_empty() => format!("{kind}: {}", e.message),
                Some(kind) => kind.clone(),
                None => e.message.clone(),
            })
            .find(|m| !m.is_empty())
            .unwrap_or_else(|| "realtime error".to_owned())
    }
}

/// Build the `start` frame for a subscription.
///
/// # Errors
///
/// Returns [`ProtocolError::Codec`] if the request cannot be serialized.
pub fn start_message(id: &str, request: &GraphqlRequest, headers: &AuthHeaders) -> Result<RealtimeMessage, ProtocolError> {
    Ok(RealtimeMessage::Start {
        id: id.to_owned(),
        payload: StartPayload {
            data: serde_json::to_string(request)?,
            extensions: StartExtensions { authorization: headers.clone() },
        },
    })
}

/// Derive the realtime websocket URL from the GraphQL HTTP endpoint.
///
/// `appsync-api` hosts map to `appsync-realtime-api`; custom domains keep
/// their host and gain a `/realtime` path suffix.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidEndpoint`] when the endpoint is not an
/// absolute `http(s)` URL.
pub fn realtime_url(endpoint: &str, headers: &AuthHeaders) -> Result<String, ProtocolError> {
    let invalid = |reason: &str| ProtocolError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason: reason.to_owned(),
    };

    let mut url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
    let ws_scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        _ => return Err(invalid("scheme must be http or https")),
    };
    url.set_scheme(ws_scheme).map_err(|()| invalid("scheme rewrite rejected"))?;

    let host = url.host_str().ok_or_else(|| invalid("missing host"))?.to_owned();
    if host.contains("appsync-api") {
        let realtime_host = host.replacen("appsync-api", "appsync-realtime-api", 1);
        url.set_host(Some(&realtime_host)).map_err(|e| invalid(&e.to_string()))?;
    } else {
        let path = format!("{}/realtime", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }

    let header = STANDARD.encode(serde_json::to_vec(headers)?);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("header", &header)
        .append_pair("payload", EMPTY_PAYLOAD);
    Ok(url.into())
}

/// Decode the `header` query parameter back into headers.
///
/// Returns `None` when the parameter is missing or not valid base64 JSON.
#[must_use]
pub fn decode_handshake_header(realtime_url: &str) -> Option<AuthHeaders> {
    let url = Url::parse(realtime_url).ok()?;
    let (_, raw) = url.query_pairs().find(|(k, _)| k == "header")?;
    let bytes = STANDARD.decode(raw.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Convenience for frames whose payload is a plain JSON value.
#[must_use]
pub fn data_message(id: &str, data: Value) -> RealtimeMessage {
    RealtimeMessage::Data { id: id.to_owned(), payload: GraphqlResponse::from_data(data) }
}
