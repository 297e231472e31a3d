//! Transport seams under the link pipeline.
//!
//! The links and the hosted-UI token exchange only see these traits; the
//! browser implementations live in `net::gloo` and tests supply scripted ones.

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use futures::stream::LocalBoxStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self { url: url.into(), headers: Vec::new(), body: body.into() }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Request(String),
    #[error("websocket failed: {0}")]
    Socket(String),
    #[error("connection closed")]
    Closed,
}

#[async_trait(?Send)]
pub trait HttpTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// An open text-frame socket: frames pushed into `sender` are written,
/// frames read arrive on `receiver`. Dropping `sender` closes the socket.
pub struct RealtimeSocket {
    pub sender: UnboundedSender<String>,
    pub receiver: LocalBoxStream<'static, Result<String, TransportError>>,
}

#[async_trait(?Send)]
pub trait RealtimeTransport {
    /// Open a socket speaking the `graphql-ws` subprotocol.
    async fn connect(&self, url: &str) -> Result<RealtimeSocket, TransportError>;
}
