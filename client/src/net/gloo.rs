//! Browser transports backed by `gloo-net`.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use gloo_net::websocket::Message;
use gloo_net::websocket::futures::WebSocket;

use super::transport::{HttpRequest, HttpResponse, HttpTransport, RealtimeSocket, RealtimeTransport, TransportError};

/// AppSync only accepts this websocket subprotocol.
const REALTIME_PROTOCOL: &str = "graphql-ws";

#[derive(Clone, Copy, Debug, Default)]
pub struct GlooHttp;

#[async_trait(?Send)]
impl HttpTransport for GlooHttp {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = gloo_net::http::Request::post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let resp = builder
            .body(request.body)
            .map_err(|e| TransportError::Request(e.to_string()))?
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GlooRealtime;

#[async_trait(?Send)]
impl RealtimeTransport for GlooRealtime {
    async fn connect(&self, url: &str) -> Result<RealtimeSocket, TransportError> {
        let ws = WebSocket::open_with_protocol(url, REALTIME_PROTOCOL).map_err(|e| TransportError::Socket(e.to_string()))?;
        let (mut ws_write, ws_read) = ws.split();
        let (tx, mut rx) = mpsc::unbounded::<String>();

        // Forward outgoing frames until every sender is dropped.
        leptos::task::spawn_local(async move {
            while let Some(text) = rx.next().await {
                if ws_write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        let receiver = ws_read
            .map(|msg| match msg {
                Ok(Message::Text(text)) => Ok(text),
                Ok(Message::Bytes(bytes)) => {
                    String::from_utf8(bytes).map_err(|e| TransportError::Socket(e.to_string()))
                }
                Err(e) => Err(TransportError::Socket(e.to_string())),
            })
            .boxed_local();

        Ok(RealtimeSocket { sender: tx, receiver })
    }
}
