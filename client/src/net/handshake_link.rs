//! Terminating stage: HTTP for queries and mutations, the realtime
//! websocket for subscriptions.
//!
//! Each subscription gets its own socket. The stream it returns yields one
//! response per `data` frame and ends on `complete`; dropping it early sends
//! `stop` and closes the socket.

#[cfg(test)]
#[path = "handshake_link_test.rs"]
mod handshake_link_test;

use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use appsync::realtime::{self, RealtimeMessage};
use appsync::{GraphqlResponse, OperationKind};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use futures::stream::{self, LocalBoxStream, Stream};
use futures::{StreamExt, ready};

use super::link::{Link, LinkError, Next, Operation, ResponseStream};
use super::transport::{HttpRequest, HttpTransport, RealtimeSocket, RealtimeTransport, TransportError};

const JSON_CONTENT_TYPE: &str = "application/json";

pub struct SubscriptionHandshakeLink {
    endpoint: String,
    http: Rc<dyn HttpTransport>,
    realtime: Rc<dyn RealtimeTransport>,
}

impl SubscriptionHandshakeLink {
    pub fn new(endpoint: impl Into<String>, http: Rc<dyn HttpTransport>, realtime: Rc<dyn RealtimeTransport>) -> Self {
        Self { endpoint: endpoint.into(), http, realtime }
    }

    async fn post(&self, operation: Operation) -> Result<ResponseStream, LinkError> {
        let body = serde_json::to_string(&operation.request)?;
        let mut request = HttpRequest::new(&self.endpoint, body).header("Content-Type", JSON_CONTENT_TYPE);
        // `host` only matters to the realtime handshake; browsers set their own.
        for (name, value) in operation.context.headers.iter().filter(|(name, _)| *name != "host") {
            request = request.header(name, value);
        }

        let resp = self.http.post(request).await?;
        if !resp.is_success() {
            // Auth failures still carry a GraphQL error body worth surfacing.
            return match serde_json::from_str::<GraphqlResponse>(&resp.body) {
                Ok(response) if response.has_errors() => Ok(single(response)),
                _ => Err(LinkError::Status { status: resp.status, body: resp.body }),
            };
        }
        let response: GraphqlResponse = serde_json::from_str(&resp.body)?;
        Ok(single(response))
    }

    async fn subscribe(&self, operation: Operation) -> Result<ResponseStream, LinkError> {
        let url = realtime::realtime_url(&self.endpoint, &operation.context.headers)?;
        let RealtimeSocket { sender, mut receiver } = self.realtime.connect(&url).await?;

        send(&sender, &RealtimeMessage::ConnectionInit)?;
        await_ack(&mut receiver).await?;

        let id = uuid::Uuid::new_v4().to_string();
        send(&sender, &realtime::start_message(&id, &operation.request, &operation.context.headers)?)?;
        leptos::logging::log!("subscription {id} started");

        Ok(SubscriptionStream { id, sender, receiver, done: false }.boxed_local())
    }
}

#[async_trait(?Send)]
impl Link for SubscriptionHandshakeLink {
    async fn request(&self, operation: Operation, _next: Next<'_>) -> Result<ResponseStream, LinkError> {
        match operation.kind {
            OperationKind::Subscription => self.subscribe(operation).await,
            OperationKind::Query | OperationKind::Mutation => self.post(operation).await,
        }
    }
}

fn single(response: GraphqlResponse) -> ResponseStream {
    stream::iter([Ok(response)]).boxed_local()
}

fn send(sender: &UnboundedSender<String>, message: &RealtimeMessage) -> Result<(), LinkError> {
    let text = message.encode()?;
    sender
        .unbounded_send(text)
        .map_err(|_| LinkError::Transport(TransportError::Closed))
}

/// Read frames until `connection_ack`.
async fn await_ack(receiver: &mut LocalBoxStream<'static, Result<String, TransportError>>) -> Result<(), LinkError> {
    while let Some(frame) = receiver.next().await {
        match RealtimeMessage::decode(&frame?)? {
            RealtimeMessage::ConnectionAck { .. } => return Ok(()),
            RealtimeMessage::Ka => {}
            RealtimeMessage::ConnectionError { payload } | RealtimeMessage::Error { payload, .. } => {
                return Err(LinkError::Realtime(payload.message()));
            }
            other => leptos::logging::warn!("ignoring {other:?} before connection_ack"),
        }
    }
    Err(LinkError::Transport(TransportError::Closed))
}

struct SubscriptionStream {
    id: String,
    sender: UnboundedSender<String>,
    receiver: LocalBoxStream<'static, Result<String, TransportError>>,
    done: bool,
}

impl SubscriptionStream {
    fn finish(&mut self, item: Option<Result<GraphqlResponse, LinkError>>) -> Poll<Option<Result<GraphqlResponse, LinkError>>> {
        self.done = true;
        Poll::Ready(item)
    }
}

impl Stream for SubscriptionStream {
    type Item = Result<GraphqlResponse, LinkError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            let text = match ready!(this.receiver.poll_next_unpin(cx)) {
                Some(Ok(text)) => text,
                Some(Err(e)) => return this.finish(Some(Err(e.into()))),
                None => return this.finish(Some(Err(LinkError::Transport(TransportError::Closed)))),
            };
            let message = match RealtimeMessage::decode(&text) {
                Ok(message) => message,
                Err(e) => {
                    leptos::logging::warn!("dropping undecodable realtime frame: {e}");
                    continue;
                }
            };
            match message {
                RealtimeMessage::Data { id, payload } if id == this.id => return Poll::Ready(Some(Ok(payload))),
                RealtimeMessage::Error { id, payload } if id.as_deref().is_none_or(|id| id == this.id) => {
                    return this.finish(Some(Err(LinkError::Realtime(payload.message()))));
                }
                RealtimeMessage::ConnectionError { payload } => {
                    return this.finish(Some(Err(LinkError::Realtime(payload.message()))));
                }
                RealtimeMessage::Complete { id } if id == this.id => return this.finish(None),
                _ => {}
            }
        }
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Ok(text) = (RealtimeMessage::Stop { id: self.id.clone() }).encode() {
            let _ = self.sender.unbounded_send(text);
        }
        leptos::logging::log!("subscription {} stopped", self.id);
    }
}
