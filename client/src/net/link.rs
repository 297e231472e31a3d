//! Composable request stages.

#[cfg(test)]
#[path = "link_test.rs"]
mod link_test;

use std::rc::Rc;

use appsync::{AuthHeaders, GraphqlRequest, GraphqlResponse, OperationKind, ProtocolError};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::LocalBoxStream;

use super::transport::TransportError;

/// Per-request values stages hand to later stages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationContext {
    /// Headers sent with the HTTP request, or in the realtime handshake.
    pub headers: AuthHeaders,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub request: GraphqlRequest,
    pub kind: OperationKind,
    pub context: OperationContext,
}

impl Operation {
    #[must_use]
    pub fn new(request: GraphqlRequest) -> Self {
        let kind = request.kind();
        Self { request, kind, context: OperationContext::default() }
    }
}

/// Responses for one operation: a single item for queries and mutations,
/// one item per event for subscriptions.
pub type ResponseStream = LocalBoxStream<'static, Result<GraphqlResponse, LinkError>>;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("could not authorize request: {0}")]
    Auth(String),
    #[error("realtime subscription failed: {0}")]
    Realtime(String),
    #[error("graphql endpoint returned status {status}")]
    Status { status: u16, body: String },
    #[error("response body is not valid graphql json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("link chain ended without a terminating link")]
    Unterminated,
    #[error("stream ended before a response arrived")]
    Closed,
}

/// One stage of the pipeline. A stage either answers the operation itself
/// or forwards it, possibly modified, to `next`.
#[async_trait(?Send)]
pub trait Link {
    async fn request(&self, operation: Operation, next: Next<'_>) -> Result<ResponseStream, LinkError>;
}

/// The stages after the current one.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Rc<dyn Link>],
}

impl Next<'_> {
    /// Hand `operation` to the following stage.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Unterminated`] when no stage is left.
    pub async fn run(self, operation: Operation) -> Result<ResponseStream, LinkError> {
        let Some((head, rest)) = self.rest.split_first() else {
            return Err(LinkError::Unterminated);
        };
        head.request(operation, Next { rest }).await
    }
}

/// Ordered list of stages. Cloning shares the stages.
#[derive(Clone)]
pub struct LinkChain {
    links: Rc<[Rc<dyn Link>]>,
}

impl From<Vec<Rc<dyn Link>>> for LinkChain {
    fn from(links: Vec<Rc<dyn Link>>) -> Self {
        Self { links: links.into() }
    }
}

impl LinkChain {
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Run `operation` through every stage.
    ///
    /// # Errors
    ///
    /// Returns the first error any stage raises before a stream is produced.
    pub async fn execute(&self, operation: Operation) -> Result<ResponseStream, LinkError> {
        Next { rest: &self.links }.run(operation).await
    }
}

/// Take the single response a query or mutation produces.
///
/// # Errors
///
/// Returns the stream's error, or [`LinkError::Closed`] if it ends empty.
pub async fn first_response(mut stream: ResponseStream) -> Result<GraphqlResponse, LinkError> {
    stream.next().await.unwrap_or(Err(LinkError::Closed))
}
