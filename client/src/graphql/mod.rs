//! GraphQL client over the link pipeline.
//!
//! Queries are cache-first, mutations always hit the network, and
//! subscription items are written into the cache's object store as they
//! arrive. The client is cheap to clone; clones share the pipeline and cache.

pub mod cache;
pub mod operations;

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::cell::RefCell;
use std::rc::Rc;

use appsync::{GraphqlError, GraphqlRequest, GraphqlResponse};
use futures::StreamExt;
use futures::stream::LocalBoxStream;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::net::link::{LinkChain, LinkError, Operation, first_response};
pub use cache::{CacheConfig, InMemoryCache};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("graphql error: {}", summarize(.0))]
    Graphql(Vec<GraphqlError>),
    #[error("response carried no data")]
    EmptyResponse,
    #[error("response data has an unexpected shape: {0}")]
    Decode(#[from] serde_json::Error),
}

fn summarize(errors: &[GraphqlError]) -> String {
    errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

pub type TypedStream<T> = LocalBoxStream<'static, Result<T, ClientError>>;

#[derive(Clone)]
pub struct GraphqlClient {
    link: LinkChain,
    cache: Rc<RefCell<InMemoryCache>>,
}

impl GraphqlClient {
    pub fn new(link: LinkChain, cache: InMemoryCache) -> Self {
        Self { link, cache: Rc::new(RefCell::new(cache)) }
    }

    /// Run `f` against the cache. Must not be called from inside another
    /// `with_cache` closure.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut InMemoryCache) -> R) -> R {
        f(&mut self.cache.borrow_mut())
    }

    /// Cache-first query.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] for transport failures, GraphQL errors, or data
    /// that does not decode as `T`.
    pub async fn query<T: DeserializeOwned>(&self, request: GraphqlRequest) -> Result<T, ClientError> {
        let request = self.cache.borrow().transform_request(request);
        let cached = self.cache.borrow().read_query(&request);
        if let Some(data) = cached {
            return Ok(serde_json::from_value(data)?);
        }

        let data = self.fetch(request.clone()).await?;
        self.cache.borrow_mut().write_query(&request, &data);
        Ok(serde_json::from_value(data)?)
    }

    /// Network-only mutation. Returned objects are merged into the cache.
    ///
    /// # Errors
    ///
    /// Same as [`GraphqlClient::query`].
    pub async fn mutate<T: DeserializeOwned>(&self, request: GraphqlRequest) -> Result<T, ClientError> {
        let request = self.cache.borrow().transform_request(request);
        let data = self.fetch(request).await?;
        self.cache.borrow_mut().write_objects(&data);
        Ok(serde_json::from_value(data)?)
    }

    /// Open a subscription. Each item is decoded as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Link`] if the subscription cannot be started.
    pub async fn subscribe<T: DeserializeOwned + 'static>(
        &self,
        request: GraphqlRequest,
    ) -> Result<TypedStream<T>, ClientError> {
        let request = self.cache.borrow().transform_request(request);
        let stream = self.link.execute(Operation::new(request)).await?;
        let cache = Rc::clone(&self.cache);
        Ok(stream
            .map(move |item| {
                let data = into_data(item?)?;
                cache.borrow_mut().write_objects(&data);
                Ok(serde_json::from_value(data)?)
            })
            .boxed_local())
    }

    async fn fetch(&self, request: GraphqlRequest) -> Result<Value, ClientError> {
        let stream = self.link.execute(Operation::new(request)).await?;
        into_data(first_response(stream).await?)
    }
}

fn into_data(response: GraphqlResponse) -> Result<Value, ClientError> {
    if response.has_errors() {
        return Err(ClientError::Graphql(response.errors));
    }
    response.data.ok_or(ClientError::EmptyResponse)
}
